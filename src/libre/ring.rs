//! Ring buffer indexing for the trend and history regions

/// One circular record region inside the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingRegion {
    /// Absolute block offset of slot 0
    pub start: usize,
    pub slot_count: usize,
    pub record_size: usize,
}

/// Trend records, one per minute
pub const TREND: RingRegion = RingRegion {
    start: 28,
    slot_count: 16,
    record_size: 6,
};

/// History records, one per 15 minutes
pub const HISTORY: RingRegion = RingRegion {
    start: 124,
    slot_count: 32,
    record_size: 6,
};

impl RingRegion {
    /// Block offset of the record written `look_back` slots before the most
    /// recent one. `next_slot` is the slot the sensor will write next.
    ///
    /// Precondition: `look_back < slot_count`. A `next_slot` outside the
    /// region still yields an in-region offset.
    pub fn offset_of(&self, next_slot: u8, look_back: usize) -> usize {
        let slot = wrap(
            i64::from(next_slot) - 1 - look_back as i64,
            self.slot_count as i64,
        );
        self.start + slot * self.record_size
    }
}

/// Non-negative remainder, negative values wrap forward
fn wrap(value: i64, modulus: i64) -> usize {
    value.rem_euclid(modulus) as usize
}
