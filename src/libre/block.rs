//! The 344 byte Libre memory block
//!
//! Layout, offsets relative to the start of the block:
//! - Bytes 0-23: header. Byte 4 is the sensor status byte.
//! - Bytes 24-319: body.
//!   - Byte 26: next trend slot to be written
//!   - Byte 27: next history slot to be written
//!   - Bytes 28-123: trend ring buffer, 16 records of 6 bytes
//!   - Bytes 124-315: history ring buffer, 32 records of 6 bytes
//!   - Bytes 316-317: sensor age in minutes (little endian)
//! - Bytes 320-343: footer.
use crate::error::DecodeError;
use crate::models::SensorState;

pub const BLOCK_SIZE: usize = 344;

const STATUS_BYTE: usize = 4;
const NEXT_TREND_SLOT: usize = 26;
const NEXT_HISTORY_SLOT: usize = 27;
const SENSOR_AGE: usize = 316;

/// Immutable snapshot of sensor memory
#[derive(Clone, PartialEq, Eq)]
pub struct RawBlock {
    bytes: [u8; BLOCK_SIZE],
}

impl RawBlock {
    pub fn new(bytes: [u8; BLOCK_SIZE]) -> Self {
        RawBlock { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte(&self, position: usize) -> u8 {
        self.bytes[position]
    }

    /// Little endian 16-bit value at `position`
    pub fn u16_le(&self, position: usize) -> u16 {
        u16::from_le_bytes([self.bytes[position], self.bytes[position + 1]])
    }

    pub fn sensor_state(&self) -> SensorState {
        SensorState::from_status_byte(self.byte(STATUS_BYTE))
    }

    pub fn next_trend_slot(&self) -> u8 {
        self.byte(NEXT_TREND_SLOT)
    }

    pub fn next_history_slot(&self) -> u8 {
        self.byte(NEXT_HISTORY_SLOT)
    }

    pub fn sensor_age_minutes(&self) -> u16 {
        self.u16_le(SENSOR_AGE)
    }
}

impl TryFrom<&[u8]> for RawBlock {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; BLOCK_SIZE] = bytes
            .try_into()
            .map_err(|_| DecodeError::BlockSize(bytes.len()))?;
        Ok(RawBlock::new(bytes))
    }
}

impl std::fmt::Debug for RawBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBlock")
            .field("sensor_state", &self.sensor_state())
            .field("next_trend_slot", &self.next_trend_slot())
            .field("next_history_slot", &self.next_history_slot())
            .field("sensor_age_minutes", &self.sensor_age_minutes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_counters() {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[4] = 0x03;
        bytes[26] = 5;
        bytes[27] = 17;
        bytes[316] = 0x10;
        bytes[317] = 0x27;

        let block = RawBlock::new(bytes);
        assert_eq!(block.sensor_state(), SensorState::Ready);
        assert_eq!(block.next_trend_slot(), 5);
        assert_eq!(block.next_history_slot(), 17);
        assert_eq!(block.sensor_age_minutes(), 10000);
    }

    #[test]
    fn rejects_wrong_length() {
        let short = vec![0u8; 343];
        assert_eq!(
            RawBlock::try_from(short.as_slice()),
            Err(DecodeError::BlockSize(343))
        );

        let exact = vec![0u8; BLOCK_SIZE];
        assert!(RawBlock::try_from(exact.as_slice()).is_ok());
    }
}
