//! Absolute timestamps for ring buffer records
//!
//! The sensor never stamps its records. The only clock is the sensor age
//! counter captured with the block; a record's age follows from how many
//! slots back it sits in its ring.
use time::{Duration, OffsetDateTime};

/// Spacing between history records, in minutes
pub const HISTORY_INTERVAL_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// One record per minute
    Trend,
    /// One record per 15 minutes, aligned to the sensor's history grid
    History,
}

impl Cadence {
    /// Minutes between sensor start and the record `look_back` slots back,
    /// unclamped: zero or negative means the record predates the sensor's
    /// first reading.
    pub fn minutes_since_start(self, sensor_age_minutes: u16, look_back: usize) -> i64 {
        let age = i64::from(sensor_age_minutes);
        let look_back = look_back as i64;
        match self {
            Cadence::Trend => age - look_back,
            Cadence::History => {
                (age - 3).abs() / HISTORY_INTERVAL_MINUTES * HISTORY_INTERVAL_MINUTES
                    - look_back * HISTORY_INTERVAL_MINUTES
            }
        }
    }

    /// Smallest minutes-since-start a real record can have. The first trend
    /// record is written a minute after start; the first history bucket is
    /// the start itself.
    pub fn first_record_minutes(self) -> i64 {
        match self {
            Cadence::Trend => 1,
            Cadence::History => 0,
        }
    }

    /// Absolute timestamp of the record `look_back` slots back, never earlier
    /// than the sensor start.
    pub fn timestamp(
        self,
        captured_at: OffsetDateTime,
        sensor_age_minutes: u16,
        look_back: usize,
    ) -> OffsetDateTime {
        let minutes = self
            .minutes_since_start(sensor_age_minutes, look_back)
            .max(0);
        sensor_start(captured_at, sensor_age_minutes) + Duration::minutes(minutes)
    }
}

/// The instant the sensor began operating
pub fn sensor_start(captured_at: OffsetDateTime, sensor_age_minutes: u16) -> OffsetDateTime {
    captured_at - Duration::minutes(i64::from(sensor_age_minutes))
}
