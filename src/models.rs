use std::fmt;

use time::OffsetDateTime;

use crate::error::DecodeError;

/// One decoded glucose reading.
///
/// `raw_value` is either a scaled local raw code or a calibrated value from
/// the web calibration service. Emitted samples always have `raw_value > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: OffsetDateTime,
    pub raw_value: f64,
}

impl Sample {
    pub fn new(timestamp: OffsetDateTime, raw_value: f64) -> Self {
        Sample {
            timestamp,
            raw_value,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp = {}, raw value = {:.2}",
            crate::utils::format_datetime(&self.timestamp),
            self.raw_value
        )
    }
}

/// Sensor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    NotYetStarted,
    Starting,
    Ready,
    Expired,
    Shutdown,
    Failure,
    Unknown,
}

// Sensor age thresholds, in minutes
pub const WARM_UP_MINUTES: u16 = 60;
pub const EXPIRY_MINUTES: u16 = 20880;

impl SensorState {
    /// Decode the status byte found at header offset 4
    pub fn from_status_byte(byte: u8) -> Self {
        match byte {
            0x01 => SensorState::NotYetStarted,
            0x02 => SensorState::Starting,
            0x03 => SensorState::Ready,
            0x04 => SensorState::Expired,
            0x05 => SensorState::Shutdown,
            0x06 => SensorState::Failure,
            _ => SensorState::Unknown,
        }
    }

    /// State derived from the elapsed-minutes counter alone, used when the
    /// web calibration service answers instead of the status byte.
    pub fn from_sensor_age(minutes: Option<u16>) -> Self {
        match minutes {
            Some(m) if m < WARM_UP_MINUTES => SensorState::Starting,
            Some(m) if m >= EXPIRY_MINUTES => SensorState::Expired,
            _ => SensorState::Ready,
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SensorState::NotYetStarted => "not yet started",
            SensorState::Starting => "starting",
            SensorState::Ready => "ready",
            SensorState::Expired => "expired",
            SensorState::Shutdown => "shut down",
            SensorState::Failure => "failure",
            SensorState::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Sensor model family, identified from the first patch info byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Libre1,
    Libre1A2,
    Libre2,
    LibreUs,
    LibreProH,
}

impl SensorType {
    /// Identify the sensor family from its patch info.
    ///
    /// Transmitters that never report patch info only carry Libre 1 sensors,
    /// so `None` maps to [`SensorType::Libre1`].
    pub fn from_patch_info(patch_info: Option<&[u8]>) -> Result<Self, DecodeError> {
        let Some(patch_info) = patch_info else {
            return Ok(SensorType::Libre1);
        };

        match patch_info.first() {
            Some(0xDF) => Ok(SensorType::Libre1),
            Some(0xA2) => Ok(SensorType::Libre1A2),
            Some(0x9D) => Ok(SensorType::Libre2),
            Some(0xE5) => Ok(SensorType::LibreUs),
            Some(0x70) => Ok(SensorType::LibreProH),
            _ => Err(DecodeError::UnknownSensorType(crate::utils::to_hex(
                patch_info,
            ))),
        }
    }

    /// The web service cannot handle these layouts, they are always parsed
    /// locally.
    pub fn requires_local_parsing(&self) -> bool {
        matches!(
            self,
            SensorType::Libre1 | SensorType::LibreUs | SensorType::LibreProH
        )
    }
}
