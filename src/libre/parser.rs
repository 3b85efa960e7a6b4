//! Local decoding of trend and history records from a Libre block
use log::debug;
use time::{Duration, OffsetDateTime};

use crate::libre::block::RawBlock;
use crate::libre::ring::{RingRegion, HISTORY, TREND};
use crate::libre::timestamp::Cadence;
use crate::models::{Sample, SensorState};

/// Scale factor from a 13-bit raw code to the raw unit used downstream
pub const LIBRE_MULTIPLIER: f64 = 117.64705;

/// New readings must be at least this much younger than the watermark
pub const WATERMARK_MARGIN: Duration = Duration::seconds(30);

/// Candidates extracted from one block, newest first within each region.
/// The two regions are filtered in sequence, never merged by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBlock {
    pub trend: Vec<Sample>,
    pub history: Vec<Sample>,
    pub sensor_state: SensorState,
    pub sensor_age_minutes: u16,
}

/// Decode the raw glucose code of a record: 13 bits, high byte second
pub fn glucose_raw(record: &[u8]) -> u16 {
    u16::from_le_bytes([record[0], record[1]]) & 0x1FFF
}

/// Extract every record younger than `watermark` + 30 seconds
///
/// Both rings are walked from the most recent record backwards. The walk
/// stops at the first record that is not younger than the watermark, or that
/// would predate the sensor's first reading: trend records start one minute
/// after sensor start, history records at sensor start itself. Records with
/// a zero raw code are skipped.
///
/// # Arguments
/// * `block` - the 344 byte memory block
/// * `captured_at` - when the block was read from the sensor
/// * `watermark` - timestamp of the latest reading already consumed
pub fn decode_block(
    block: &RawBlock,
    captured_at: OffsetDateTime,
    watermark: OffsetDateTime,
) -> DecodedBlock {
    let sensor_age_minutes = block.sensor_age_minutes();

    let trend = scan_region(
        block,
        TREND,
        block.next_trend_slot(),
        Cadence::Trend,
        captured_at,
        watermark,
    );
    let history = scan_region(
        block,
        HISTORY,
        block.next_history_slot(),
        Cadence::History,
        captured_at,
        watermark,
    );

    debug!(
        "Decoded block: sensor age {} min, {} trend and {} history candidates",
        sensor_age_minutes,
        trend.len(),
        history.len()
    );

    DecodedBlock {
        trend,
        history,
        sensor_state: block.sensor_state(),
        sensor_age_minutes,
    }
}

fn scan_region(
    block: &RawBlock,
    region: RingRegion,
    next_slot: u8,
    cadence: Cadence,
    captured_at: OffsetDateTime,
    watermark: OffsetDateTime,
) -> Vec<Sample> {
    let sensor_age_minutes = block.sensor_age_minutes();
    let threshold = watermark + WATERMARK_MARGIN;
    let mut samples = Vec::with_capacity(region.slot_count);

    for look_back in 0..region.slot_count {
        let minutes = cadence.minutes_since_start(sensor_age_minutes, look_back);
        if minutes < cadence.first_record_minutes() {
            break;
        }

        let timestamp = cadence.timestamp(captured_at, sensor_age_minutes, look_back);
        if timestamp <= threshold {
            break;
        }

        let offset = region.offset_of(next_slot, look_back);
        let code = glucose_raw(&block.as_bytes()[offset..offset + region.record_size]);
        if code == 0 {
            continue;
        }

        samples.push(Sample::new(timestamp, f64::from(code) * LIBRE_MULTIPLIER));
    }

    samples
}
