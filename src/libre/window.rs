//! Watermark and minimum spacing filter for candidate samples
use time::{Duration, OffsetDateTime};

use crate::libre::parser::WATERMARK_MARGIN;
use crate::models::Sample;

/// Minimum gap between two kept samples: 5 minutes, less 10 seconds of slack
pub const MIN_SPACING: Duration = Duration::seconds(5 * 60 - 10);

/// Anchor for the first region of a decode, late enough that the newest
/// candidate always passes the spacing rule
pub fn initial_anchor(captured_at: OffsetDateTime) -> OffsetDateTime {
    captured_at + Duration::minutes(5)
}

/// Result of one filter pass
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Kept samples, newest first
    pub kept: Vec<Sample>,
    /// Timestamp of the oldest kept sample, if any
    pub last_kept: Option<OffsetDateTime>,
}

impl Window {
    /// Anchor to seed the next region's pass with
    pub fn next_anchor(&self, captured_at: OffsetDateTime) -> OffsetDateTime {
        self.last_kept.unwrap_or(captured_at)
    }
}

/// Keep candidates younger than `watermark` + 30 seconds that lie at least
/// [`MIN_SPACING`] before the previously kept sample.
///
/// # Arguments
/// * `candidates` - samples ordered newest first
/// * `watermark` - timestamp of the latest reading already consumed
/// * `anchor` - spacing reference for the first candidate
pub fn filter_window(
    candidates: &[Sample],
    watermark: OffsetDateTime,
    anchor: OffsetDateTime,
) -> Window {
    let threshold = watermark + WATERMARK_MARGIN;
    let mut last_kept = anchor;
    let mut kept = Vec::new();

    for sample in candidates {
        if sample.timestamp <= threshold {
            continue;
        }
        if sample.timestamp < last_kept - MIN_SPACING {
            last_kept = sample.timestamp;
            kept.push(*sample);
        }
    }

    Window {
        last_kept: kept.last().map(|s| s.timestamp),
        kept,
    }
}

/// Filter the trend and history regions of one block in sequence, carrying
/// the spacing anchor from the first pass into the second.
pub fn filter_regions(
    trend: &[Sample],
    history: &[Sample],
    watermark: OffsetDateTime,
    captured_at: OffsetDateTime,
) -> Vec<Sample> {
    let first = filter_window(trend, watermark, initial_anchor(captured_at));
    let second = filter_window(history, watermark, first.next_anchor(captured_at));

    let mut samples = first.kept;
    samples.extend(second.kept);
    samples
}
