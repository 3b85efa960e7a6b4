//! Normalise a web calibration response into candidate samples
use log::{debug, warn};
use time::{Duration, OffsetDateTime};

use crate::models::{Sample, SensorState};
use crate::remote::response::{RemoteHistoricEntry, RemoteResponse};

/// Candidates from a web calibration response
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptedResponse {
    /// Newest first; the current value comes first
    pub samples: Vec<Sample>,
    pub sensor_state: SensorState,
    pub sensor_age_minutes: Option<u16>,
    pub is_error: bool,
}

/// Convert a response into newest-first samples
///
/// Validation failures return no samples, tagged with the sensor state the
/// service's age counter implies. Historic entries are skipped when flagged
/// by the sensor, missing a field, timed outside the u16 range, or zero.
///
/// # Arguments
/// * `response` - the decoded service response
/// * `captured_at` - when the block sent to the service was read; the current
///   value is stamped with this time
pub fn adapt_response(response: &RemoteResponse, captured_at: OffsetDateTime) -> AdaptedResponse {
    let sensor_state = response.sensor_state();
    let sensor_age_minutes = response.sensor_age_minutes();
    let mut adapted = AdaptedResponse {
        samples: Vec::new(),
        sensor_state,
        sensor_age_minutes,
        is_error: false,
    };

    if response.is_error() {
        warn!("Web oop response flagged as error, sensor state {}", sensor_state);
        adapted.is_error = true;
        return adapted;
    }

    if sensor_state != SensorState::Ready {
        debug!("Web oop response for sensor in state {}", sensor_state);
        return adapted;
    }

    let Some(content) = response.content() else {
        return adapted;
    };
    let (Some(current_value), Some(sensor_age)) =
        (content.current_glucose_value, sensor_age_minutes)
    else {
        return adapted;
    };
    if current_value == 0.0 {
        return adapted;
    }

    adapted.samples.push(Sample::new(captured_at, current_value));

    let history = content.historic_entries.as_deref().unwrap_or_default();
    adapted.samples.extend(
        newest_first(history)
            .into_iter()
            .filter_map(|entry| historic_sample(entry, sensor_age, captured_at)),
    );

    adapted
}

/// Historic entries may arrive in either order, return them newest first
fn newest_first(history: &[RemoteHistoricEntry]) -> Vec<RemoteHistoricEntry> {
    let first = history.first().and_then(|e| e.relative_time_minutes).unwrap_or(0);
    let last = history.last().and_then(|e| e.relative_time_minutes).unwrap_or(0);

    let mut entries = history.to_vec();
    if first < last {
        entries.reverse();
    }
    entries
}

fn historic_sample(
    entry: RemoteHistoricEntry,
    sensor_age: u16,
    captured_at: OffsetDateTime,
) -> Option<Sample> {
    if entry.quality_flag != 0 {
        return None;
    }
    let recorded_at = entry
        .relative_time_minutes
        .and_then(|minutes| u16::try_from(minutes).ok())?;
    let value = entry.glucose_value?;
    if value == 0.0 {
        return None;
    }

    let minutes_ago = i64::from(sensor_age) - i64::from(recorded_at);
    Some(Sample::new(captured_at - Duration::minutes(minutes_ago), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::response::{RemoteContent, RemoteListEntry};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2020-06-08 12:00 UTC);

    fn entry(time: Option<i64>, bg: Option<f64>, quality: i64) -> RemoteHistoricEntry {
        RemoteHistoricEntry {
            relative_time_minutes: time,
            glucose_value: bg,
            quality_flag: quality,
        }
    }

    fn response(
        current: Option<f64>,
        age: Option<i64>,
        history: Vec<RemoteHistoricEntry>,
    ) -> RemoteResponse {
        RemoteResponse {
            error_code: None,
            list: Some(vec![RemoteListEntry {
                content: Some(RemoteContent {
                    current_glucose_value: current,
                    current_time_minutes: age,
                    historic_entries: Some(history),
                }),
            }]),
        }
    }

    #[test]
    fn keeps_newest_first_history_order() {
        let r = response(
            Some(115.0),
            Some(100),
            vec![entry(Some(100), Some(110.0), 0), entry(Some(85), Some(108.0), 0)],
        );

        let adapted = adapt_response(&r, NOW);

        assert!(!adapted.is_error);
        assert_eq!(adapted.sensor_state, SensorState::Ready);
        assert_eq!(
            adapted.samples,
            vec![
                Sample::new(NOW, 115.0),
                Sample::new(NOW, 110.0),
                Sample::new(NOW - Duration::minutes(15), 108.0),
            ]
        );
    }

    #[test]
    fn reverses_oldest_first_history() {
        let r = response(
            Some(115.0),
            Some(130),
            vec![
                entry(Some(85), Some(100.0), 0),
                entry(Some(100), Some(105.0), 0),
                entry(Some(115), Some(110.0), 0),
            ],
        );

        let adapted = adapt_response(&r, NOW);
        let values: Vec<f64> = adapted.samples.iter().map(|s| s.raw_value).collect();

        assert_eq!(values, vec![115.0, 110.0, 105.0, 100.0]);
        assert_eq!(adapted.samples[1].timestamp, NOW - Duration::minutes(15));
        assert_eq!(adapted.samples[3].timestamp, NOW - Duration::minutes(45));
    }

    #[test]
    fn skips_bad_historic_entries() {
        let r = response(
            Some(115.0),
            Some(200),
            vec![
                entry(Some(195), Some(110.0), 0),
                entry(Some(180), Some(108.0), 3),
                entry(None, Some(107.0), 0),
                entry(Some(150), None, 0),
                entry(Some(135), Some(0.0), 0),
                entry(Some(120), Some(104.0), 0),
            ],
        );

        let adapted = adapt_response(&r, NOW);
        let values: Vec<f64> = adapted.samples.iter().map(|s| s.raw_value).collect();

        assert_eq!(values, vec![115.0, 110.0, 104.0]);
    }

    #[test]
    fn out_of_range_entry_times_are_skipped() {
        let r = response(
            Some(120.0),
            Some(1000),
            vec![
                entry(Some(990), Some(110.0), 0),
                entry(Some(-1), Some(100.0), 0),
                entry(Some(70000), Some(100.0), 0),
                entry(Some(975), Some(105.0), 0),
            ],
        );

        let adapted = adapt_response(&r, NOW);

        assert!(!adapted.is_error);
        assert_eq!(
            adapted.samples,
            vec![
                Sample::new(NOW, 120.0),
                Sample::new(NOW - Duration::minutes(10), 110.0),
                Sample::new(NOW - Duration::minutes(25), 105.0),
            ]
        );
    }

    #[test]
    fn out_of_range_sensor_age_yields_nothing() {
        let r = response(Some(120.0), Some(-5), vec![entry(Some(15), Some(100.0), 0)]);

        let adapted = adapt_response(&r, NOW);

        assert_eq!(adapted.sensor_age_minutes, None);
        assert!(adapted.samples.is_empty());
    }

    #[test]
    fn low_current_value_is_error() {
        let r = response(Some(9.0), Some(500), vec![entry(Some(495), Some(100.0), 0)]);

        let adapted = adapt_response(&r, NOW);

        assert!(adapted.is_error);
        assert!(adapted.samples.is_empty());
    }

    #[test]
    fn empty_history_is_error() {
        let adapted = adapt_response(&response(Some(120.0), Some(500), vec![]), NOW);
        assert!(adapted.is_error);
        assert!(adapted.samples.is_empty());
    }

    #[test]
    fn starting_sensor_reports_age() {
        let r = response(Some(120.0), Some(20), vec![entry(Some(15), Some(100.0), 0)]);

        let adapted = adapt_response(&r, NOW);

        assert!(!adapted.is_error);
        assert_eq!(adapted.sensor_state, SensorState::Starting);
        assert_eq!(adapted.sensor_age_minutes, Some(20));
        assert!(adapted.samples.is_empty());
    }

    #[test]
    fn expired_sensor_yields_nothing() {
        let r = response(Some(120.0), Some(20880), vec![entry(Some(20875), Some(100.0), 0)]);

        let adapted = adapt_response(&r, NOW);

        assert_eq!(adapted.sensor_state, SensorState::Expired);
        assert!(adapted.samples.is_empty());
    }

    #[test]
    fn missing_sensor_age_yields_nothing() {
        let r = response(Some(120.0), None, vec![entry(Some(15), Some(100.0), 0)]);

        let adapted = adapt_response(&r, NOW);

        assert_eq!(adapted.sensor_state, SensorState::Ready);
        assert_eq!(adapted.sensor_age_minutes, None);
        assert!(adapted.samples.is_empty());
    }
}
