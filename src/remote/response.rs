//! Response model of the web calibration service
use std::fmt;

use serde::Deserialize;

use crate::models::{SensorState, WARM_UP_MINUTES};

/// Current values at or below this are sensor errors
pub const MIN_VALID_CURRENT_VALUE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteResponse {
    #[serde(rename = "errcode", default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub list: Option<Vec<RemoteListEntry>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteListEntry {
    #[serde(default)]
    pub content: Option<RemoteContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteContent {
    #[serde(rename = "currentBg", default)]
    pub current_glucose_value: Option<f64>,
    /// Sensor age in minutes when the block was read
    #[serde(rename = "currentTime", default)]
    pub current_time_minutes: Option<i64>,
    #[serde(rename = "historicBg", default)]
    pub historic_entries: Option<Vec<RemoteHistoricEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RemoteHistoricEntry {
    /// Sensor age in minutes when this value was recorded
    #[serde(rename = "time", default)]
    pub relative_time_minutes: Option<i64>,
    #[serde(rename = "bg", default)]
    pub glucose_value: Option<f64>,
    #[serde(rename = "quality")]
    pub quality_flag: i64,
}

impl RemoteResponse {
    pub fn from_json(body: &str) -> Result<Self, String> {
        serde_json::from_str(body).map_err(|e| format!("Invalid web oop response: {}", e))
    }

    /// Content of the first list entry
    pub fn content(&self) -> Option<&RemoteContent> {
        self.list.as_ref()?.first()?.content.as_ref()
    }

    /// Error code reported by the service, zero means success
    pub fn service_error(&self) -> Option<i64> {
        self.error_code.filter(|code| *code != 0)
    }

    fn current_value(&self) -> f64 {
        self.content()
            .and_then(|c| c.current_glucose_value)
            .unwrap_or(0.0)
    }

    /// Sensor age reported by the service, None when missing or out of range
    pub fn sensor_age_minutes(&self) -> Option<u16> {
        self.content()
            .and_then(|c| c.current_time_minutes)
            .and_then(|minutes| u16::try_from(minutes).ok())
    }

    /// True when the current value is flagged or there is no history
    pub fn is_error(&self) -> bool {
        if self.current_value() <= MIN_VALID_CURRENT_VALUE {
            return true;
        }
        self.content()
            .and_then(|c| c.historic_entries.as_ref())
            .map_or(true, |h| h.is_empty())
    }

    /// False while the service cannot derive parameters from this block
    pub fn can_get_parameters(&self) -> bool {
        self.sensor_age_minutes()
            .is_some_and(|age| age >= WARM_UP_MINUTES)
    }

    pub fn sensor_state(&self) -> SensorState {
        SensorState::from_sensor_age(self.sensor_age_minutes())
    }

    /// True when the block itself was bad and the returned values are wrong
    pub fn value_error(&self) -> bool {
        if self.sensor_state() == SensorState::Starting {
            return false;
        }
        self.current_value() <= MIN_VALID_CURRENT_VALUE
    }
}

impl fmt::Display for RemoteResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RemoteResponse =")?;
        writeln!(f, "   isError = {}", self.is_error())?;
        writeln!(f, "   sensorState = {}", self.sensor_state())?;
        writeln!(f, "   canGetParameters = {}", self.can_get_parameters())?;
        writeln!(f, "   valueError = {}", self.value_error())?;
        if let Some(code) = self.error_code {
            writeln!(f, "   errcode = {}", code)?;
        }
        match self.sensor_age_minutes() {
            Some(age) => writeln!(f, "sensor time in minutes = {}", age),
            None => writeln!(f, "sensor time in minutes is unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "errcode": 0,
        "list": [{
            "content": {
                "currentBg": 123.0,
                "currentTime": 1200,
                "historicBg": [
                    {"time": 1185, "bg": 120.0, "quality": 0},
                    {"time": 1170, "quality": 4}
                ]
            }
        }]
    }"#;

    #[test]
    fn parses_wire_format() {
        let response = RemoteResponse::from_json(BODY).unwrap();
        let content = response.content().unwrap();

        assert_eq!(response.service_error(), None);
        assert_eq!(content.current_glucose_value, Some(123.0));
        assert_eq!(content.current_time_minutes, Some(1200));

        let history = content.historic_entries.as_ref().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].glucose_value, None);
        assert_eq!(history[1].quality_flag, 4);
    }

    #[test]
    fn flags_for_valid_response() {
        let response = RemoteResponse::from_json(BODY).unwrap();
        assert!(!response.is_error());
        assert!(response.can_get_parameters());
        assert!(!response.value_error());
        assert_eq!(response.sensor_state(), SensorState::Ready);
    }

    #[test]
    fn low_current_value_is_error() {
        let body = r#"{"list":[{"content":{
            "currentBg": 9,
            "currentTime": 500,
            "historicBg": [{"time": 490, "bg": 100, "quality": 0}]
        }}]}"#;

        let response = RemoteResponse::from_json(body).unwrap();
        assert!(response.is_error());
        assert!(response.value_error());
    }

    #[test]
    fn out_of_range_times_do_not_reject_response() {
        let body = r#"{"list":[{"content":{
            "currentBg": 120,
            "currentTime": 1000,
            "historicBg": [
                {"time": 990, "bg": 110, "quality": 0},
                {"time": -1, "bg": 100, "quality": 4},
                {"time": 70000, "bg": 100, "quality": 0}
            ]
        }}]}"#;

        let response = RemoteResponse::from_json(body).unwrap();
        let history = response.content().unwrap().historic_entries.as_ref().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].relative_time_minutes, Some(990));
        assert_eq!(history[1].relative_time_minutes, Some(-1));
        assert_eq!(response.sensor_age_minutes(), Some(1000));
    }

    #[test]
    fn out_of_range_sensor_age_is_unknown() {
        for current_time in ["-5", "70000"] {
            let body = format!(
                r#"{{"list":[{{"content":{{"currentBg":120,"currentTime":{}}}}}]}}"#,
                current_time
            );

            let response = RemoteResponse::from_json(&body).unwrap();
            assert_eq!(response.sensor_age_minutes(), None);
            assert_eq!(response.sensor_state(), SensorState::Ready);
            assert!(!response.can_get_parameters());
        }
    }

    #[test]
    fn starting_sensor_is_not_value_error() {
        let body = r#"{"list":[{"content":{"currentBg":0,"currentTime":20}}]}"#;

        let response = RemoteResponse::from_json(body).unwrap();
        assert!(response.is_error());
        assert!(!response.value_error());
        assert!(!response.can_get_parameters());
        assert_eq!(response.sensor_state(), SensorState::Starting);
    }

    #[test]
    fn missing_list_is_error() {
        let response = RemoteResponse::from_json(r#"{"errcode": 5}"#).unwrap();
        assert!(response.content().is_none());
        assert!(response.is_error());
        assert_eq!(response.service_error(), Some(5));
        assert!(response.to_string().contains("errcode = 5"));
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(RemoteResponse::from_json("not json").is_err());
    }
}
