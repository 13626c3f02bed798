//! Data models for the experiment server.
//!
//! This module contains the submission payload accepted over HTTP, the
//! lightweight event forwarded to the report aggregator, and the types
//! that describe a compiled report.

use crate::error::SubmissionError;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of readings carried by every sensor log point
/// (audio, pressure, temperature, humidity, light).
pub const SENSOR_CHANNELS: usize = 5;

/// A single timestamped sensor reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReading {
    #[serde(rename = "Datetime")]
    pub datetime: String,
    #[serde(rename = "Data")]
    pub data: Vec<f32>,
}

/// A full experiment submission as posted by a beacon.
///
/// Missing fields decode to their empty value and are caught by
/// [`Submission::check`] rather than by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Submission {
    /// Address of the originating beacon; this is the report source id.
    #[serde(rename = "Beacon Address")]
    pub beacon_address: String,
    #[serde(rename = "Session Number")]
    pub session_number: i64,
    #[serde(rename = "Datetime")]
    pub datetime: String,
    #[serde(rename = "TimeStart")]
    pub time_start: i32,
    #[serde(rename = "TimeEnd")]
    pub time_end: i32,
    #[serde(rename = "MaxTemp")]
    pub max_temp: f32,
    #[serde(rename = "MinTemp")]
    pub min_temp: f32,
    #[serde(rename = "AvgTemp")]
    pub avg_temp: f32,
    #[serde(rename = "AvgHumidity")]
    pub avg_humidity: f32,
    #[serde(rename = "SensorLog")]
    pub sensor_log: Option<Vec<SensorReading>>,
    #[serde(rename = "SurveyResults")]
    pub survey_results: Vec<i64>,
}

impl Submission {
    /// Checks that no required field is empty.
    pub fn check(&self) -> Result<(), SubmissionError> {
        if self.datetime.is_empty() || self.beacon_address.is_empty() {
            return Err(SubmissionError::EmptyValues);
        }

        let Some(sensor_log) = &self.sensor_log else {
            return Err(SubmissionError::EmptyValues);
        };

        let complete = sensor_log
            .iter()
            .all(|point| !point.datetime.is_empty() && point.data.len() == SENSOR_CHANNELS);

        if complete {
            Ok(())
        } else {
            Err(SubmissionError::EmptyValues)
        }
    }

    /// The event forwarded to the aggregator once this submission is accepted.
    pub fn event(&self) -> SubmissionEvent {
        SubmissionEvent {
            source_id: self.beacon_address.clone(),
        }
    }
}

/// Signal that one submission from `source_id` was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEvent {
    pub source_id: String,
}

/// Calendar hour used to suppress duplicate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    pub day: u32,
    pub hour: u32,
}

impl DedupeKey {
    pub fn from_time(now: &DateTime<FixedOffset>) -> Self {
        Self {
            day: now.day(),
            hour: now.hour(),
        }
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.day, self.hour)
    }
}

/// The span of time a report covers: `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ReportWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }
}

/// Start of the very first report window: `0001-01-01T00:00:00Z`.
pub fn zero_time() -> DateTime<FixedOffset> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .fixed_offset()
}

/// One line of a report: how many submissions a source made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub source_id: String,
    pub count: u64,
}

/// A compiled submission report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub window: ReportWindow,
    /// Rows ordered by count (highest first), then by source id.
    pub rows: Vec<ReportRow>,
}

impl ReportDocument {
    /// Total number of submissions across all sources.
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Count for a single source, if it appears in the report.
    #[cfg(test)]
    pub fn count_for(&self, source_id: &str) -> Option<u64> {
        self.rows
            .iter()
            .find(|r| r.source_id == source_id)
            .map(|r| r.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_submission() -> Submission {
        Submission {
            beacon_address: "AA:BB:CC".to_string(),
            session_number: 1,
            datetime: "2026-06-01T09:00:00Z".to_string(),
            time_start: 0,
            time_end: 60,
            max_temp: 24.5,
            min_temp: 19.0,
            avg_temp: 21.2,
            avg_humidity: 40.0,
            sensor_log: Some(vec![SensorReading {
                datetime: "2026-06-01T09:00:01Z".to_string(),
                data: vec![0.1, 1013.0, 21.0, 40.0, 300.0],
            }]),
            survey_results: vec![1, 0, 1],
        }
    }

    #[test]
    fn test_check_accepts_complete_submission() {
        assert!(make_submission().check().is_ok());
    }

    #[test]
    fn test_check_rejects_empty_beacon() {
        let mut submission = make_submission();
        submission.beacon_address.clear();
        assert!(matches!(
            submission.check(),
            Err(SubmissionError::EmptyValues)
        ));
    }

    #[test]
    fn test_check_rejects_short_sensor_point() {
        let mut submission = make_submission();
        if let Some(log) = submission.sensor_log.as_mut() {
            log[0].data.pop();
        }
        assert!(submission.check().is_err());

        let mut submission = make_submission();
        if let Some(log) = submission.sensor_log.as_mut() {
            log[0].datetime.clear();
        }
        assert!(submission.check().is_err());
    }

    #[test]
    fn test_check_rejects_missing_sensor_log() {
        let mut submission = make_submission();
        submission.sensor_log = None;
        assert!(submission.check().is_err());

        submission.sensor_log = Some(Vec::new());
        assert!(submission.check().is_ok());
    }

    #[test]
    fn test_missing_fields_decode_as_empty() {
        let submission: Submission = serde_json::from_str(r#"{"Session Number": 4}"#).unwrap();
        assert!(submission.beacon_address.is_empty());
        assert!(submission.sensor_log.is_none());
        assert!(matches!(
            submission.check(),
            Err(SubmissionError::EmptyValues)
        ));
    }

    #[test]
    fn test_parse_wire_field_names() {
        let json = r#"{
            "Beacon Address": "12:34",
            "Session Number": 2,
            "Datetime": "2026-06-01",
            "TimeStart": 1,
            "TimeEnd": 2,
            "MaxTemp": 1.0,
            "MinTemp": 0.5,
            "AvgTemp": 0.7,
            "AvgHumidity": 33.0,
            "SensorLog": [],
            "SurveyResults": [3]
        }"#;

        let submission: Submission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.beacon_address, "12:34");
        assert_eq!(submission.session_number, 2);
        assert_eq!(submission.event().source_id, "12:34");
    }

    #[test]
    fn test_dedupe_key_from_time() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2026, 6, 14, 9, 30, 0).unwrap();

        let key = DedupeKey::from_time(&now);
        assert_eq!(key, DedupeKey { day: 14, hour: 9 });
        assert_eq!(key.to_string(), "14-9");
    }

    #[test]
    fn test_zero_time_is_year_one() {
        assert_eq!(
            zero_time().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "0001-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_report_document_total() {
        let window = ReportWindow::new(zero_time(), zero_time());
        let doc = ReportDocument {
            window,
            rows: vec![
                ReportRow {
                    source_id: "A".to_string(),
                    count: 3,
                },
                ReportRow {
                    source_id: "B".to_string(),
                    count: 1,
                },
            ],
        };

        assert_eq!(doc.total(), 4);
        assert_eq!(doc.count_for("B"), Some(1));
        assert_eq!(doc.count_for("C"), None);
    }
}
