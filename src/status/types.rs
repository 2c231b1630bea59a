//! Status Data Types
//!
//! Defines the wire schema for container status reports and the JSON body
//! returned by every ingestion endpoint.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Offset-less layouts accepted for `time`, read as UTC.
const NAIVE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%MZ",
];

/// A single observation of a container's state.
///
/// `time` is the only field used for ordering; `status` is carried as opaque data
/// and `message_id` identifies the report instance for logging only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerReport {
    #[serde(rename = "message-id")]
    pub message_id: String,
    #[serde(rename = "container-id")]
    pub container_id: String,
    pub status: String,
    #[serde(rename = "time", deserialize_with = "deserialize_observed_at")]
    pub observed_at: DateTime<Utc>,
}

impl ContainerReport {
    /// Returns true if this report is strictly newer than `other`.
    ///
    /// Equal timestamps are not newer: a report carrying the same `time` as one
    /// already recorded is a duplicate.
    pub fn is_newer_than(&self, other: &ContainerReport) -> bool {
        self.observed_at > other.observed_at
    }
}

/// Parses RFC 3339 timestamps, plus the ISO 8601 variants without an offset or
/// without seconds that reporters also send.
pub fn parse_observed_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = raw.parse::<DateTime<FixedOffset>>() {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_observed_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_observed_at(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Response body shared by the update and flush endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ResponseBody {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ResponseBody {
    pub fn ok(status: u16, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            error: None,
        }
    }

    pub fn error(status: u16, message: &str, error: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
            error: Some(error.to_string()),
        }
    }
}

/// Liveness payload for `/api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
