//! Journal record types.
//!
//! The journal is the raw material for every metric: a log of job
//! applications plus named streams of manual entries (cold outreach, skill
//! sessions, status changes, ...). Records are stored as JSONL; timestamps
//! are kept as raw strings and parsed leniently at aggregation time, so a
//! malformed historical entry is skipped rather than poisoning a whole file.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Manual stream: cold outreach pings.
pub const STREAM_COLD_OUTREACH: &str = "coldOutreach";
/// Manual stream: skill learning sessions.
pub const STREAM_SKILL_LEARNING: &str = "skillLearning";
/// Manual stream: an application marked as favorite.
pub const STREAM_FAVORITE_MARKED: &str = "favoriteMarked";
/// Manual stream: application status transitions.
pub const STREAM_STATUS_CHANGE: &str = "statusChange";
/// Manual stream: rapid-fire easy-apply bursts.
pub const STREAM_SPRAY_AND_PRAY: &str = "sprayAndPray";

pub const STATUS_APPLIED: &str = "Applied";
pub const STATUS_REJECTED: &str = "Rejected";
pub const STATUS_GHOSTED: &str = "Ghosted";
pub const STATUS_INTERVIEW: &str = "Interview";

/// How an application was filed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApplicationKind {
    Full,
    Easy,
}

/// One logged job application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    /// Raw timestamp string; parsed leniently, skipped when unparseable.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: ApplicationKind,
    pub status: String,
    #[serde(default)]
    pub cv_tailored: bool,
    /// Motivation letter attached.
    #[serde(default)]
    pub motivation: bool,
    #[serde(default)]
    pub favorite: bool,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Externally computed quality score, 0-3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
}

impl ApplicationRecord {
    pub fn new(kind: ApplicationKind, platform: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            date: date.to_rfc3339(),
            kind,
            status: STATUS_APPLIED.to_string(),
            cv_tailored: false,
            motivation: false,
            favorite: false,
            platform: platform.into(),
            city: None,
            quality_score: None,
        }
    }

    /// Parsed timestamp, `None` for malformed historical data.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }

    /// Tailored CV plus motivation letter in one submission.
    pub fn is_combo(&self) -> bool {
        self.cv_tailored && self.motivation
    }

    /// Referral applications are tracked by platform.
    pub fn is_referral(&self) -> bool {
        self.platform.trim().eq_ignore_ascii_case("referral")
    }
}

/// One manual log entry. The timestamp may live in any of three fields
/// depending on which producer wrote it; `timestamp()` checks them in order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManualEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Status-change entries reference the application they touched.
    #[serde(rename = "applicationId", skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ManualEntry {
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(ts.to_rfc3339()),
            ..Self::default()
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .or(self.date.as_deref())
            .or(self.created_at.as_deref())
            .and_then(parse_timestamp)
    }

    /// New status of a `statusChange` entry. Older writers used `status`,
    /// newer ones `to`.
    pub fn new_status(&self) -> Option<&str> {
        self.to.as_deref().or(self.status.as_deref())
    }
}

/// Manual streams keyed by name.
pub type ManualLogs = BTreeMap<String, Vec<ManualEntry>>;

/// Lenient timestamp parsing: RFC 3339, then a naive datetime (taken as
/// local), then a bare date (local midnight), then epoch milliseconds.
/// Anything else is `None` and the entry is skipped by aggregation.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return local_to_utc(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return local_to_utc(naive);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return local_to_utc(date.and_hms_opt(0, 0, 0)?);
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(millis) = trimmed.parse::<i64>() {
            return Utc.timestamp_millis_opt(millis).single();
        }
    }

    None
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}
