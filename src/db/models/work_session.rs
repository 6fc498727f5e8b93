//! Work-session data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Label;

/// A bounded interval of tracked work time.
///
/// A session is *open* while `ended_at` is unset and *ended* afterwards;
/// `duration` (whole minutes) is filled in by the same transition that sets
/// `ended_at`, so the two are always both present or both absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSession {
    pub id: String,
    pub owner: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Elapsed whole minutes, floor of the elapsed seconds over 60.
    pub duration: Option<i64>,
    pub note: String,
    pub labels: Vec<Label>,
    pub updated_at: DateTime<Utc>,
}

impl WorkSession {
    pub fn ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Caller-editable fields for a session update.
///
/// Owner and `started_at` have no representation here on purpose: they are
/// immutable once the record exists, so the update path cannot carry them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSessionChanges {
    pub note: Option<String>,
    /// Replacement for the attached label set, validated against the
    /// session's owner before anything persists.
    pub labels: Option<Vec<String>>,
}
