//! Query parameters for the list endpoints, and their translation into SQL.
//!
//! Request-level parameters arrive as raw strings ([`SessionQuery`],
//! [`LabelQuery`]) and are parsed up front: a malformed time bound fails the
//! whole request instead of silently dropping the filter. The parsed form
//! ([`SessionFilter`]) renders its conditions into a WHERE tail; filters
//! always compose with AND on top of the owner scope the repositories apply.
//!
//! Ordering contract: sessions sort by `started_at` descending with ties
//! broken by `ended_at` descending. SQLite considers NULL smaller than any
//! value, so under DESC an open session (NULL `ended_at`) sorts *after* the
//! ended ones that started at the same instant. Labels sort by `name`
//! ascending.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::search::WORD_SIMILARITY_THRESHOLD;

/// Raw list-sessions parameters, exactly as a caller supplies them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    /// Fuzzy match against the note.
    pub search: Option<String>,
    /// ISO 8601 lower bound: keep sessions with `started_at >= value`.
    pub started_at: Option<String>,
    /// ISO 8601 upper bound: keep sessions with `ended_at <= value`.
    pub ended_at: Option<String>,
}

/// Raw list-labels parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelQuery {
    /// Fuzzy match against the label name.
    pub search: Option<String>,
}

/// Parsed, ready-to-render session filters.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub search: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

fn normalize_search(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl SessionQuery {
    /// Validate and parse every supplied parameter.
    ///
    /// Fails with `Validation` on the first unparsable time bound; no
    /// partially-applied filter set ever reaches the store.
    pub fn parse(&self) -> Result<SessionFilter> {
        Ok(SessionFilter {
            search: normalize_search(&self.search),
            started_at: self
                .started_at
                .as_deref()
                .map(parse_iso_datetime)
                .transpose()?,
            ended_at: self
                .ended_at
                .as_deref()
                .map(parse_iso_datetime)
                .transpose()?,
        })
    }
}

impl LabelQuery {
    pub fn parse(&self) -> Option<String> {
        normalize_search(&self.search)
    }
}

impl SessionFilter {
    /// Append this filter's conditions to a WHERE clause already scoped by
    /// owner. Conditions and parameters are pushed in matching order.
    pub(crate) fn push_conditions(&self, sql: &mut String, params: &mut Vec<Box<dyn ToSql>>) {
        if let Some(search) = &self.search {
            sql.push_str(" AND word_similarity(?, note) >= ?");
            params.push(Box::new(search.clone()));
            params.push(Box::new(WORD_SIMILARITY_THRESHOLD));
        }
        if let Some(started_at) = self.started_at {
            sql.push_str(" AND started_at >= ?");
            params.push(Box::new(started_at.to_rfc3339()));
        }
        if let Some(ended_at) = self.ended_at {
            sql.push_str(" AND ended_at <= ?");
            params.push(Box::new(ended_at.to_rfc3339()));
        }
    }
}

/// Parse an ISO 8601 datetime string into UTC.
///
/// Accepts an explicit offset, a naive datetime (taken as UTC, `T` or space
/// separated), or a bare date (midnight UTC). Anything else fails with the
/// offending value quoted verbatim.
pub fn parse_iso_datetime(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    Err(Error::validation(format!(
        "\"{value}\" is not a valid ISO 8601 formatted datetime string."
    )))
}
