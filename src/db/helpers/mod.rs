use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub(crate) fn parse_datetime(value: &str, field: &'static str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| Error::Corrupt {
            field,
            message: format!("'{value}': {err}"),
        })
}

pub(crate) fn parse_optional_datetime(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>> {
    value
        .as_deref()
        .map(|raw| parse_datetime(raw, field))
        .transpose()
}
