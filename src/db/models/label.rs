//! Label data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-owned named tag, attachable only to that user's own sessions.
///
/// `(name, owner)` is unique: a user cannot hold two labels with the same
/// name, while different users are free to reuse a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
