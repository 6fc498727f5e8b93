//! Backend core of a multi-user work-session tracker.
//!
//! A user starts a work session, optionally tags it with labels, and later
//! ends it with a note. This crate owns the rules that make that safe in a
//! multi-user store:
//!
//! - [`lifecycle`]: the open to ended state machine, duration computation,
//!   and the ended-only note rule;
//! - [`guard`]: labels attach only to sessions of their own owner, with a
//!   strict (admin) and a scoped (API client) reporting surface;
//! - [`query`]: owner-scoped listing with fuzzy search and ISO 8601 time
//!   bounds that fail loudly instead of silently dropping a filter.
//!
//! Everything persists through [`Database`], an async handle over a single
//! SQLite worker thread. The single writer serializes all transactions, so
//! compound operations (end + note, create + attach) are atomic and two
//! racing `end` calls resolve to exactly one winner. The crate never
//! resolves identity itself: callers authenticate upstream and pass the
//! acting user into every operation.
//!
//! ```rust,ignore
//! let db = Database::new(data_dir.join("worklog.sqlite3"))?;
//!
//! let session = db.create_session("alice", &[], ValidationMode::Scoped).await?;
//! let ended = db.end_session("alice", &session.id, Some("done".into())).await?;
//! assert_eq!(ended.note, "done");
//! ```

mod db;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod query;
pub mod search;
pub mod settings;

pub use db::models::{Label, WorkSession, WorkSessionChanges};
pub use db::Database;
pub use error::{Error, Result};
pub use guard::ValidationMode;
pub use query::{LabelQuery, SessionQuery};
pub use settings::{SettingsStore, StoreSettings};
