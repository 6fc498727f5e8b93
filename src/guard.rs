//! Label ownership validation.
//!
//! A label may only ever be attached to sessions of the user that owns it.
//! Every operation that accepts label references runs the whole batch
//! through [`verify_labels`] inside its own transaction, before anything is
//! written; one bad reference fails the operation with no partial
//! attachment.
//!
//! There are two reporting surfaces, selected by the caller's context
//! rather than inferred from request shape. Programmatic clients get the
//! scoped surface, where the candidate set is narrowed to the acting user's
//! labels up front and a foreign label is indistinguishable from a missing
//! one. Trusted contexts (an operator acting across accounts) get the
//! strict surface, which says exactly which label belongs to whom.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// How ownership violations are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Report mismatches explicitly, naming the offending label and owner.
    Strict,
    /// Narrow candidates to the acting user's labels first; anything
    /// outside that set is "not found", hiding existence across owners.
    Scoped,
}

/// Check that every referenced label exists and belongs to `owner`.
///
/// Runs against the caller's connection (or open transaction) so the check
/// and the write it protects commit or fail together.
pub fn verify_labels(
    conn: &Connection,
    owner: &str,
    label_ids: &[String],
    mode: ValidationMode,
) -> Result<()> {
    for label_id in label_ids {
        verify_label(conn, owner, label_id, mode)?;
    }
    Ok(())
}

fn verify_label(conn: &Connection, owner: &str, label_id: &str, mode: ValidationMode) -> Result<()> {
    match mode {
        ValidationMode::Scoped => {
            let visible: Option<String> = conn
                .query_row(
                    "SELECT id FROM labels WHERE id = ?1 AND owner = ?2",
                    params![label_id, owner],
                    |row| row.get(0),
                )
                .optional()?;

            if visible.is_none() {
                return Err(Error::not_found(format!("no such label: {label_id}")));
            }
        }
        ValidationMode::Strict => {
            let found: Option<(String, String)> = conn
                .query_row(
                    "SELECT name, owner FROM labels WHERE id = ?1",
                    params![label_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match found {
                None => {
                    return Err(Error::validation(format!(
                        "label \"{label_id}\" does not exist"
                    )));
                }
                Some((name, label_owner)) if label_owner != owner => {
                    return Err(Error::validation(format!(
                        "label \"{name}\" does not belong to owner \"{owner}\""
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
