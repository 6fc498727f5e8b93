//! Work-session lifecycle: the open -> ended transition and the note rules.
//!
//! A session has exactly two states. It is created open and ends at most
//! once; there is no way back. Everything here is pure: callers pass the
//! clock in and persist the mutated record themselves, inside the same
//! transaction that loaded it, so a failed transition never leaves a
//! half-written row behind.

use chrono::{DateTime, Utc};

use crate::db::models::WorkSession;
use crate::error::{Error, Result};

/// Upper bound on the note field, in characters.
pub const MAX_NOTE_LEN: usize = 1000;

fn check_note(note: &str) -> Result<()> {
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(Error::validation(format!(
            "note must be {MAX_NOTE_LEN} characters or fewer"
        )));
    }
    Ok(())
}

/// Whole minutes elapsed between two instants, floored. Never rounds up;
/// 45 minutes and 30 seconds is 45.
pub fn elapsed_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    (ended_at - started_at).num_seconds().max(0) / 60
}

/// End an open session.
///
/// Sets `ended_at` to `now` and `duration` to the floored elapsed minutes.
/// A non-empty `note` overwrites the stored note in the same step; an empty
/// or absent one leaves it untouched. Ending an already-ended session is a
/// `Conflict` and mutates nothing.
pub fn end(session: &mut WorkSession, now: DateTime<Utc>, note: Option<&str>) -> Result<()> {
    if session.ended() {
        return Err(Error::conflict("session has already been ended"));
    }

    let note = note.filter(|n| !n.is_empty());
    if let Some(note) = note {
        check_note(note)?;
    }

    session.ended_at = Some(now);
    session.duration = Some(elapsed_minutes(session.started_at, now));
    if let Some(note) = note {
        session.note = note.to_owned();
    }
    session.updated_at = now;
    Ok(())
}

/// Replace the note on an ended session.
///
/// The note is write-protected while the session is open; an update
/// carrying one fails as `Validation` without touching the record.
pub fn set_note(session: &mut WorkSession, note: &str, now: DateTime<Utc>) -> Result<()> {
    if !session.ended() {
        return Err(Error::validation(
            "cannot change the note before the session has ended",
        ));
    }
    check_note(note)?;

    session.note = note.to_owned();
    session.updated_at = now;
    Ok(())
}
