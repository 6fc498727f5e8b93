use chrono::Utc;
use log::debug;
use rusqlite::{params, types::ToSql, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
    models::{Label, WorkSession, WorkSessionChanges},
};
use crate::error::{Error, Result};
use crate::guard::{self, ValidationMode};
use crate::lifecycle;
use crate::query::{SessionFilter, SessionQuery};

use super::labels::row_to_label;

const SESSION_COLUMNS: &str = "id, owner, started_at, ended_at, duration, note, updated_at";

fn row_to_session(row: &Row) -> Result<WorkSession> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(WorkSession {
        id: row.get("id")?,
        owner: row.get("owner")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        duration: row.get("duration")?,
        note: row.get("note")?,
        labels: Vec::new(),
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn labels_for_session(conn: &Connection, session_id: &str) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.name, l.owner, l.created_at, l.updated_at
         FROM labels l
         JOIN work_session_labels wsl ON wsl.label_id = l.id
         WHERE wsl.session_id = ?1
         ORDER BY l.name ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut labels = Vec::new();
    while let Some(row) = rows.next()? {
        labels.push(row_to_label(row)?);
    }
    Ok(labels)
}

/// Load one of `owner`'s sessions with its labels attached. Rows owned by
/// anyone else are reported exactly like rows that do not exist.
fn load_session(conn: &Connection, owner: &str, session_id: &str) -> Result<WorkSession> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM work_sessions WHERE id = ?1 AND owner = ?2"
    ))?;

    let mut rows = stmt.query(params![session_id, owner])?;
    let mut session = match rows.next()? {
        Some(row) => row_to_session(row)?,
        None => return Err(Error::not_found(format!("no such session: {session_id}"))),
    };
    drop(rows);
    drop(stmt);

    session.labels = labels_for_session(conn, session_id)?;
    Ok(session)
}

fn attach_labels(conn: &Connection, session_id: &str, label_ids: &[String]) -> Result<()> {
    for label_id in label_ids {
        conn.execute(
            "INSERT OR IGNORE INTO work_session_labels (session_id, label_id)
             VALUES (?1, ?2)",
            params![session_id, label_id],
        )?;
    }
    Ok(())
}

fn list_sessions_with(
    conn: &Connection,
    owner: &str,
    filter: &SessionFilter,
    page: Option<(i64, i64)>,
) -> Result<Vec<WorkSession>> {
    let mut sql = format!("SELECT {SESSION_COLUMNS} FROM work_sessions WHERE owner = ?");
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(owner.to_owned())];
    filter.push_conditions(&mut sql, &mut params_vec);

    // NULL sorts below every value in SQLite, so among sessions that
    // started at the same instant the open ones (NULL ended_at) come last.
    sql.push_str(" ORDER BY started_at DESC, ended_at DESC");

    if let Some((limit, offset)) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        params_vec.push(Box::new(limit));
        params_vec.push(Box::new(offset));
    }

    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_refs.as_slice())?;

    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    drop(rows);
    drop(stmt);

    for session in &mut sessions {
        session.labels = labels_for_session(conn, &session.id)?;
    }
    Ok(sessions)
}

impl Database {
    /// Start a new open session for `owner`.
    ///
    /// The only accepted body field is the optional label set; every
    /// reference is validated under `mode` before anything persists, so a
    /// single bad label leaves no session and no attachments behind.
    pub async fn create_session(
        &self,
        owner: &str,
        label_ids: &[String],
        mode: ValidationMode,
    ) -> Result<WorkSession> {
        let owner = owner.to_owned();
        let label_ids = label_ids.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            guard::verify_labels(&tx, &owner, &label_ids, mode)?;

            let now = Utc::now();
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO work_sessions (id, owner, started_at, note, updated_at)
                 VALUES (?1, ?2, ?3, '', ?4)",
                params![id, owner, now.to_rfc3339(), now.to_rfc3339()],
            )?;
            attach_labels(&tx, &id, &label_ids)?;

            let session = load_session(&tx, &owner, &id)?;
            tx.commit()?;

            debug!("Started session {id} for owner {owner}");
            Ok(session)
        })
        .await
    }

    pub async fn get_session(&self, owner: &str, session_id: &str) -> Result<WorkSession> {
        let owner = owner.to_owned();
        let session_id = session_id.to_owned();
        self.execute(move |conn| load_session(conn, &owner, &session_id))
            .await
    }

    /// List `owner`'s sessions, newest started first, under the filters of
    /// `query`. An unparsable time bound fails the whole call before the
    /// store is touched.
    pub async fn list_sessions(
        &self,
        owner: &str,
        query: &SessionQuery,
    ) -> Result<Vec<WorkSession>> {
        let filter = query.parse()?;
        let owner = owner.to_owned();
        self.execute(move |conn| list_sessions_with(conn, &owner, &filter, None))
            .await
    }

    pub async fn list_sessions_paginated(
        &self,
        owner: &str,
        query: &SessionQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WorkSession>> {
        let filter = query.parse()?;
        let owner = owner.to_owned();
        let page = (limit as i64, offset as i64);
        self.execute(move |conn| list_sessions_with(conn, &owner, &filter, Some(page)))
            .await
    }

    /// Apply caller-editable changes to a session.
    ///
    /// The note only becomes writable once the session has ended; a label
    /// set, when present, replaces the current attachments after passing
    /// the ownership guard. Owner and started_at are not part of
    /// [`WorkSessionChanges`] and can never be written here.
    pub async fn update_session(
        &self,
        owner: &str,
        session_id: &str,
        changes: WorkSessionChanges,
        mode: ValidationMode,
    ) -> Result<WorkSession> {
        let owner = owner.to_owned();
        let session_id = session_id.to_owned();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut session = load_session(&tx, &owner, &session_id)?;
            let now = Utc::now();

            if let Some(note) = changes.note.as_deref() {
                lifecycle::set_note(&mut session, note, now)?;
                tx.execute(
                    "UPDATE work_sessions SET note = ?1, updated_at = ?2 WHERE id = ?3",
                    params![session.note, now.to_rfc3339(), session_id],
                )?;
            }

            if let Some(label_ids) = &changes.labels {
                guard::verify_labels(&tx, &owner, label_ids, mode)?;
                tx.execute(
                    "DELETE FROM work_session_labels WHERE session_id = ?1",
                    params![session_id],
                )?;
                attach_labels(&tx, &session_id, label_ids)?;
            }

            let session = load_session(&tx, &owner, &session_id)?;
            tx.commit()?;
            Ok(session)
        })
        .await
    }

    /// End an open session, optionally recording a note in the same step.
    ///
    /// Transition, duration, and note land in one transaction; a second
    /// end of the same session observes the conflict and changes nothing.
    pub async fn end_session(
        &self,
        owner: &str,
        session_id: &str,
        note: Option<String>,
    ) -> Result<WorkSession> {
        let owner = owner.to_owned();
        let session_id = session_id.to_owned();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut session = load_session(&tx, &owner, &session_id)?;

            lifecycle::end(&mut session, Utc::now(), note.as_deref())?;

            tx.execute(
                "UPDATE work_sessions
                 SET ended_at = ?1, duration = ?2, note = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    session.ended_at.map(|dt| dt.to_rfc3339()),
                    session.duration,
                    session.note,
                    session.updated_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            tx.commit()?;

            debug!("Ended session {session_id} for owner {owner}");
            Ok(session)
        })
        .await
    }

    /// Hard-delete a session and its label attachments.
    pub async fn delete_session(&self, owner: &str, session_id: &str) -> Result<()> {
        let owner = owner.to_owned();
        let session_id = session_id.to_owned();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM work_session_labels WHERE session_id = ?1",
                params![session_id],
            )?;

            let rows_affected = tx.execute(
                "DELETE FROM work_sessions WHERE id = ?1 AND owner = ?2",
                params![session_id, owner],
            )?;
            if rows_affected == 0 {
                return Err(Error::not_found(format!("no such session: {session_id}")));
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
