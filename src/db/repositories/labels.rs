use chrono::Utc;
use log::debug;
use rusqlite::{params, types::ToSql, Connection, ErrorCode, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::Label,
};
use crate::error::{Error, Result};
use crate::query::LabelQuery;
use crate::search::WORD_SIMILARITY_THRESHOLD;

const MAX_NAME_LEN: usize = 255;

const LABEL_COLUMNS: &str = "id, name, owner, created_at, updated_at";

pub(super) fn row_to_label(row: &Row) -> Result<Label> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Label {
        id: row.get("id")?,
        name: row.get("name")?,
        owner: row.get("owner")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("label name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "label name must be {MAX_NAME_LEN} characters or fewer"
        )));
    }
    Ok(())
}

/// True when `owner` already holds a label called `name`, other than
/// `exclude_id` (so a rename to the current name passes).
fn name_taken(
    conn: &Connection,
    owner: &str,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<bool> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM labels
            WHERE name = ?1 AND owner = ?2 AND id != COALESCE(?3, '')
         )",
        params![name, owner, exclude_id],
        |row| row.get(0),
    )?;
    Ok(taken != 0)
}

fn fetch_label(conn: &Connection, owner: &str, label_id: &str) -> Result<Label> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LABEL_COLUMNS} FROM labels WHERE id = ?1 AND owner = ?2"
    ))?;

    let mut rows = stmt.query(params![label_id, owner])?;
    match rows.next()? {
        Some(row) => row_to_label(row),
        None => Err(Error::not_found(format!("no such label: {label_id}"))),
    }
}

/// The UNIQUE (name, owner) index is the backstop behind [`name_taken`];
/// surface a trip over it as the same conflict the pre-check reports.
fn map_unique_violation(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == ErrorCode::ConstraintViolation =>
        {
            Error::conflict("you already have a label with this name")
        }
        _ => Error::Storage(err),
    }
}

impl Database {
    /// Create a label for `owner`. Names are unique per owner; different
    /// owners may reuse a name freely.
    pub async fn create_label(&self, owner: &str, name: &str) -> Result<Label> {
        let owner = owner.to_owned();
        let name = name.to_owned();
        self.execute(move |conn| {
            check_name(&name)?;

            // Checked in the same DB task that inserts; the single worker
            // thread leaves no gap for a concurrent duplicate.
            if name_taken(conn, &owner, &name, None)? {
                return Err(Error::conflict("you already have a label with this name"));
            }

            let now = Utc::now();
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO labels (id, name, owner, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, owner, now.to_rfc3339(), now.to_rfc3339()],
            )
            .map_err(map_unique_violation)?;

            debug!("Created label {id} for owner {owner}");
            fetch_label(conn, &owner, &id)
        })
        .await
    }

    pub async fn get_label(&self, owner: &str, label_id: &str) -> Result<Label> {
        let owner = owner.to_owned();
        let label_id = label_id.to_owned();
        self.execute(move |conn| fetch_label(conn, &owner, &label_id))
            .await
    }

    /// List `owner`'s labels, name ascending, optionally narrowed by a
    /// fuzzy search over names. This is also the candidate query for
    /// attach flows: nothing foreign ever appears in it.
    pub async fn list_labels(&self, owner: &str, query: &LabelQuery) -> Result<Vec<Label>> {
        let owner = owner.to_owned();
        let search = query.parse();
        self.execute(move |conn| {
            let mut sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE owner = ?");
            let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(owner)];
            if let Some(search) = search {
                sql.push_str(" AND word_similarity(?, name) >= ?");
                params_vec.push(Box::new(search));
                params_vec.push(Box::new(WORD_SIMILARITY_THRESHOLD));
            }
            sql.push_str(" ORDER BY name ASC");

            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_refs.as_slice())?;

            let mut labels = Vec::new();
            while let Some(row) = rows.next()? {
                labels.push(row_to_label(row)?);
            }
            Ok(labels)
        })
        .await
    }

    /// Rename a label. The duplicate check excludes the label itself, so
    /// renaming to the current name is a no-op rather than a conflict.
    pub async fn update_label(&self, owner: &str, label_id: &str, name: &str) -> Result<Label> {
        let owner = owner.to_owned();
        let label_id = label_id.to_owned();
        let name = name.to_owned();
        self.execute(move |conn| {
            check_name(&name)?;

            if name_taken(conn, &owner, &name, Some(&label_id))? {
                return Err(Error::conflict("you already have a label with this name"));
            }

            let now = Utc::now();
            let rows_affected = conn
                .execute(
                    "UPDATE labels SET name = ?1, updated_at = ?2
                     WHERE id = ?3 AND owner = ?4",
                    params![name, now.to_rfc3339(), label_id, owner],
                )
                .map_err(map_unique_violation)?;

            if rows_affected == 0 {
                return Err(Error::not_found(format!("no such label: {label_id}")));
            }

            fetch_label(conn, &owner, &label_id)
        })
        .await
    }

    /// Delete a label and detach it from every session that carried it.
    pub async fn delete_label(&self, owner: &str, label_id: &str) -> Result<()> {
        let owner = owner.to_owned();
        let label_id = label_id.to_owned();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            // Detach first; the tx rolls back if the label turns out to be
            // missing or foreign, so nothing is lost on the error path.
            tx.execute(
                "DELETE FROM work_session_labels WHERE label_id = ?1",
                params![label_id],
            )?;

            let rows_affected = tx.execute(
                "DELETE FROM labels WHERE id = ?1 AND owner = ?2",
                params![label_id, owner],
            )?;
            if rows_affected == 0 {
                return Err(Error::not_found(format!("no such label: {label_id}")));
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
