//! End-to-end session flows against a real database file.

use tempfile::TempDir;
use worklog::{
    Database, Error, SessionQuery, SettingsStore, ValidationMode, WorkSessionChanges,
};

fn setup() -> (TempDir, Database) {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().expect("temp dir");
    let store = SettingsStore::new(dir.path().join("settings.json")).expect("settings");
    let mut settings = store.store();
    settings.database_path = dir.path().join("worklog.sqlite3");
    settings.page_size = 2;
    store.update(settings).expect("update settings");

    let db = store.open_database().expect("open database");
    (dir, db)
}

#[tokio::test]
async fn create_end_and_read_back() {
    let (_dir, db) = setup();

    let session = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");
    assert!(session.ended_at.is_none());
    assert_eq!(session.duration, None);
    assert_eq!(session.note, "");
    assert!(session.labels.is_empty());

    let listed = db
        .list_sessions("alice", &SessionQuery::default())
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);

    let wire = serde_json::to_value(&listed[0]).expect("serialize");
    assert!(wire["endedAt"].is_null());
    assert!(wire["duration"].is_null());

    let ended = db
        .end_session("alice", &session.id, Some("done".into()))
        .await
        .expect("end");
    assert!(ended.ended_at.is_some());
    assert_eq!(ended.note, "done");

    let fetched = db.get_session("alice", &session.id).await.expect("get");
    let wire = serde_json::to_value(&fetched).expect("serialize");
    assert!(wire["endedAt"].is_string());
    assert!(wire["duration"].is_number());
    assert_eq!(wire["note"], "done");
}

#[tokio::test]
async fn ending_twice_conflicts_and_keeps_first_result() {
    let (_dir, db) = setup();

    let session = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");
    let first = db
        .end_session("alice", &session.id, Some("first".into()))
        .await
        .expect("first end");

    let err = db
        .end_session("alice", &session.id, Some("second".into()))
        .await
        .expect_err("second end must fail");
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(err.to_string(), "session has already been ended");

    let fetched = db.get_session("alice", &session.id).await.expect("get");
    assert_eq!(fetched.ended_at, first.ended_at);
    assert_eq!(fetched.duration, first.duration);
    assert_eq!(fetched.note, "first");
}

#[tokio::test]
async fn sessions_are_invisible_across_owners() {
    let (_dir, db) = setup();

    let mine = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create mine");
    let theirs = db
        .create_session("bob", &[], ValidationMode::Scoped)
        .await
        .expect("create theirs");

    let listed = db
        .list_sessions("alice", &SessionQuery::default())
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, mine.id);

    let err = db
        .get_session("alice", &theirs.id)
        .await
        .expect_err("foreign get");
    assert!(matches!(err, Error::NotFound(_)));

    let err = db
        .delete_session("alice", &theirs.id)
        .await
        .expect_err("foreign delete");
    assert!(matches!(err, Error::NotFound(_)));

    let still_there = db.get_session("bob", &theirs.id).await.expect("get");
    assert_eq!(still_there.id, theirs.id);
}

#[tokio::test]
async fn foreign_label_fails_create_without_leaving_a_session() {
    let (_dir, db) = setup();

    let foreign = db.create_label("bob", "job").await.expect("bob label");

    let err = db
        .create_session("alice", &[foreign.id.clone()], ValidationMode::Scoped)
        .await
        .expect_err("cross-owner attach");
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.to_string(), format!("no such label: {}", foreign.id));

    let listed = db
        .list_sessions("alice", &SessionQuery::default())
        .await
        .expect("list");
    assert!(listed.is_empty(), "failed create must persist nothing");
}

#[tokio::test]
async fn strict_mode_reports_the_ownership_violation() {
    let (_dir, db) = setup();

    let foreign = db.create_label("bob", "job").await.expect("bob label");

    let err = db
        .create_session("alice", &[foreign.id.clone()], ValidationMode::Strict)
        .await
        .expect_err("cross-owner attach");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(
        err.to_string(),
        "label \"job\" does not belong to owner \"alice\""
    );
}

#[tokio::test]
async fn foreign_label_fails_update_and_leaves_attachments_unchanged() {
    let (_dir, db) = setup();

    let mine = db.create_label("alice", "deep work").await.expect("label");
    let foreign = db.create_label("bob", "job").await.expect("bob label");

    let session = db
        .create_session("alice", &[mine.id.clone()], ValidationMode::Scoped)
        .await
        .expect("create");
    assert_eq!(session.labels.len(), 1);

    let err = db
        .update_session(
            "alice",
            &session.id,
            WorkSessionChanges {
                note: None,
                labels: Some(vec![foreign.id.clone()]),
            },
            ValidationMode::Scoped,
        )
        .await
        .expect_err("cross-owner update");
    assert!(matches!(err, Error::NotFound(_)));

    let fetched = db.get_session("alice", &session.id).await.expect("get");
    assert_eq!(fetched.labels.len(), 1);
    assert_eq!(fetched.labels[0].id, mine.id);
}

#[tokio::test]
async fn attached_labels_come_back_sorted_by_name() {
    let (_dir, db) = setup();

    let writing = db.create_label("alice", "writing").await.expect("label");
    let admin = db.create_label("alice", "admin").await.expect("label");

    let session = db
        .create_session(
            "alice",
            &[writing.id.clone(), admin.id.clone()],
            ValidationMode::Scoped,
        )
        .await
        .expect("create");

    let names: Vec<&str> = session.labels.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["admin", "writing"]);
}

#[tokio::test]
async fn note_is_rejected_while_open_and_editable_after_end() {
    let (_dir, db) = setup();

    let session = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");

    let err = db
        .update_session(
            "alice",
            &session.id,
            WorkSessionChanges {
                note: Some("some text".into()),
                labels: None,
            },
            ValidationMode::Scoped,
        )
        .await
        .expect_err("note on open session");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(
        err.to_string(),
        "cannot change the note before the session has ended"
    );

    db.end_session("alice", &session.id, None)
        .await
        .expect("end");

    let updated = db
        .update_session(
            "alice",
            &session.id,
            WorkSessionChanges {
                note: Some("revised afterwards".into()),
                labels: None,
            },
            ValidationMode::Scoped,
        )
        .await
        .expect("note on ended session");
    assert_eq!(updated.note, "revised afterwards");

    let fetched = db.get_session("alice", &session.id).await.expect("get");
    assert_eq!(fetched.note, "revised afterwards");
}

#[tokio::test]
async fn search_matches_misspelled_notes() {
    let (_dir, db) = setup();

    let session = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");
    db.end_session(
        "alice",
        &session.id,
        Some("Gumby rides on the path of Middlesbrough".into()),
    )
    .await
    .expect("end");

    let query = SessionQuery {
        search: Some("Middlesbruh".into()),
        ..SessionQuery::default()
    };
    let hits = db.list_sessions("alice", &query).await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, session.id);

    let query = SessionQuery {
        search: Some("zzz_no_match".into()),
        ..SessionQuery::default()
    };
    let misses = db.list_sessions("alice", &query).await.expect("search");
    assert!(misses.is_empty());
}

#[tokio::test]
async fn time_bounds_filter_the_list() {
    let (_dir, db) = setup();

    let session = db
        .create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");
    db.end_session("alice", &session.id, None)
        .await
        .expect("end");

    let query = SessionQuery {
        started_at: Some("2000-01-01T00:00:00Z".into()),
        ended_at: Some("2100-01-01T00:00:00Z".into()),
        ..SessionQuery::default()
    };
    let hits = db.list_sessions("alice", &query).await.expect("list");
    assert_eq!(hits.len(), 1);

    let query = SessionQuery {
        started_at: Some("2100-01-01T00:00:00Z".into()),
        ..SessionQuery::default()
    };
    let future = db.list_sessions("alice", &query).await.expect("list");
    assert!(future.is_empty());

    let query = SessionQuery {
        ended_at: Some("2000-01-01T00:00:00Z".into()),
        ..SessionQuery::default()
    };
    let past = db.list_sessions("alice", &query).await.expect("list");
    assert!(past.is_empty());
}

#[tokio::test]
async fn malformed_time_bound_fails_the_whole_request() {
    let (_dir, db) = setup();

    db.create_session("alice", &[], ValidationMode::Scoped)
        .await
        .expect("create");

    let query = SessionQuery {
        started_at: Some("not-a-date".into()),
        ..SessionQuery::default()
    };
    let err = db
        .list_sessions("alice", &query)
        .await
        .expect_err("bad bound");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(
        err.to_string(),
        "\"not-a-date\" is not a valid ISO 8601 formatted datetime string."
    );
}

#[tokio::test]
async fn pagination_walks_newest_first() {
    let (_dir, db) = setup();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let session = db
            .create_session("alice", &[], ValidationMode::Scoped)
            .await
            .expect("create");
        ids.push(session.id);
    }

    let store = SettingsStore::new(_dir.path().join("settings.json")).expect("settings");
    let page_size = store.store().page_size;
    assert_eq!(page_size, 2);

    let first_page = db
        .list_sessions_paginated("alice", &SessionQuery::default(), page_size, 0)
        .await
        .expect("page 1");
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].id, ids[2], "newest started first");

    let second_page = db
        .list_sessions_paginated("alice", &SessionQuery::default(), page_size, page_size)
        .await
        .expect("page 2");
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, ids[0]);
}

#[tokio::test]
async fn delete_removes_the_session_for_good() {
    let (_dir, db) = setup();

    let label = db.create_label("alice", "deep work").await.expect("label");
    let session = db
        .create_session("alice", &[label.id.clone()], ValidationMode::Scoped)
        .await
        .expect("create");

    db.delete_session("alice", &session.id)
        .await
        .expect("delete");

    let err = db
        .get_session("alice", &session.id)
        .await
        .expect_err("deleted");
    assert!(matches!(err, Error::NotFound(_)));

    let err = db
        .delete_session("alice", &session.id)
        .await
        .expect_err("double delete");
    assert!(matches!(err, Error::NotFound(_)));

    // The label itself survives the session.
    let still_there = db.get_label("alice", &label.id).await.expect("label");
    assert_eq!(still_there.name, "deep work");
}
