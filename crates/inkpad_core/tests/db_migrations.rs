use inkpad_core::db::migrations::latest_version;
use inkpad_core::db::{open_db, open_db_in_memory, wipe, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "strokes");
    assert_table_exists(&conn, "text_elements");
    assert_table_exists(&conn, "canvas_state");
    assert_table_exists(&conn, "note_tags");
    assert_table_exists(&conn, "folders");
}

#[test]
fn cumulative_migrations_produce_all_note_columns() {
    let conn = open_db_in_memory().unwrap();

    for column in [
        "id",
        "title",
        "created_at",
        "modified_at",
        "tags",
        "folder_id",
        "text_content",
        "is_text_only",
    ] {
        assert_column_exists(&conn, "notes", column);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inkpad.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "notes");
}

#[test]
fn migrations_resume_from_partial_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.db");

    // Simulate a database left at v1 by an old build.
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT 0,
                modified_at INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE strokes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id TEXT NOT NULL,
                stroke_index INTEGER NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE text_elements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id TEXT NOT NULL,
                text_index INTEGER NOT NULL,
                position_x REAL NOT NULL,
                position_y REAL NOT NULL,
                text TEXT NOT NULL
            );
            CREATE TABLE canvas_state (
                note_id TEXT PRIMARY KEY,
                matrix_data TEXT NOT NULL,
                scale REAL NOT NULL
            );
            PRAGMA user_version = 1;",
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "note_tags");
    assert_table_exists(&conn, "folders");
    assert_column_exists(&conn, "notes", "folder_id");
    assert_column_exists(&conn, "notes", "is_text_only");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wipe_clears_every_relation_and_reopen_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wiped.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO notes (id, title) VALUES ('a0000000-0000-0000-0000-000000000000', 'x');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO folders (id, name) VALUES ('b0000000-0000-0000-0000-000000000000', 'f');",
        [],
    )
    .unwrap();

    wipe(conn).unwrap();

    let reopened = open_db(&path).unwrap();
    let notes: i64 = reopened
        .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap();
    let folders: i64 = reopened
        .query_row("SELECT COUNT(*) FROM folders;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(notes, 0);
    assert_eq!(folders, 0);
    assert_eq!(schema_version(&reopened), latest_version());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table: &str, column: &str) {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    let mut rows = stmt.query([]).unwrap();
    while let Some(row) = rows.next().unwrap() {
        let name: String = row.get(1).unwrap();
        if name == column {
            return;
        }
    }
    panic!("column {table}.{column} does not exist");
}
