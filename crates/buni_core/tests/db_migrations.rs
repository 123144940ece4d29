use buni_core::db::migrations::latest_version;
use buni_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().expect("open in-memory db");

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "settings");
}

#[test]
fn settings_rows_get_column_defaults() {
    let conn = open_db_in_memory().expect("open in-memory db");
    conn.execute(
        "INSERT INTO settings (key, value) VALUES ('site_title', 'Buni');",
        [],
    )
    .expect("insert setting");

    let (value_type, group_name): (String, String) = conn
        .query_row(
            "SELECT value_type, group_name FROM settings WHERE key = 'site_title';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read setting");
    assert_eq!(value_type, "string");
    assert_eq!(group_name, "general");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("buni.sqlite3");

    let conn_first = open_db(&path).expect("first open");
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).expect("second open");
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "settings");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).expect("raw open");
    conn.execute_batch("PRAGMA user_version = 999;")
        .expect("bump version");
    drop(conn);

    let err = open_db(&path).expect_err("newer schema must be rejected");
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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .expect("read user_version")
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
        .expect("query sqlite_master");
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
