use relation_core::db::migrations::latest_version;
use relation_core::db::{open_db, open_db_in_memory, DbError, DEFAULT_BUSY_TIMEOUT};
use relation_core::Database;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "resources");
    assert_table_exists(&conn, "relations");
    assert_table_exists(&conn, "data_locks");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relations.db");

    let conn_first = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "relations");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, DEFAULT_BUSY_TIMEOUT).unwrap_err();
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
fn relations_table_uses_composite_primary_key() {
    let conn = open_db_in_memory().unwrap();

    conn.execute(
        "INSERT INTO relations (parent_id, child_id, kind) VALUES ('p', 'c', 'space_entity');",
        [],
    )
    .unwrap();
    let duplicate = conn.execute(
        "INSERT INTO relations (parent_id, child_id, kind) VALUES ('p', 'c', 'space_entity');",
        [],
    );
    assert!(duplicate.is_err());

    conn.execute(
        "INSERT INTO relations (parent_id, child_id, kind) VALUES ('p', 'd', 'space_entity');",
        [],
    )
    .unwrap();
}

#[tokio::test]
async fn async_handle_opens_file_database_on_blocking_pool() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handle.db");

    let db = Database::open(path.clone(), DEFAULT_BUSY_TIMEOUT).await.unwrap();
    let version = db
        .with_conn(|conn| -> Result<u32, DbError> {
            Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(path.exists());
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
