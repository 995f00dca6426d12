use crate::db::connection::{init_db, Database};
use crate::domain::saved_search::SearchCriteria;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tempfile::TempDir;

/// Fresh database with the production schema. Keep the `TempDir` alive for
/// as long as the database is used.
pub fn init_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
    let path = dir.path().join("test.sqlite3");
    let db = Database::new(path.to_string_lossy().into_owned());

    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

    (dir, db)
}

pub fn insert_user(db: &Database, email: &str, name: Option<&str>) -> i64 {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (email, name, created_at) VALUES (?1, ?2, ?3)",
            params![email, name, Utc::now()],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .expect("insert user")
}

pub fn insert_saved_search(
    db: &Database,
    user_id: i64,
    name: &str,
    criteria: &SearchCriteria,
    frequency: &str,
    created_at: DateTime<Utc>,
    last_alerted_at: Option<DateTime<Utc>>,
) -> i64 {
    let criteria = serde_json::to_string(criteria).expect("criteria json");
    db.with_conn(|conn| {
        conn.execute(
            r#"
            INSERT INTO saved_searches (user_id, name, criteria, alert_frequency, last_alerted_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![user_id, name, criteria, frequency, last_alerted_at, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .expect("insert saved search")
}
