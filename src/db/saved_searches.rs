// src/db/saved_searches.rs
use crate::domain::saved_search::{AlertFrequency, SavedSearch, SearchCriteria};
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// Saved searches that have alerts switched on, with their owner's address.
pub fn alert_audience(conn: &Connection) -> Result<Vec<SavedSearch>, ServerError> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                s.id,               -- 0
                s.user_id,          -- 1
                u.email,            -- 2
                u.name,             -- 3
                s.name,             -- 4
                s.criteria,         -- 5
                s.alert_frequency,  -- 6
                s.last_alerted_at,  -- 7
                s.created_at        -- 8
            FROM saved_searches s
            JOIN users u ON u.id = s.user_id
            WHERE s.alert_frequency != 'never'
            ORDER BY s.id
            "#,
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<DateTime<Utc>>>(7)?,
                row.get::<_, DateTime<Utc>>(8)?,
            ))
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        let (id, user_id, user_email, user_name, name, criteria_json, frequency, last_alerted_at, created_at) =
            r.map_err(|e| ServerError::DbError(e.to_string()))?;

        let criteria = match serde_json::from_str::<SearchCriteria>(&criteria_json) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Skipping saved search {id}: unreadable criteria ({e})");
                continue;
            }
        };

        out.push(SavedSearch {
            id,
            user_id,
            user_email,
            user_name,
            name,
            criteria,
            frequency: AlertFrequency::parse(&frequency),
            last_alerted_at,
            created_at,
        });
    }
    Ok(out)
}

pub fn mark_alerted(conn: &Connection, search_id: i64, now: DateTime<Utc>) -> Result<(), ServerError> {
    conn.execute(
        "UPDATE saved_searches SET last_alerted_at = ?1 WHERE id = ?2",
        params![now, search_id],
    )
    .map_err(|e| ServerError::DbError(format!("mark saved search {search_id} alerted: {e}")))?;
    Ok(())
}
