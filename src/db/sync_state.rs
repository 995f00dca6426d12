// src/db/sync_state.rs
use crate::errors::ServerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

const STATE_ID: i64 = 1;

/// The singleton row the sync orchestrator owns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub last_sync_timestamp: Option<DateTime<Utc>>,
    pub full_sync_in_progress: bool,
    pub full_sync_cursor: Option<DateTime<Utc>>,
    pub full_sync_generation: i64,
    pub full_sync_started_at: Option<DateTime<Utc>>,
    pub last_full_sync_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_listings: i64,
    #[serde(skip)]
    pub lock_expires_at: Option<DateTime<Utc>>,
}

/// Fields to merge into the stored state. `None` leaves a field alone;
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatePatch {
    pub last_sync_timestamp: Option<Option<DateTime<Utc>>>,
    pub full_sync_in_progress: Option<bool>,
    pub full_sync_cursor: Option<Option<DateTime<Utc>>>,
    pub full_sync_generation: Option<i64>,
    pub full_sync_started_at: Option<Option<DateTime<Utc>>>,
    pub last_full_sync_at: Option<Option<DateTime<Utc>>>,
    pub last_run_at: Option<Option<DateTime<Utc>>>,
    pub total_listings: Option<i64>,
}

impl SyncStatePatch {
    pub fn apply_to(&self, state: &mut SyncState) {
        if let Some(v) = self.last_sync_timestamp {
            state.last_sync_timestamp = v;
        }
        if let Some(v) = self.full_sync_in_progress {
            state.full_sync_in_progress = v;
        }
        if let Some(v) = self.full_sync_cursor {
            state.full_sync_cursor = v;
        }
        if let Some(v) = self.full_sync_generation {
            state.full_sync_generation = v;
        }
        if let Some(v) = self.full_sync_started_at {
            state.full_sync_started_at = v;
        }
        if let Some(v) = self.last_full_sync_at {
            state.last_full_sync_at = v;
        }
        if let Some(v) = self.last_run_at {
            state.last_run_at = v;
        }
        if let Some(v) = self.total_listings {
            state.total_listings = v;
        }
    }
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<SyncState> {
    Ok(SyncState {
        last_sync_timestamp: row.get(0)?,
        full_sync_in_progress: row.get(1)?,
        full_sync_cursor: row.get(2)?,
        full_sync_generation: row.get(3)?,
        full_sync_started_at: row.get(4)?,
        last_full_sync_at: row.get(5)?,
        last_run_at: row.get(6)?,
        total_listings: row.get(7)?,
        lock_expires_at: row.get(8)?,
    })
}

/// Return the singleton, creating it with defaults on first run.
pub fn read(conn: &Connection) -> Result<SyncState, ServerError> {
    conn.execute(
        "INSERT OR IGNORE INTO sync_state (id) VALUES (?1)",
        params![STATE_ID],
    )
    .map_err(|e| ServerError::DbError(format!("bootstrap sync_state failed: {e}")))?;

    conn.query_row(
        r#"
        SELECT
            last_sync_timestamp,
            full_sync_in_progress,
            full_sync_cursor,
            full_sync_generation,
            full_sync_started_at,
            last_full_sync_at,
            last_run_at,
            total_listings,
            lock_expires_at
        FROM sync_state
        WHERE id = ?1
        "#,
        params![STATE_ID],
        state_from_row,
    )
    .map_err(|e| ServerError::DbError(format!("read sync_state failed: {e}")))
}

/// Merge `patch` into the stored row and return the result.
pub fn write(conn: &mut Connection, patch: &SyncStatePatch) -> Result<SyncState, ServerError> {
    let tx = conn.transaction()?;
    let state = merge_patch(&tx, patch)?;
    tx.commit()?;
    Ok(state)
}

/// Like [`write`], but only while `token` still owns the sync lease. A lease
/// that expired and was taken over yields `Conflict` and nothing is written.
pub fn write_as_holder(
    conn: &mut Connection,
    token: &str,
    patch: &SyncStatePatch,
) -> Result<SyncState, ServerError> {
    let tx = conn.transaction()?;
    if lock_holder(&tx)?.as_deref() != Some(token) {
        return Err(ServerError::Conflict(
            "sync lease was taken over by another invocation".into(),
        ));
    }
    let state = merge_patch(&tx, patch)?;
    tx.commit()?;
    Ok(state)
}

fn merge_patch(conn: &Connection, patch: &SyncStatePatch) -> Result<SyncState, ServerError> {
    let mut state = read(conn)?;
    patch.apply_to(&mut state);

    conn.execute(
        r#"
        UPDATE sync_state SET
            last_sync_timestamp = ?1,
            full_sync_in_progress = ?2,
            full_sync_cursor = ?3,
            full_sync_generation = ?4,
            full_sync_started_at = ?5,
            last_full_sync_at = ?6,
            last_run_at = ?7,
            total_listings = ?8
        WHERE id = ?9
        "#,
        params![
            state.last_sync_timestamp,
            state.full_sync_in_progress,
            state.full_sync_cursor,
            state.full_sync_generation,
            state.full_sync_started_at,
            state.last_full_sync_at,
            state.last_run_at,
            state.total_listings,
            STATE_ID,
        ],
    )
    .map_err(|e| ServerError::DbError(format!("write sync_state failed: {e}")))?;

    Ok(state)
}

/// Take the sync lease if nobody holds an unexpired one. Returns whether it was acquired.
pub fn try_acquire_lock(
    conn: &Connection,
    token: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<bool, ServerError> {
    read(conn)?;

    let changed = conn
        .execute(
            r#"
            UPDATE sync_state
            SET lock_token = ?1, lock_expires_at = ?2
            WHERE id = ?3 AND (lock_expires_at IS NULL OR lock_expires_at < ?4)
            "#,
            params![token, expires_at, STATE_ID, now],
        )
        .map_err(|e| ServerError::DbError(format!("acquire sync lock failed: {e}")))?;

    Ok(changed == 1)
}

/// Push the lease expiry out. Returns false when `token` no longer owns it.
pub fn renew_lock(
    conn: &Connection,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<bool, ServerError> {
    let changed = conn
        .execute(
            "UPDATE sync_state SET lock_expires_at = ?1 WHERE id = ?2 AND lock_token = ?3",
            params![expires_at, STATE_ID, token],
        )
        .map_err(|e| ServerError::DbError(format!("renew sync lock failed: {e}")))?;

    Ok(changed == 1)
}

/// Drop the lease, but only if `token` still owns it.
pub fn release_lock(conn: &Connection, token: &str) -> Result<(), ServerError> {
    conn.execute(
        "UPDATE sync_state SET lock_token = NULL, lock_expires_at = NULL WHERE id = ?1 AND lock_token = ?2",
        params![STATE_ID, token],
    )
    .map_err(|e| ServerError::DbError(format!("release sync lock failed: {e}")))?;
    Ok(())
}

pub fn lock_holder(conn: &Connection) -> Result<Option<String>, ServerError> {
    conn.query_row(
        "SELECT lock_token FROM sync_state WHERE id = ?1",
        params![STATE_ID],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map(Option::flatten)
    .map_err(|e| ServerError::DbError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::init_test_db;
    use chrono::{Duration, TimeZone};

    #[test]
    fn read_bootstraps_default_row() {
        let (_dir, db) = init_test_db();
        let state = db.with_conn(|conn| read(conn)).unwrap();
        assert_eq!(state, SyncState::default());
    }

    #[test]
    fn write_merges_only_given_fields() {
        let (_dir, db) = init_test_db();
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        db.with_conn(|conn| {
            write(
                conn,
                &SyncStatePatch {
                    last_sync_timestamp: Some(Some(t)),
                    full_sync_in_progress: Some(true),
                    full_sync_cursor: Some(Some(t)),
                    total_listings: Some(42),
                    ..Default::default()
                },
            )
        })
        .unwrap();

        let state = db
            .with_conn(|conn| {
                write(
                    conn,
                    &SyncStatePatch {
                        full_sync_cursor: Some(None),
                        ..Default::default()
                    },
                )
            })
            .unwrap();

        assert_eq!(state.last_sync_timestamp, Some(t));
        assert!(state.full_sync_in_progress);
        assert_eq!(state.full_sync_cursor, None);
        assert_eq!(state.total_listings, 42);

        let reread = db.with_conn(|conn| read(conn)).unwrap();
        assert_eq!(reread, state);
    }

    #[test]
    fn lock_is_exclusive_until_released_or_expired() {
        let (_dir, db) = init_test_db();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = now + Duration::minutes(10);

        db.with_conn(|conn| {
            assert!(try_acquire_lock(conn, "a", now, later)?);
            assert!(!try_acquire_lock(conn, "b", now, later)?);
            assert_eq!(lock_holder(conn)?.as_deref(), Some("a"));

            // Wrong owner cannot release.
            release_lock(conn, "b")?;
            assert!(!try_acquire_lock(conn, "b", now, later)?);

            release_lock(conn, "a")?;
            assert!(try_acquire_lock(conn, "b", now, later)?);

            // Expired lease can be taken over.
            let after_expiry = later + Duration::seconds(1);
            assert!(try_acquire_lock(conn, "c", after_expiry, after_expiry + Duration::minutes(10))?);
            assert_eq!(lock_holder(conn)?.as_deref(), Some("c"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn renewal_and_guarded_writes_need_the_current_token() {
        let (_dir, db) = init_test_db();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expiry = now + Duration::minutes(10);

        db.with_conn(|conn| {
            assert!(try_acquire_lock(conn, "a", now, expiry)?);
            assert!(renew_lock(conn, "a", expiry + Duration::minutes(10))?);
            assert_eq!(read(conn)?.lock_expires_at, Some(expiry + Duration::minutes(10)));

            // "b" takes over after the renewed lease runs out.
            let late = expiry + Duration::minutes(11);
            assert!(try_acquire_lock(conn, "b", late, late + Duration::minutes(10))?);
            assert!(!renew_lock(conn, "a", late + Duration::hours(1))?);

            let patch = SyncStatePatch {
                total_listings: Some(7),
                ..Default::default()
            };
            assert!(matches!(
                write_as_holder(conn, "a", &patch),
                Err(ServerError::Conflict(_))
            ));
            assert_eq!(read(conn)?.total_listings, 0);

            assert_eq!(write_as_holder(conn, "b", &patch)?.total_listings, 7);
            Ok(())
        })
        .unwrap();
    }
}
