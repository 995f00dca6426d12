// src/sync/upsert.rs

//! Commits one page of transformed listings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::db::listings::{delete_by_keys, upsert_listings};
use crate::db::Database;
use crate::domain::listing::ListingRecord;
use crate::errors::ServerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub upserted: usize,
    /// Records the feed marked as no longer viewable.
    pub deleted: usize,
}

impl BatchOutcome {
    pub fn add(&mut self, other: BatchOutcome) {
        self.upserted += other.upserted;
        self.deleted += other.deleted;
    }
}

/// Keep only the last occurrence of each key. Pages are ordered by
/// modification time, so the last one is the newest.
fn latest_per_key(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut last_index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        last_index.insert(r.listing_key.clone(), i);
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(i, r)| last_index.get(&r.listing_key) == Some(i))
        .map(|(_, r)| r)
        .collect()
}

/// Split into deletes and upserts, delete in one statement, then upsert in
/// transactions of `chunk_size`. A failing chunk aborts with an error; chunks
/// already committed stay committed.
pub fn apply_batch(
    db: &Database,
    records: Vec<ListingRecord>,
    chunk_size: usize,
    generation: i64,
    now: DateTime<Utc>,
) -> Result<BatchOutcome, ServerError> {
    let (to_upsert, to_delete): (Vec<ListingRecord>, Vec<ListingRecord>) = latest_per_key(records)
        .into_iter()
        .partition(|r| r.mlg_can_view);

    let delete_keys: Vec<String> = to_delete.into_iter().map(|r| r.listing_key).collect();
    if !delete_keys.is_empty() {
        let removed = db.with_conn(|conn| delete_by_keys(conn, &delete_keys))?;
        log::debug!(
            "🗑️ {} listings marked not viewable, {removed} were stored",
            delete_keys.len()
        );
    }

    let mut upserted = 0;
    for chunk in to_upsert.chunks(chunk_size.max(1)) {
        upserted += db.with_conn(|conn| upsert_listings(conn, chunk, generation, now))?;
    }

    Ok(BatchOutcome {
        upserted,
        deleted: delete_keys.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::listings::count_listings;
    use crate::tests::utils::init_test_db;

    fn record(key: &str, visible: bool) -> ListingRecord {
        ListingRecord {
            listing_key: key.to_string(),
            mlg_can_view: visible,
            ..Default::default()
        }
    }

    #[test]
    fn partitions_visible_and_hidden_records() {
        let (_dir, db) = init_test_db();
        let now = Utc::now();

        apply_batch(&db, vec![record("GONE", true)], 10, 0, now).unwrap();

        let outcome = apply_batch(
            &db,
            vec![record("A", true), record("B", true), record("GONE", false)],
            10,
            0,
            now,
        )
        .unwrap();

        assert_eq!(outcome, BatchOutcome { upserted: 2, deleted: 1 });
        let remaining = db.with_conn(|conn| count_listings(conn)).unwrap();
        assert_eq!(remaining, 2);
    }

    #[test]
    fn chunks_cover_every_record() {
        let (_dir, db) = init_test_db();
        let records: Vec<ListingRecord> = (0..25).map(|i| record(&format!("K{i}"), true)).collect();

        let outcome = apply_batch(&db, records, 7, 0, Utc::now()).unwrap();

        assert_eq!(outcome.upserted, 25);
        assert_eq!(db.with_conn(|conn| count_listings(conn)).unwrap(), 25);
    }

    #[test]
    fn newest_duplicate_in_a_page_wins() {
        let (_dir, db) = init_test_db();
        let outcome = apply_batch(
            &db,
            vec![record("DUP", true), record("DUP", false)],
            10,
            0,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(outcome, BatchOutcome { upserted: 0, deleted: 1 });
        assert_eq!(db.with_conn(|conn| count_listings(conn)).unwrap(), 0);
    }
}
