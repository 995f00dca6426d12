// src/sync/orchestrator.rs

//! Drives one sync invocation: pick a mode, page through the feed under a
//! record budget, commit each page, persist the resulting cursor/watermark.
//!
//! Invocation states:
//!
//! ```text
//!  incremental ──────────────► loop ──► Incremental (watermark saved, alerts fired)
//!
//!  full ─┬─ not in progress ──► FullStarting ─┐
//!        └─ in progress ──────────────────────┴─► loop ─┬─ budget hit, nextLink left ──► FullInProgress (cursor saved)
//!                                                       └─ feed exhausted ─────────────► FullComplete (sweep, alerts fired)
//! ```
//!
//! The watermark is always the largest `ModificationTimestamp` seen, never the
//! wall clock, so a long run cannot skip records modified while it was running.
//!
//! The lease is renewed after every page. Once another invocation has taken
//! it over, this one stops with `Conflict` and writes no sync state.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::alerts::trigger::AlertTrigger;
use crate::auth::secret::new_lock_token;
use crate::config::SyncSettings;
use crate::db::listings::{count_listings, delete_unseen, mark_seen_at};
use crate::db::sync_state::{self, SyncState, SyncStatePatch};
use crate::db::Database;
use crate::domain::listing::ListingRecord;
use crate::domain::transform::{parse_timestamp, transform_property};
use crate::errors::ServerError;
use crate::mls::{FeedQuery, ListingFeed};
use crate::sync::upsert::{apply_batch, BatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Incremental,
    Full,
}

impl SyncMode {
    /// `None` means the default, incremental.
    pub fn parse(raw: Option<&str>) -> Result<Self, ServerError> {
        match raw.map(str::trim) {
            None | Some("") | Some("incremental") => Ok(SyncMode::Incremental),
            Some("full") => Ok(SyncMode::Full),
            Some(other) => Err(ServerError::BadRequest(format!(
                "unknown sync mode {other:?}, expected incremental or full"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Incremental,
    FullStarting,
    FullInProgress,
    FullComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FullSyncStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Drop any stale full-sync cursor before starting. Full mode only.
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub mode: SyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FullSyncStatus>,
    pub processed: usize,
    pub upserted: usize,
    pub deleted: usize,
    pub total_listings: i64,
    pub has_more_data: bool,
    pub cursor: Option<DateTime<Utc>>,
    pub watermark: Option<DateTime<Utc>>,
    pub pages: usize,
    pub alerts_triggered: bool,
    #[serde(skip)]
    pub phase: Option<SyncPhase>,
}

/// Everything an invocation needs, borrowed from the app state.
pub struct SyncContext<'a> {
    pub db: &'a Database,
    pub feed: &'a dyn ListingFeed,
    pub alerts: &'a dyn AlertTrigger,
    pub settings: &'a SyncSettings,
}

/// The lease this invocation holds on the sync-state row.
struct Lease<'a> {
    token: &'a str,
    ttl: Duration,
}

impl Lease<'_> {
    /// Push the expiry out, or fail with `Conflict` once another invocation
    /// has taken the lease over.
    fn renew(&self, db: &Database) -> Result<(), ServerError> {
        let expires_at = Utc::now() + self.ttl;
        if db.with_conn(|conn| sync_state::renew_lock(conn, self.token, expires_at))? {
            Ok(())
        } else {
            log::warn!("⏳ Sync lease lost mid-run, stopping");
            Err(ServerError::Conflict(
                "sync lease was taken over by another invocation".into(),
            ))
        }
    }
}

#[derive(Debug, Default)]
struct Drained {
    outcome: BatchOutcome,
    processed: usize,
    pages: usize,
    watermark: Option<DateTime<Utc>>,
    has_more: bool,
}

/// Run one invocation under the sync lease. Nothing is persisted to the sync
/// state unless the whole invocation succeeds.
pub fn run_sync(
    ctx: &SyncContext<'_>,
    options: SyncOptions,
    now: DateTime<Utc>,
) -> Result<SyncReport, ServerError> {
    ctx.feed.ensure_configured()?;

    let token = new_lock_token();
    let ttl = Duration::from_std(ctx.settings.lock_ttl).unwrap_or_else(|_| Duration::minutes(10));
    let acquired = ctx
        .db
        .with_conn(|conn| sync_state::try_acquire_lock(conn, &token, now, now + ttl))?;
    if !acquired {
        log::warn!("⏳ Sync requested while another invocation holds the lease");
        return Err(ServerError::Conflict("another sync is already running".into()));
    }

    let started = Instant::now();
    let lease = Lease { token: &token, ttl };
    let result = run_locked(ctx, &lease, options, now);

    if let Err(e) = ctx.db.with_conn(|conn| sync_state::release_lock(conn, &token)) {
        log::error!("Failed to release sync lease: {e}");
    }

    match &result {
        Ok(report) => log::info!(
            "✅ {:?} sync finished in {:?}: processed={} upserted={} deleted={} more={}",
            report.phase.unwrap_or(SyncPhase::Incremental),
            started.elapsed(),
            report.processed,
            report.upserted,
            report.deleted,
            report.has_more_data
        ),
        Err(e) => log::error!("❌ {:?} sync failed after {:?}: {e}", options.mode, started.elapsed()),
    }

    result
}

fn run_locked(
    ctx: &SyncContext<'_>,
    lease: &Lease<'_>,
    options: SyncOptions,
    now: DateTime<Utc>,
) -> Result<SyncReport, ServerError> {
    let state = ctx.db.with_conn(|conn| sync_state::read(conn))?;

    match options.mode {
        SyncMode::Incremental => run_incremental(ctx, lease, state, now),
        SyncMode::Full => run_full(ctx, lease, state, options.reset, now),
    }
}

fn run_incremental(
    ctx: &SyncContext<'_>,
    lease: &Lease<'_>,
    state: SyncState,
    now: DateTime<Utc>,
) -> Result<SyncReport, ServerError> {
    let lookback =
        Duration::from_std(ctx.settings.initial_lookback).unwrap_or_else(|_| Duration::days(1));
    let lower_bound = state.last_sync_timestamp.unwrap_or(now - lookback);

    log::info!("🔄 Incremental sync from {lower_bound}");

    // No MlgCanView filter: hidden records must arrive so they can be deleted.
    let query = FeedQuery {
        originating_system: ctx.settings.originating_system.clone(),
        visible_only: false,
        modified_after: Some(lower_bound),
        page_size: ctx.settings.page_size,
    };
    let drained = drain_feed(ctx, lease, &query, state.full_sync_generation, now)?;

    let watermark = latest(state.last_sync_timestamp, drained.watermark);
    let total = ctx.db.with_conn(|conn| count_listings(conn))?;

    ctx.db.with_conn(|conn| {
        sync_state::write_as_holder(
            conn,
            lease.token,
            &SyncStatePatch {
                last_sync_timestamp: Some(watermark),
                last_run_at: Some(Some(now)),
                total_listings: Some(total),
                ..Default::default()
            },
        )
    })?;

    ctx.alerts.trigger();

    Ok(SyncReport {
        success: true,
        mode: SyncMode::Incremental,
        status: None,
        processed: drained.processed,
        upserted: drained.outcome.upserted,
        deleted: drained.outcome.deleted,
        total_listings: total,
        has_more_data: drained.has_more,
        cursor: None,
        watermark,
        pages: drained.pages,
        alerts_triggered: true,
        phase: Some(SyncPhase::Incremental),
    })
}

fn run_full(
    ctx: &SyncContext<'_>,
    lease: &Lease<'_>,
    mut state: SyncState,
    reset: bool,
    now: DateTime<Utc>,
) -> Result<SyncReport, ServerError> {
    let mut patch = SyncStatePatch::default();

    if reset {
        log::info!("♻️ Full sync reset requested, dropping cursor {:?}", state.full_sync_cursor);
        state.full_sync_in_progress = false;
        state.full_sync_cursor = None;
    }

    let phase = if state.full_sync_in_progress {
        SyncPhase::FullInProgress
    } else {
        state.full_sync_in_progress = true;
        state.full_sync_cursor = None;
        state.full_sync_generation += 1;
        state.full_sync_started_at = Some(now);
        patch.full_sync_generation = Some(state.full_sync_generation);
        patch.full_sync_started_at = Some(Some(now));
        SyncPhase::FullStarting
    };

    let resume_from = state.full_sync_cursor;
    log::info!(
        "🔄 Full sync ({phase:?}) generation {} from {}",
        state.full_sync_generation,
        resume_from.map_or_else(|| "the beginning".to_string(), |c| c.to_string())
    );

    if let (SyncPhase::FullInProgress, Some(cursor)) = (phase, resume_from) {
        let generation = state.full_sync_generation;
        let kept = ctx.db.with_conn(|conn| mark_seen_at(conn, generation, cursor))?;
        log::debug!("Carried {kept} listings at cursor {cursor} into generation {generation}");
    }

    let query = FeedQuery {
        originating_system: ctx.settings.originating_system.clone(),
        visible_only: true,
        modified_after: resume_from,
        page_size: ctx.settings.page_size,
    };
    let drained = drain_feed(ctx, lease, &query, state.full_sync_generation, now)?;
    let cursor = latest(resume_from, drained.watermark);

    let mut deleted = drained.outcome.deleted;
    let status;
    let phase_out;

    patch.last_run_at = Some(Some(now));

    if drained.has_more {
        phase_out = SyncPhase::FullInProgress;
        status = FullSyncStatus::InProgress;
        patch.full_sync_in_progress = Some(true);
        patch.full_sync_cursor = Some(cursor);
    } else {
        phase_out = SyncPhase::FullComplete;
        status = FullSyncStatus::Complete;

        lease.renew(ctx.db)?;
        let generation = state.full_sync_generation;
        let swept = ctx.db.with_conn(|conn| delete_unseen(conn, generation))?;
        if swept > 0 {
            log::info!("🧹 Removed {swept} listings the feed no longer returns");
        }
        deleted += swept;

        patch.full_sync_in_progress = Some(false);
        patch.full_sync_cursor = Some(None);
        patch.last_sync_timestamp = Some(latest(state.last_sync_timestamp, cursor));
        patch.last_full_sync_at = Some(Some(now));
    }

    let total = ctx.db.with_conn(|conn| count_listings(conn))?;
    patch.total_listings = Some(total);
    let saved = ctx
        .db
        .with_conn(|conn| sync_state::write_as_holder(conn, lease.token, &patch))?;

    let alerts_triggered = phase_out == SyncPhase::FullComplete;
    if alerts_triggered {
        ctx.alerts.trigger();
    }

    Ok(SyncReport {
        success: true,
        mode: SyncMode::Full,
        status: Some(status),
        processed: drained.processed,
        upserted: drained.outcome.upserted,
        deleted,
        total_listings: total,
        has_more_data: drained.has_more,
        cursor: if drained.has_more { cursor } else { None },
        watermark: saved.last_sync_timestamp.max(cursor),
        pages: drained.pages,
        alerts_triggered,
        phase: Some(phase_out),
    })
}

/// Fetch, transform and commit pages until the feed runs dry or the record
/// budget is spent.
fn drain_feed(
    ctx: &SyncContext<'_>,
    lease: &Lease<'_>,
    query: &FeedQuery,
    generation: i64,
    now: DateTime<Utc>,
) -> Result<Drained, ServerError> {
    let mut drained = Drained::default();
    let mut page = ctx.feed.first_page(query)?;

    loop {
        drained.pages += 1;
        drained.processed += page.records.len();

        let mut records: Vec<ListingRecord> = Vec::with_capacity(page.records.len());
        for prop in &page.records {
            drained.watermark = latest(
                drained.watermark,
                parse_timestamp(prop.modification_timestamp.as_deref()),
            );
            match transform_property(prop) {
                Some(record) => records.push(record),
                None => log::warn!("Skipping feed record without ListingKey"),
            }
        }

        let outcome = apply_batch(ctx.db, records, ctx.settings.chunk_size, generation, now)?;
        drained.outcome.add(outcome);
        lease.renew(ctx.db)?;

        log::info!(
            "📄 Page {}: {} records (upserted {}, deleted {}), {} so far",
            drained.pages,
            page.records.len(),
            outcome.upserted,
            outcome.deleted,
            drained.processed
        );

        match page.next_link.take() {
            Some(link) if drained.processed < ctx.settings.max_records => {
                if !ctx.settings.page_delay.is_zero() {
                    std::thread::sleep(ctx.settings.page_delay);
                }
                page = ctx.feed.next_page(&link)?;
            }
            Some(_) => {
                log::info!("Record budget of {} reached, pausing", ctx.settings.max_records);
                drained.has_more = true;
                break;
            }
            None => break,
        }
    }

    Ok(drained)
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(SyncMode::parse(None).unwrap(), SyncMode::Incremental);
        assert_eq!(SyncMode::parse(Some("")).unwrap(), SyncMode::Incremental);
        assert_eq!(SyncMode::parse(Some("full")).unwrap(), SyncMode::Full);
        assert!(matches!(
            SyncMode::parse(Some("everything")),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn latest_ignores_missing_values() {
        let t = Utc::now();
        assert_eq!(latest(None, Some(t)), Some(t));
        assert_eq!(latest(Some(t), None), Some(t));
        assert_eq!(latest(None, None), None);
    }

    #[test]
    fn report_serializes_in_camel_case() {
        let report = SyncReport {
            success: true,
            mode: SyncMode::Full,
            status: Some(FullSyncStatus::InProgress),
            processed: 3,
            upserted: 2,
            deleted: 1,
            total_listings: 10,
            has_more_data: true,
            cursor: None,
            watermark: None,
            pages: 1,
            alerts_triggered: false,
            phase: Some(SyncPhase::FullInProgress),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["mode"], "full");
        assert_eq!(json["hasMoreData"], true);
        assert_eq!(json["totalListings"], 10);
        assert!(json.get("phase").is_none());
    }
}
