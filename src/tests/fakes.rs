//! In-memory stand-ins for the feed, the alert hook and the mail provider.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::alerts::{AlertTrigger, Mailer, MailerError, OutgoingEmail};
use crate::domain::transform::parse_timestamp;
use crate::mls::{FeedPage, FeedQuery, ListingFeed, MlsError, MlsProperty};

/// A property as the feed would send it.
pub fn property(key: &str, modified: DateTime<Utc>, visible: bool) -> MlsProperty {
    MlsProperty {
        listing_key: Some(key.to_string()),
        listing_id: Some(format!("MLS-{key}")),
        mlg_can_view: Some(visible),
        modification_timestamp: Some(modified.to_rfc3339()),
        standard_status: Some("Active".into()),
        city: Some("Austin".into()),
        street_number: Some("100".into()),
        street_name: Some("Main St".into()),
        list_price: Some(450_000.0),
        bedrooms_total: Some(3.0),
        ..Default::default()
    }
}

#[derive(Default)]
struct FeedLog {
    queries: Vec<FeedQuery>,
    /// Records matching the last `first_page` query, in feed order.
    matched: Vec<MlsProperty>,
    page_size: usize,
}

/// Serves `records` the way the real feed does: filtered by the query,
/// ordered by modification time and split into `$top`-sized pages.
#[derive(Clone, Default)]
pub struct FakeFeed {
    records: Arc<Mutex<Vec<MlsProperty>>>,
    log: Arc<Mutex<FeedLog>>,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    missing_token: bool,
}

impl FakeFeed {
    pub fn with_records(records: Vec<MlsProperty>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Default::default()
        }
    }

    pub fn without_token() -> Self {
        Self {
            missing_token: true,
            ..Default::default()
        }
    }

    pub fn set_records(&self, records: Vec<MlsProperty>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.log.lock().unwrap().queries.clone()
    }

    fn page(&self, offset: usize) -> Result<FeedPage, MlsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MlsError::Http {
                status: 503,
                body: "upstream unavailable".into(),
            });
        }

        let log = self.log.lock().unwrap();
        let end = (offset + log.page_size).min(log.matched.len());
        let records = log.matched[offset.min(end)..end].to_vec();
        let next_link = (end < log.matched.len()).then(|| format!("fake://page/{end}"));

        Ok(FeedPage { records, next_link })
    }
}

fn modified(prop: &MlsProperty) -> Option<DateTime<Utc>> {
    parse_timestamp(prop.modification_timestamp.as_deref())
}

impl ListingFeed for FakeFeed {
    fn ensure_configured(&self) -> Result<(), MlsError> {
        if self.missing_token {
            Err(MlsError::MissingToken)
        } else {
            Ok(())
        }
    }

    fn first_page(&self, query: &FeedQuery) -> Result<FeedPage, MlsError> {
        let mut matched: Vec<MlsProperty> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !query.visible_only || p.mlg_can_view == Some(true))
            .filter(|p| match query.modified_after {
                Some(after) => modified(p).is_some_and(|m| m > after),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by_key(modified);

        {
            let mut log = self.log.lock().unwrap();
            log.queries.push(query.clone());
            log.matched = matched;
            log.page_size = query.page_size.max(1);
        }
        self.page(0)
    }

    fn next_page(&self, next_link: &str) -> Result<FeedPage, MlsError> {
        let offset = next_link
            .strip_prefix("fake://page/")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| MlsError::InvalidUrl(next_link.to_string()))?;
        self.page(offset)
    }
}

#[derive(Clone, Default)]
pub struct RecordingTrigger {
    fired: Arc<AtomicUsize>,
}

impl RecordingTrigger {
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl AlertTrigger for RecordingTrigger {
    fn trigger(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps every e-mail instead of sending it. Addresses listed in
/// `failing` are rejected.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl RecordingMailer {
    pub fn reject(&self, address: &str) {
        self.failing.lock().unwrap().push(address.to_string());
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        if self.failing.lock().unwrap().contains(&email.to_email) {
            return Err(MailerError::ApiError(format!("rejected {}", email.to_email)));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
