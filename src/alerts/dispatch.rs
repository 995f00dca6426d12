// src/alerts/dispatch.rs

//! E-mails saved-search owners about listings that appeared since their last alert.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerts::mailer::{Mailer, OutgoingEmail};
use crate::db::listings::find_new_matching;
use crate::db::saved_searches::{alert_audience, mark_alerted};
use crate::db::Database;
use crate::errors::ServerError;
use crate::templates::emails::{listing_alert_email, listing_alert_subject};

pub const MAX_LISTINGS_PER_EMAIL: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRunReport {
    pub success: bool,
    pub searches_checked: usize,
    pub skipped_not_due: usize,
    pub emails_sent: usize,
    pub failures: usize,
}

/// One pass over every alert-enabled saved search. A failed send is counted
/// and logged; the search is retried on the next pass because its
/// `last_alerted_at` is only stamped after a successful send.
pub fn send_due_alerts(
    db: &Database,
    mailer: &dyn Mailer,
    site_url: &str,
    now: DateTime<Utc>,
) -> Result<AlertRunReport, ServerError> {
    let searches = db.with_conn(|conn| alert_audience(conn))?;
    let mut report = AlertRunReport {
        success: true,
        ..Default::default()
    };

    for search in searches {
        if !search.frequency.is_due(search.last_alerted_at, now) {
            log::debug!(
                "Saved search {} ({}) not due yet",
                search.id,
                search.frequency.as_str()
            );
            report.skipped_not_due += 1;
            continue;
        }
        report.searches_checked += 1;

        let listings = db.with_conn(|conn| {
            find_new_matching(conn, &search.criteria, search.new_since(), MAX_LISTINGS_PER_EMAIL)
        })?;
        if listings.is_empty() {
            continue;
        }

        let email = OutgoingEmail {
            to_email: search.user_email.clone(),
            to_name: search.user_name.clone(),
            subject: listing_alert_subject(&search.name, listings.len()),
            html: listing_alert_email(search.user_name.as_deref(), &search.name, &listings, site_url)
                .into_string(),
        };

        match mailer.send(&email) {
            Ok(()) => {
                db.with_conn(|conn| mark_alerted(conn, search.id, now))?;
                report.emails_sent += 1;
                log::info!(
                    "📧 Sent {} listings to user {} for search {}",
                    listings.len(),
                    search.user_id,
                    search.id
                );
            }
            Err(e) => {
                report.failures += 1;
                log::warn!("Alert for saved search {} failed: {e}", search.id);
            }
        }
    }

    Ok(report)
}
