pub mod listing_alert;

pub use listing_alert::{listing_alert_email, listing_alert_subject};
