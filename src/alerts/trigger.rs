// src/alerts/trigger.rs
use reqwest::blocking::Client;
use std::thread::JoinHandle;
use std::time::Duration;

/// Kick off alert delivery once a sync has landed new data.
///
/// Implementations must not block the caller and must not report failure:
/// whether e-mails went out has no bearing on the sync result.
pub trait AlertTrigger: Send + Sync {
    fn trigger(&self);
}

/// Calls the alert endpoint over HTTP on a detached thread.
pub struct HttpAlertTrigger {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl HttpAlertTrigger {
    pub fn new(site_url: &str, secret: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client for alerts: {e}");
                Client::new()
            });

        Self {
            client,
            url: format!("{}/api/send-alerts", site_url.trim_end_matches('/')),
            secret,
        }
    }
}

impl HttpAlertTrigger {
    /// Start the request on its own thread. `None` when no secret is set.
    fn spawn_request(&self) -> Option<JoinHandle<()>> {
        let Some(secret) = self.secret.clone() else {
            log::warn!("CRON_SECRET not set, skipping alert trigger");
            return None;
        };
        let client = self.client.clone();
        let url = self.url.clone();

        Some(std::thread::spawn(move || {
            match client.get(&url).bearer_auth(secret).send() {
                Ok(resp) if resp.status().is_success() => {
                    log::info!("📧 Alert run triggered ({})", resp.status());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().unwrap_or_default();
                    log::warn!("Alert trigger returned {status}: {body}");
                }
                Err(e) => log::warn!("Alert trigger failed: {e}"),
            }
        }))
    }
}

impl AlertTrigger for HttpAlertTrigger {
    fn trigger(&self) {
        // Detached: the handle is dropped without joining.
        let _ = self.spawn_request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_lives_under_the_site_url() {
        let trigger = HttpAlertTrigger::new("https://homes.example.com/", None);
        assert_eq!(trigger.url, "https://homes.example.com/api/send-alerts");
    }

    #[test]
    fn unreachable_endpoint_is_logged_not_raised() {
        let trigger = HttpAlertTrigger::new("http://127.0.0.1:9", Some("s3cret".into()));

        let handle = trigger.spawn_request().expect("request thread");
        assert!(handle.join().is_ok());

        trigger.trigger();
    }

    #[test]
    fn no_secret_sends_nothing() {
        let trigger = HttpAlertTrigger::new("http://127.0.0.1:9", None);
        assert!(trigger.spawn_request().is_none());
        trigger.trigger();
    }
}
