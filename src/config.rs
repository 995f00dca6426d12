// src/config.rs

//! Runtime configuration, read once from the environment at startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ServerError;

pub const DEFAULT_MLS_API_URL: &str = "https://api.mlsgrid.com/v2/Property";

/// Knobs for one sync invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// `$top` requested from the feed.
    pub page_size: usize,
    /// Records processed per invocation before yielding back to the scheduler.
    pub max_records: usize,
    /// Records per upsert transaction.
    pub chunk_size: usize,
    /// Pause between successive page fetches.
    pub page_delay: Duration,
    /// How long an invocation may hold the sync lease.
    pub lock_ttl: Duration,
    /// Lower bound used by the very first incremental sync.
    pub initial_lookback: Duration,
    pub originating_system: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_records: 5000,
            chunk_size: 100,
            page_delay: Duration::from_millis(500),
            lock_ttl: Duration::from_secs(600),
            initial_lookback: Duration::from_secs(24 * 60 * 60),
            originating_system: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_addr: String,
    pub mls_api_url: String,
    pub mls_access_token: Option<String>,
    pub cron_secret: Option<String>,
    pub site_url: String,
    pub brevo_api_key: Option<String>,
    pub alert_sender_email: String,
    pub alert_sender_name: String,
    pub sync: SyncSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "mls_sync.sqlite3".into(),
            bind_addr: "127.0.0.1:3000".into(),
            mls_api_url: DEFAULT_MLS_API_URL.into(),
            mls_access_token: None,
            cron_secret: None,
            site_url: "http://127.0.0.1:3000".into(),
            brevo_api_key: None,
            alert_sender_email: "alerts@example.com".into(),
            alert_sender_name: "Listing Alerts".into(),
            sync: SyncSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sync_defaults = defaults.sync;
        let sync = SyncSettings {
            page_size: parse_or(&get, "SYNC_PAGE_SIZE", sync_defaults.page_size)?,
            max_records: parse_or(&get, "SYNC_MAX_RECORDS", sync_defaults.max_records)?,
            chunk_size: parse_or(&get, "SYNC_CHUNK_SIZE", sync_defaults.chunk_size)?,
            page_delay: Duration::from_millis(parse_or(
                &get,
                "SYNC_PAGE_DELAY_MS",
                sync_defaults.page_delay.as_millis() as u64,
            )?),
            lock_ttl: Duration::from_secs(parse_or(
                &get,
                "SYNC_LOCK_TTL_SECS",
                sync_defaults.lock_ttl.as_secs(),
            )?),
            initial_lookback: sync_defaults.initial_lookback,
            originating_system: get("MLS_ORIGINATING_SYSTEM"),
        };

        if sync.page_size == 0 || sync.chunk_size == 0 || sync.max_records == 0 {
            return Err(ServerError::Config(
                "SYNC_PAGE_SIZE, SYNC_CHUNK_SIZE and SYNC_MAX_RECORDS must be positive".into(),
            ));
        }

        Ok(Self {
            database_path: get("DATABASE_PATH").unwrap_or(defaults.database_path),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            mls_api_url: get("MLS_API_URL").unwrap_or(defaults.mls_api_url),
            mls_access_token: get("MLS_ACCESS_TOKEN"),
            cron_secret: get("CRON_SECRET"),
            site_url: get("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            brevo_api_key: get("BREVO_API_KEY"),
            alert_sender_email: get("ALERT_SENDER_EMAIL").unwrap_or(defaults.alert_sender_email),
            alert_sender_name: get("ALERT_SENDER_NAME").unwrap_or(defaults.alert_sender_name),
            sync,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ServerError::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
