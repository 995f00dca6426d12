use crate::alerts::{AlertTrigger, BrevoMailer, HttpAlertTrigger, Mailer};
use crate::config::Config;
use crate::db::Database;
use crate::errors::ServerError;
use crate::mls::{ListingFeed, MlsClient};

/// Shared by every request handler.
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub feed: Box<dyn ListingFeed>,
    pub alerts: Box<dyn AlertTrigger>,
    /// `None` when no mail provider key is configured.
    pub mailer: Option<Box<dyn Mailer>>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, ServerError> {
        let feed = MlsClient::from_config(&config)?;
        if config.mls_access_token.is_none() {
            log::warn!("MLS_ACCESS_TOKEN not set; sync requests will fail until it is");
        }

        let alerts = HttpAlertTrigger::new(&config.site_url, config.cron_secret.clone());

        let mailer: Option<Box<dyn Mailer>> = config.brevo_api_key.clone().map(|key| {
            Box::new(BrevoMailer::new(
                key,
                config.alert_sender_email.clone(),
                config.alert_sender_name.clone(),
            )) as Box<dyn Mailer>
        });
        if mailer.is_none() {
            log::warn!("BREVO_API_KEY not set; alert e-mails are disabled");
        }

        Ok(Self {
            db: Database::new(config.database_path.clone()),
            config,
            feed: Box::new(feed),
            alerts: Box::new(alerts),
            mailer,
        })
    }
}
