pub mod secret;

pub use secret::authorize_cron;
