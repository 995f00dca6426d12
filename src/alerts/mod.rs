pub mod dispatch;
pub mod mailer;
pub mod trigger;

pub use dispatch::{send_due_alerts, AlertRunReport};
pub use mailer::{BrevoMailer, Mailer, MailerError, OutgoingEmail};
pub use trigger::{AlertTrigger, HttpAlertTrigger};
