pub mod components;
pub mod emails;
pub mod layouts;

// Re-exports for convenience
pub use components::listing_card;
pub use emails::listing_alert_email;
pub use layouts::email::email_layout;
