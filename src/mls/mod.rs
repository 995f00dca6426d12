pub mod client;
pub mod models;
mod mls_error;

pub use client::{FeedQuery, ListingFeed, MlsClient};
pub use models::{FeedPage, MlsMedia, MlsProperty};
pub use mls_error::MlsError;
