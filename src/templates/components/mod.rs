pub mod listing_card;

pub use listing_card::{format_price, listing_card};
