pub mod listing;
pub mod saved_search;
pub mod transform;
