pub mod connection;
pub mod listings;
pub mod saved_searches;
pub mod sync_state;

pub use connection::{init_db, Database};
