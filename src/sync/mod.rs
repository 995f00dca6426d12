pub mod orchestrator;
pub mod upsert;

pub use orchestrator::{run_sync, FullSyncStatus, SyncContext, SyncMode, SyncOptions, SyncReport};
pub use upsert::{apply_batch, BatchOutcome};
