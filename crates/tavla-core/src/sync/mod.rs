//! Synchronization engine

mod engine;
mod merge;

pub use engine::{SyncEngine, SyncSummary};
pub use merge::{classify_remote_row, omission_purges, MergeAction};
