//! tavla-core - Core library for Tavla
//!
//! This crate contains the shared models, local store, remote gateway, and
//! offline-first sync engine used by all Tavla interfaces.

pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod observe;
pub mod remote;
pub mod services;
pub mod sync;

pub use connectivity::{Connectivity, NetworkStatus};
pub use error::{Error, Result};
pub use models::{Account, Board, Card, Label, Stack, SyncStatus, User};
pub use services::StoreService;
pub use sync::{SyncEngine, SyncSummary};
