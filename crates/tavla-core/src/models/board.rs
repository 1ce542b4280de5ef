//! Board model

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// A kanban board owned by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Local primary key, stable for the row's local lifetime
    pub local_id: i64,
    /// Server-side identifier; `None` until the board has been created remotely
    pub id: Option<i64>,
    /// Owning account
    pub account_id: i64,
    /// Board title
    pub title: String,
    /// Board color as a hex string, e.g. `0082c9`
    pub color: String,
    /// Timestamp of the last local mutation (epoch ms)
    pub last_modified_local: i64,
    /// Sync lifecycle state
    pub status: SyncStatus,
}

impl Board {
    /// Build a board created locally, not yet known to the server
    pub fn new_local(account_id: i64, title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            local_id: 0,
            id: None,
            account_id,
            title: title.into(),
            color: color.into(),
            last_modified_local: chrono::Utc::now().timestamp_millis(),
            status: SyncStatus::LocalEdited,
        }
    }
}
