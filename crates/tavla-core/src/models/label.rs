//! Label model

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// A colored label scoped to a board, attachable to cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Local primary key
    pub local_id: i64,
    /// Server-side identifier; `None` until created remotely
    pub id: Option<i64>,
    /// Owning account
    pub account_id: i64,
    /// Owning board (local key)
    pub board_local_id: i64,
    /// Label title
    pub title: String,
    /// Label color as a hex string
    pub color: String,
    /// Timestamp of the last local mutation (epoch ms)
    pub last_modified_local: i64,
    /// Sync lifecycle state
    pub status: SyncStatus,
}

impl Label {
    /// Build a label created locally, not yet known to the server
    pub fn new_local(
        account_id: i64,
        board_local_id: i64,
        title: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            local_id: 0,
            id: None,
            account_id,
            board_local_id,
            title: title.into(),
            color: color.into(),
            last_modified_local: chrono::Utc::now().timestamp_millis(),
            status: SyncStatus::LocalEdited,
        }
    }
}
