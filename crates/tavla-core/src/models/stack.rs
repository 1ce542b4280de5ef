//! Stack model

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// An ordered column of cards within a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    /// Local primary key
    pub local_id: i64,
    /// Server-side identifier; `None` until created remotely
    pub id: Option<i64>,
    /// Owning account
    pub account_id: i64,
    /// Owning board (local key)
    pub board_local_id: i64,
    /// Stack title
    pub title: String,
    /// Position within the board, ascending
    pub sort_order: i64,
    /// Timestamp of the last local mutation (epoch ms)
    pub last_modified_local: i64,
    /// Sync lifecycle state
    pub status: SyncStatus,
}

impl Stack {
    /// Build a stack created locally, not yet known to the server
    pub fn new_local(
        account_id: i64,
        board_local_id: i64,
        title: impl Into<String>,
        sort_order: i64,
    ) -> Self {
        Self {
            local_id: 0,
            id: None,
            account_id,
            board_local_id,
            title: title.into(),
            sort_order,
            last_modified_local: chrono::Utc::now().timestamp_millis(),
            status: SyncStatus::LocalEdited,
        }
    }
}
