//! Card model

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// A task card within a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Local primary key
    pub local_id: i64,
    /// Server-side identifier; `None` until created remotely
    pub id: Option<i64>,
    /// Owning account
    pub account_id: i64,
    /// Owning stack (local key)
    pub stack_local_id: i64,
    /// Card title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Due date (epoch ms)
    pub due_date: Option<i64>,
    /// Position within the stack, ascending
    pub sort_order: i64,
    /// Timestamp of the last local mutation (epoch ms)
    pub last_modified_local: i64,
    /// Sync lifecycle state
    pub status: SyncStatus,
}

impl Card {
    /// Build a card created locally, not yet known to the server
    pub fn new_local(
        account_id: i64,
        stack_local_id: i64,
        title: impl Into<String>,
        sort_order: i64,
    ) -> Self {
        Self {
            local_id: 0,
            id: None,
            account_id,
            stack_local_id,
            title: title.into(),
            description: String::new(),
            due_date: None,
            sort_order,
            last_modified_local: chrono::Utc::now().timestamp_millis(),
            status: SyncStatus::LocalEdited,
        }
    }
}
