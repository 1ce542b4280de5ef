//! User model

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// A server user known to an account, assignable to cards.
///
/// The server addresses users by `uid`; there is no separate numeric remote
/// id for users, so identity is `(account_id, uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Local primary key
    pub local_id: i64,
    /// Owning account
    pub account_id: i64,
    /// Server-side user identifier
    pub uid: String,
    /// Human-readable name
    pub display_name: String,
    /// Timestamp of the last local mutation (epoch ms)
    pub last_modified_local: i64,
    /// Sync lifecycle state
    pub status: SyncStatus,
}
