//! Relation rows for the card many-to-many associations
//!
//! A join row has no identity beyond its pair of local foreign keys; its
//! existence means the relation holds. The `status` column is the explicit
//! pending-change marker for relation pushes: `LocalEdited` is a pending
//! assign, `LocalDeleted` a pending unassign, `UpToDate` a synced relation.

use serde::{Deserialize, Serialize};

use super::SyncStatus;

/// Assignment of a user to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUserAssignment {
    /// Card side of the relation (local key)
    pub card_local_id: i64,
    /// User side of the relation (local key)
    pub user_local_id: i64,
    /// Pending-change marker
    pub status: SyncStatus,
}

/// Attachment of a label to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLabelAssignment {
    /// Card side of the relation (local key)
    pub card_local_id: i64,
    /// Label side of the relation (local key)
    pub label_local_id: i64,
    /// Pending-change marker
    pub status: SyncStatus,
}
