//! Pure merge rules for pulled server rows
//!
//! Pending local work always wins over a pull: a row flagged `LocalEdited`
//! or `LocalDeleted` is neither overwritten nor removed until its own push
//! has decided its fate.

use std::collections::HashSet;

use crate::models::SyncStatus;

/// What to do with one row returned by a server listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// No local row with this remote id: insert as `UpToDate`
    Insert,
    /// Clean local row: overwrite fields from the server copy
    Overwrite,
    /// Local row has pending work: leave it for the push to decide
    Skip,
}

/// Classify a remote row against the matching local row, if any
pub fn classify_remote_row(local: Option<SyncStatus>) -> MergeAction {
    match local {
        None => MergeAction::Insert,
        Some(status) if status.pull_may_overwrite() => MergeAction::Overwrite,
        Some(_) => MergeAction::Skip,
    }
}

/// Tombstone-by-omission: local ids to purge after a fresh listing.
///
/// A previously known row (remote id assigned) that is absent from the
/// listing was deleted remotely; it is purged only while clean. Rows the
/// server never saw (`remote_id` none) are local creations and never
/// eligible.
pub fn omission_purges<I>(known: I, listed: &HashSet<i64>) -> Vec<i64>
where
    I: IntoIterator<Item = (i64, Option<i64>, SyncStatus)>,
{
    known
        .into_iter()
        .filter(|(_, remote_id, status)| {
            remote_id.is_some_and(|id| !listed.contains(&id))
                && *status == SyncStatus::UpToDate
        })
        .map(|(local_id, _, _)| local_id)
        .collect()
}
