//! Per-row sync lifecycle state

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle state of a locally cached row with respect to the server.
///
/// Stored as an explicit integer code; queries bind `as_i64()` instead of
/// comparing against literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Row matches the last state pulled from or acknowledged by the server
    UpToDate,
    /// Row has local field changes awaiting a push (create or update)
    LocalEdited,
    /// Row is tombstoned locally and awaits a delete push before purge
    LocalDeleted,
}

impl SyncStatus {
    /// Integer code used in the database
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::UpToDate => 0,
            Self::LocalEdited => 1,
            Self::LocalDeleted => 2,
        }
    }

    /// Decode a stored integer code
    pub fn from_i64(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::UpToDate),
            1 => Ok(Self::LocalEdited),
            2 => Ok(Self::LocalDeleted),
            other => Err(Error::Database(format!("unknown sync status code {other}"))),
        }
    }

    /// Whether a pull may overwrite this row's fields.
    ///
    /// Pending local work always wins over a pull; only clean rows are
    /// overwritten or removed by merge.
    pub const fn pull_may_overwrite(self) -> bool {
        matches!(self, Self::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            SyncStatus::UpToDate,
            SyncStatus::LocalEdited,
            SyncStatus::LocalDeleted,
        ] {
            assert_eq!(SyncStatus::from_i64(status.as_i64()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(SyncStatus::from_i64(3).is_err());
        assert!(SyncStatus::from_i64(-1).is_err());
    }

    #[test]
    fn only_clean_rows_are_overwritable() {
        assert!(SyncStatus::UpToDate.pull_may_overwrite());
        assert!(!SyncStatus::LocalEdited.pull_may_overwrite());
        assert!(!SyncStatus::LocalDeleted.pull_may_overwrite());
    }
}
