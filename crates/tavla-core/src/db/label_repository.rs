//! Label repository

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Label, SyncStatus};

const LABEL_COLUMNS: &str =
    "local_id, id, account_id, board_local_id, title, color, last_modified_local, status";

/// Storage operations for labels
pub struct LabelRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LabelRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a label row and return it with its assigned local id
    pub async fn insert(&self, label: &Label) -> Result<Label> {
        self.conn
            .execute(
                "INSERT INTO labels
                 (id, account_id, board_local_id, title, color, last_modified_local, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    label.id,
                    label.account_id,
                    label.board_local_id,
                    label.title.as_str(),
                    label.color.as_str(),
                    label.last_modified_local,
                    label.status.as_i64()
                ],
            )
            .await?;

        let local_id = self.conn.last_insert_rowid();
        self.get(label.account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("label {local_id}")))
    }

    /// Get a label by `(account_id, local_id)`
    pub async fn get(&self, account_id: i64, local_id: i64) -> Result<Option<Label>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {LABEL_COLUMNS} FROM labels WHERE account_id = ?1 AND local_id = ?2"
                ),
                params![account_id, local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_label(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a label by `(account_id, remote id)`
    pub async fn find_by_remote_id(&self, account_id: i64, id: i64) -> Result<Option<Label>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {LABEL_COLUMNS} FROM labels WHERE account_id = ?1 AND id = ?2"),
                params![account_id, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_label(&row)?)),
            None => Ok(None),
        }
    }

    /// List visible labels of a board, by title
    pub async fn list_for_board(&self, board_local_id: i64) -> Result<Vec<Label>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {LABEL_COLUMNS} FROM labels
                     WHERE board_local_id = ?1 AND status <> ?2
                     ORDER BY title COLLATE NOCASE"
                ),
                params![board_local_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut labels = Vec::new();
        while let Some(row) = rows.next().await? {
            labels.push(Self::parse_label(&row)?);
        }
        Ok(labels)
    }

    /// List every label row of a board, tombstones included (sync scans)
    pub async fn list_all_for_board(&self, board_local_id: i64) -> Result<Vec<Label>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {LABEL_COLUMNS} FROM labels WHERE board_local_id = ?1"),
                params![board_local_id],
            )
            .await?;

        let mut labels = Vec::new();
        while let Some(row) = rows.next().await? {
            labels.push(Self::parse_label(&row)?);
        }
        Ok(labels)
    }

    /// Case-insensitive substring search over a board's labels
    pub async fn search_by_title(
        &self,
        account_id: i64,
        board_local_id: i64,
        term: &str,
    ) -> Result<Vec<Label>> {
        let pattern = format!("%{}%", term.trim());
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {LABEL_COLUMNS} FROM labels
                     WHERE account_id = ?1 AND board_local_id = ?2 AND status <> ?3
                       AND title LIKE ?4
                     ORDER BY title COLLATE NOCASE"
                ),
                params![
                    account_id,
                    board_local_id,
                    SyncStatus::LocalDeleted.as_i64(),
                    pattern
                ],
            )
            .await?;

        let mut labels = Vec::new();
        while let Some(row) = rows.next().await? {
            labels.push(Self::parse_label(&row)?);
        }
        Ok(labels)
    }

    /// Apply a local edit: overwrite user-editable fields and mark dirty
    pub async fn update_content(
        &self,
        local_id: i64,
        title: &str,
        color: &str,
        now: i64,
    ) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE labels
                 SET title = ?1, color = ?2, last_modified_local = ?3, status = ?4
                 WHERE local_id = ?5",
                params![
                    title,
                    color,
                    now,
                    SyncStatus::LocalEdited.as_i64(),
                    local_id
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("label {local_id}")));
        }
        Ok(())
    }

    /// Overwrite fields from a pulled server row and mark the row clean
    pub async fn apply_pull(
        &self,
        local_id: i64,
        title: &str,
        color: &str,
        last_modified: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE labels
                 SET title = ?1, color = ?2, last_modified_local = ?3, status = ?4
                 WHERE local_id = ?5",
                params![
                    title,
                    color,
                    last_modified,
                    SyncStatus::UpToDate.as_i64(),
                    local_id
                ],
            )
            .await?;
        Ok(())
    }

    /// Record a successful push: store the server id and mark the row clean
    pub async fn mark_synced(&self, local_id: i64, id: i64, last_modified: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE labels SET id = ?1, last_modified_local = ?2, status = ?3
                 WHERE local_id = ?4",
                params![id, last_modified, SyncStatus::UpToDate.as_i64(), local_id],
            )
            .await?;
        Ok(())
    }

    /// Tombstone a label for a later delete push
    pub async fn tombstone(&self, local_id: i64, now: i64) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE labels SET status = ?1, last_modified_local = ?2 WHERE local_id = ?3",
                params![SyncStatus::LocalDeleted.as_i64(), now, local_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("label {local_id}")));
        }
        Ok(())
    }

    /// Physically remove a label; its join rows cascade
    pub async fn purge(&self, local_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM labels WHERE local_id = ?1", params![local_id])
            .await?;
        Ok(())
    }

    fn parse_label(row: &libsql::Row) -> Result<Label> {
        Ok(Label {
            local_id: row.get(0)?,
            id: row.get(1)?,
            account_id: row.get(2)?,
            board_local_id: row.get(3)?,
            title: row.get(4)?,
            color: row.get(5)?,
            last_modified_local: row.get(6)?,
            status: SyncStatus::from_i64(row.get(7)?)?,
        })
    }
}
