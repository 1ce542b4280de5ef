//! Stack repository

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Stack, SyncStatus};

const STACK_COLUMNS: &str =
    "local_id, id, account_id, board_local_id, title, sort_order, last_modified_local, status";

/// Storage operations for stacks
pub struct StackRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StackRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a stack row and return it with its assigned local id
    pub async fn insert(&self, stack: &Stack) -> Result<Stack> {
        self.conn
            .execute(
                "INSERT INTO stacks
                 (id, account_id, board_local_id, title, sort_order, last_modified_local, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    stack.id,
                    stack.account_id,
                    stack.board_local_id,
                    stack.title.as_str(),
                    stack.sort_order,
                    stack.last_modified_local,
                    stack.status.as_i64()
                ],
            )
            .await?;

        let local_id = self.conn.last_insert_rowid();
        self.get(stack.account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("stack {local_id}")))
    }

    /// Get a stack by `(account_id, local_id)`
    pub async fn get(&self, account_id: i64, local_id: i64) -> Result<Option<Stack>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {STACK_COLUMNS} FROM stacks WHERE account_id = ?1 AND local_id = ?2"
                ),
                params![account_id, local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_stack(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a stack by `(account_id, remote id)`
    pub async fn find_by_remote_id(&self, account_id: i64, id: i64) -> Result<Option<Stack>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {STACK_COLUMNS} FROM stacks WHERE account_id = ?1 AND id = ?2"),
                params![account_id, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_stack(&row)?)),
            None => Ok(None),
        }
    }

    /// List visible stacks of a board in board order
    pub async fn list_for_board(&self, board_local_id: i64) -> Result<Vec<Stack>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {STACK_COLUMNS} FROM stacks
                     WHERE board_local_id = ?1 AND status <> ?2
                     ORDER BY sort_order, local_id"
                ),
                params![board_local_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut stacks = Vec::new();
        while let Some(row) = rows.next().await? {
            stacks.push(Self::parse_stack(&row)?);
        }
        Ok(stacks)
    }

    /// List every stack row of a board, tombstones included (sync scans)
    pub async fn list_all_for_board(&self, board_local_id: i64) -> Result<Vec<Stack>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {STACK_COLUMNS} FROM stacks WHERE board_local_id = ?1"),
                params![board_local_id],
            )
            .await?;

        let mut stacks = Vec::new();
        while let Some(row) = rows.next().await? {
            stacks.push(Self::parse_stack(&row)?);
        }
        Ok(stacks)
    }

    /// Apply a local edit: overwrite user-editable fields and mark dirty
    pub async fn update_content(
        &self,
        local_id: i64,
        title: &str,
        sort_order: i64,
        now: i64,
    ) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE stacks
                 SET title = ?1, sort_order = ?2, last_modified_local = ?3, status = ?4
                 WHERE local_id = ?5",
                params![
                    title,
                    sort_order,
                    now,
                    SyncStatus::LocalEdited.as_i64(),
                    local_id
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("stack {local_id}")));
        }
        Ok(())
    }

    /// Overwrite fields from a pulled server row and mark the row clean
    pub async fn apply_pull(
        &self,
        local_id: i64,
        title: &str,
        sort_order: i64,
        last_modified: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE stacks
                 SET title = ?1, sort_order = ?2, last_modified_local = ?3, status = ?4
                 WHERE local_id = ?5",
                params![
                    title,
                    sort_order,
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
                "UPDATE stacks SET id = ?1, last_modified_local = ?2, status = ?3
                 WHERE local_id = ?4",
                params![id, last_modified, SyncStatus::UpToDate.as_i64(), local_id],
            )
            .await?;
        Ok(())
    }

    /// Tombstone a stack for a later delete push
    pub async fn tombstone(&self, local_id: i64, now: i64) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE stacks SET status = ?1, last_modified_local = ?2 WHERE local_id = ?3",
                params![SyncStatus::LocalDeleted.as_i64(), now, local_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("stack {local_id}")));
        }
        Ok(())
    }

    /// Physically remove a stack; its cards and their join rows cascade
    pub async fn purge(&self, local_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM stacks WHERE local_id = ?1", params![local_id])
            .await?;
        Ok(())
    }

    fn parse_stack(row: &libsql::Row) -> Result<Stack> {
        Ok(Stack {
            local_id: row.get(0)?,
            id: row.get(1)?,
            account_id: row.get(2)?,
            board_local_id: row.get(3)?,
            title: row.get(4)?,
            sort_order: row.get(5)?,
            last_modified_local: row.get(6)?,
            status: SyncStatus::from_i64(row.get(7)?)?,
        })
    }
}
