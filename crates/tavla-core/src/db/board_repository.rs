//! Board repository

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Board, SyncStatus};

const BOARD_COLUMNS: &str =
    "local_id, id, account_id, title, color, last_modified_local, status";

/// Storage operations for boards
pub struct BoardRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BoardRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a board row and return it with its assigned local id
    pub async fn insert(&self, board: &Board) -> Result<Board> {
        self.conn
            .execute(
                "INSERT INTO boards (id, account_id, title, color, last_modified_local, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    board.id,
                    board.account_id,
                    board.title.as_str(),
                    board.color.as_str(),
                    board.last_modified_local,
                    board.status.as_i64()
                ],
            )
            .await?;

        let local_id = self.conn.last_insert_rowid();
        self.get(board.account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("board {local_id}")))
    }

    /// Get a board by `(account_id, local_id)`
    pub async fn get(&self, account_id: i64, local_id: i64) -> Result<Option<Board>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {BOARD_COLUMNS} FROM boards WHERE account_id = ?1 AND local_id = ?2"
                ),
                params![account_id, local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_board(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a board by `(account_id, remote id)`
    pub async fn find_by_remote_id(&self, account_id: i64, id: i64) -> Result<Option<Board>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {BOARD_COLUMNS} FROM boards WHERE account_id = ?1 AND id = ?2"),
                params![account_id, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_board(&row)?)),
            None => Ok(None),
        }
    }

    /// List boards visible to the user (tombstones excluded), by title
    pub async fn list(&self, account_id: i64) -> Result<Vec<Board>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {BOARD_COLUMNS} FROM boards
                     WHERE account_id = ?1 AND status <> ?2
                     ORDER BY title COLLATE NOCASE"
                ),
                params![account_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut boards = Vec::new();
        while let Some(row) = rows.next().await? {
            boards.push(Self::parse_board(&row)?);
        }
        Ok(boards)
    }

    /// List every board row for an account, tombstones included (sync scans)
    pub async fn list_all(&self, account_id: i64) -> Result<Vec<Board>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {BOARD_COLUMNS} FROM boards WHERE account_id = ?1"),
                params![account_id],
            )
            .await?;

        let mut boards = Vec::new();
        while let Some(row) = rows.next().await? {
            boards.push(Self::parse_board(&row)?);
        }
        Ok(boards)
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
                "UPDATE boards
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
            return Err(Error::NotFound(format!("board {local_id}")));
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
                "UPDATE boards
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
                "UPDATE boards SET id = ?1, last_modified_local = ?2, status = ?3
                 WHERE local_id = ?4",
                params![id, last_modified, SyncStatus::UpToDate.as_i64(), local_id],
            )
            .await?;
        Ok(())
    }

    /// Tombstone a board for a later delete push
    pub async fn tombstone(&self, local_id: i64, now: i64) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE boards SET status = ?1, last_modified_local = ?2 WHERE local_id = ?3",
                params![SyncStatus::LocalDeleted.as_i64(), now, local_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("board {local_id}")));
        }
        Ok(())
    }

    /// Physically remove a board; stacks, cards, labels and join rows cascade
    pub async fn purge(&self, local_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM boards WHERE local_id = ?1", params![local_id])
            .await?;
        Ok(())
    }

    fn parse_board(row: &libsql::Row) -> Result<Board> {
        Ok(Board {
            local_id: row.get(0)?,
            id: row.get(1)?,
            account_id: row.get(2)?,
            title: row.get(3)?,
            color: row.get(4)?,
            last_modified_local: row.get(5)?,
            status: SyncStatus::from_i64(row.get(6)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, Database};

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let account = AccountRepository::new(db.connection())
            .create("work", "jane", "https://cloud.example.com")
            .await
            .unwrap();
        (db, account.id)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let (db, account_id) = setup().await;
        let repo = BoardRepository::new(db.connection());

        let board = repo
            .insert(&Board::new_local(account_id, "Backlog", "0082c9"))
            .await
            .unwrap();
        assert!(board.local_id > 0);
        assert_eq!(board.status, SyncStatus::LocalEdited);

        let fetched = repo.get(account_id, board.local_id).await.unwrap().unwrap();
        assert_eq!(fetched, board);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_excludes_tombstones() {
        let (db, account_id) = setup().await;
        let repo = BoardRepository::new(db.connection());

        let keep = repo
            .insert(&Board::new_local(account_id, "Keep", "ffffff"))
            .await
            .unwrap();
        let gone = repo
            .insert(&Board::new_local(account_id, "Gone", "ffffff"))
            .await
            .unwrap();
        repo.tombstone(gone.local_id, 1).await.unwrap();

        let boards = repo.list(account_id).await.unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].local_id, keep.local_id);

        // sync scans still see the tombstone
        assert_eq!(repo.list_all(account_id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_synced_fills_remote_id() {
        let (db, account_id) = setup().await;
        let repo = BoardRepository::new(db.connection());

        let board = repo
            .insert(&Board::new_local(account_id, "Backlog", "0082c9"))
            .await
            .unwrap();
        repo.mark_synced(board.local_id, 42, 1_000).await.unwrap();

        let fetched = repo.get(account_id, board.local_id).await.unwrap().unwrap();
        assert_eq!(fetched.id, Some(42));
        assert_eq!(fetched.status, SyncStatus::UpToDate);

        let by_remote = repo.find_by_remote_id(account_id, 42).await.unwrap().unwrap();
        assert_eq!(by_remote.local_id, board.local_id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_remote_id_rejected() {
        let (db, account_id) = setup().await;
        let repo = BoardRepository::new(db.connection());

        let first = repo
            .insert(&Board::new_local(account_id, "A", "ffffff"))
            .await
            .unwrap();
        let second = repo
            .insert(&Board::new_local(account_id, "B", "ffffff"))
            .await
            .unwrap();
        repo.mark_synced(first.local_id, 7, 1).await.unwrap();

        let err = repo.mark_synced(second.local_id, 7, 1).await.unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }
}
