//! User repository

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{SyncStatus, User};

const USER_COLUMNS: &str = "local_id, account_id, uid, display_name, last_modified_local, status";

/// Storage operations for server users known to an account.
///
/// Users only enter the store through pulls; identity is `(account_id, uid)`.
pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert or refresh a user from a pulled server payload
    pub async fn upsert_pulled(
        &self,
        account_id: i64,
        uid: &str,
        display_name: &str,
        last_modified: i64,
    ) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (account_id, uid, display_name, last_modified_local, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(account_id, uid) DO UPDATE SET
                    display_name = excluded.display_name,
                    last_modified_local = excluded.last_modified_local,
                    status = excluded.status",
                params![
                    account_id,
                    uid,
                    display_name,
                    last_modified,
                    SyncStatus::UpToDate.as_i64()
                ],
            )
            .await?;

        self.find_by_uid(account_id, uid)
            .await?
            .ok_or_else(|| crate::error::Error::NotFound(format!("user {uid}")))
    }

    /// Get a user by `(account_id, local_id)`
    pub async fn get(&self, account_id: i64, local_id: i64) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE account_id = ?1 AND local_id = ?2"
                ),
                params![account_id, local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a user by `(account_id, uid)`
    pub async fn find_by_uid(&self, account_id: i64, uid: &str) -> Result<Option<User>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE account_id = ?1 AND uid = ?2"),
                params![account_id, uid],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_user(&row)?)),
            None => Ok(None),
        }
    }

    /// List visible users of an account, by display name
    pub async fn list(&self, account_id: i64) -> Result<Vec<User>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE account_id = ?1 AND status <> ?2
                     ORDER BY display_name COLLATE NOCASE"
                ),
                params![account_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(Self::parse_user(&row)?);
        }
        Ok(users)
    }

    /// Case-insensitive substring search over uid and display name
    pub async fn search(&self, account_id: i64, term: &str) -> Result<Vec<User>> {
        let pattern = format!("%{}%", term.trim());
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE account_id = ?1 AND status <> ?2
                       AND (uid LIKE ?3 OR display_name LIKE ?3)
                     ORDER BY display_name COLLATE NOCASE"
                ),
                params![account_id, SyncStatus::LocalDeleted.as_i64(), pattern],
            )
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(Self::parse_user(&row)?);
        }
        Ok(users)
    }

    fn parse_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            local_id: row.get(0)?,
            account_id: row.get(1)?,
            uid: row.get(2)?,
            display_name: row.get(3)?,
            last_modified_local: row.get(4)?,
            status: SyncStatus::from_i64(row.get(5)?)?,
        })
    }
}
