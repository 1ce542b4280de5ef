//! Account repository

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::Account;

/// Storage operations for accounts.
///
/// The account row also carries the sync watermark (`last_sync`, epoch ms of
/// the last fully successful pull's start).
pub struct AccountRepository<'a> {
    conn: &'a Connection,
}

impl<'a> AccountRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new account; the name must be unique
    pub async fn create(&self, name: &str, user_name: &str, url: &str) -> Result<Account> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("account name must not be empty".into()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::InvalidInput(
                "account url must include http:// or https://".into(),
            ));
        }

        self.conn
            .execute(
                "INSERT INTO accounts (name, user_name, url) VALUES (?1, ?2, ?3)",
                params![name, user_name, url],
            )
            .await?;

        let id = self.conn.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    /// Get an account by its local id
    pub async fn get(&self, id: i64) -> Result<Option<Account>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, user_name, url, last_sync FROM accounts WHERE id = ?1",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by its unique name
    pub async fn by_name(&self, name: &str) -> Result<Option<Account>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, user_name, url, last_sync FROM accounts WHERE name = ?1",
                params![name],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts, oldest first
    pub async fn list(&self) -> Result<Vec<Account>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, user_name, url, last_sync FROM accounts ORDER BY id",
                (),
            )
            .await?;

        let mut accounts = Vec::new();
        while let Some(row) = rows.next().await? {
            accounts.push(Self::parse_account(&row)?);
        }
        Ok(accounts)
    }

    /// Remove an account and, via foreign keys, its whole entity subtree
    pub async fn delete(&self, id: i64) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    /// Advance the sync watermark for an account
    pub async fn set_last_sync(&self, id: i64, last_sync: i64) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE accounts SET last_sync = ?1 WHERE id = ?2",
                params![last_sync, id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    fn parse_account(row: &libsql::Row) -> Result<Account> {
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            user_name: row.get(2)?,
            url: row.get(3)?,
            last_sync: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = AccountRepository::new(db.connection());

        let account = repo
            .create("work", "jane", "https://cloud.example.com")
            .await
            .unwrap();
        assert_eq!(account.name, "work");
        assert!(account.last_sync.is_none());

        let fetched = repo.get(account.id).await.unwrap().unwrap();
        assert_eq!(fetched, account);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_name_is_constraint_violation() {
        let db = setup().await;
        let repo = AccountRepository::new(db.connection());

        repo.create("work", "jane", "https://cloud.example.com")
            .await
            .unwrap();
        let err = repo
            .create("work", "john", "https://other.example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invalid_url_rejected() {
        let db = setup().await;
        let repo = AccountRepository::new(db.connection());

        let err = repo.create("work", "jane", "cloud.example.com").await;
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_last_sync() {
        let db = setup().await;
        let repo = AccountRepository::new(db.connection());

        let account = repo
            .create("work", "jane", "https://cloud.example.com")
            .await
            .unwrap();
        repo.set_last_sync(account.id, 1_700_000_000_000).await.unwrap();

        let fetched = repo.get(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_sync, Some(1_700_000_000_000));
    }
}
