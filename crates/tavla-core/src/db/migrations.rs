//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // inside one transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Accounts; last_sync is the per-account watermark (epoch ms)
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            user_name TEXT NOT NULL,
            url TEXT NOT NULL,
            last_sync INTEGER
        )",
        // Boards
        "CREATE TABLE IF NOT EXISTS boards (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '0082c9',
            last_modified_local INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0
        )",
        // Remote ids are unique per account once assigned; multiple NULLs allowed
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_boards_remote
            ON boards(account_id, id) WHERE id IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_boards_account ON boards(account_id)",
        "CREATE INDEX IF NOT EXISTS idx_boards_status ON boards(status)",
        // Stacks
        "CREATE TABLE IF NOT EXISTS stacks (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            board_local_id INTEGER NOT NULL REFERENCES boards(local_id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            last_modified_local INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_stacks_remote
            ON stacks(account_id, id) WHERE id IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_stacks_board ON stacks(board_local_id)",
        // Cards
        "CREATE TABLE IF NOT EXISTS cards (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            stack_local_id INTEGER NOT NULL REFERENCES stacks(local_id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            due_date INTEGER,
            sort_order INTEGER NOT NULL DEFAULT 0,
            last_modified_local INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_cards_remote
            ON cards(account_id, id) WHERE id IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_cards_stack ON cards(stack_local_id)",
        // Labels
        "CREATE TABLE IF NOT EXISTS labels (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            board_local_id INTEGER NOT NULL REFERENCES boards(local_id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            color TEXT NOT NULL DEFAULT '31cc7c',
            last_modified_local INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_labels_remote
            ON labels(account_id, id) WHERE id IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_labels_board ON labels(board_local_id)",
        // Users; the server addresses users by uid, so that is the remote identity
        "CREATE TABLE IF NOT EXISTS users (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            uid TEXT NOT NULL,
            display_name TEXT NOT NULL DEFAULT '',
            last_modified_local INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0,
            UNIQUE(account_id, uid)
        )",
        // Card <-> user junction; status marks pending assign/unassign pushes
        "CREATE TABLE IF NOT EXISTS card_users (
            card_local_id INTEGER NOT NULL REFERENCES cards(local_id) ON DELETE CASCADE,
            user_local_id INTEGER NOT NULL REFERENCES users(local_id) ON DELETE CASCADE,
            status INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (card_local_id, user_local_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_card_users_user ON card_users(user_local_id)",
        // Card <-> label junction
        "CREATE TABLE IF NOT EXISTS card_labels (
            card_local_id INTEGER NOT NULL REFERENCES cards(local_id) ON DELETE CASCADE,
            label_local_id INTEGER NOT NULL REFERENCES labels(local_id) ON DELETE CASCADE,
            status INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (card_local_id, label_local_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_card_labels_label ON card_labels(label_local_id)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
