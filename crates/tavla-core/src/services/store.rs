//! Shared local-store service used across clients
//!
//! All user-facing mutations are optimistic: they commit locally, flag the
//! row for a later push, notify observers, and return immediately. Nothing
//! here touches the network.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    AccountRepository, BoardRepository, CardRepository, Database, LabelRepository,
    StackRepository, UserRepository,
};
use crate::error::{Error, Result};
use crate::models::{Account, Board, Card, Label, Stack, SyncStatus, User};
use crate::observe::{live_query, ChangeNotifier, EntityKind, LiveQuery};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Thread-safe service for store and repository operations
#[derive(Clone)]
pub struct StoreService {
    db: Arc<Mutex<Database>>,
    notifier: ChangeNotifier,
}

impl StoreService {
    /// Open a store service at the given filesystem path
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            notifier: ChangeNotifier::new(),
        })
    }

    /// Open an in-memory store service (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            notifier: ChangeNotifier::new(),
        })
    }

    /// Commit notification hub
    pub const fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Database handle for the sync engine, which works at repository level
    pub(crate) fn db_handle(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    // ## Accounts

    /// Create an account; the name must be unique
    pub async fn create_account(
        &self,
        name: &str,
        user_name: &str,
        url: &str,
    ) -> Result<Account> {
        let account = {
            let db = self.db.lock().await;
            AccountRepository::new(db.connection())
                .create(name, user_name, url)
                .await?
        };
        self.notifier.notify(account.id, EntityKind::Account);
        Ok(account)
    }

    /// Fetch an account by id
    pub async fn get_account(&self, account_id: i64) -> Result<Account> {
        let db = self.db.lock().await;
        AccountRepository::new(db.connection())
            .get(account_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {account_id}")))
    }

    /// Fetch an account by its unique name
    pub async fn account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let db = self.db.lock().await;
        AccountRepository::new(db.connection()).by_name(name).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let db = self.db.lock().await;
        AccountRepository::new(db.connection()).list().await
    }

    /// Remove an account and its whole local subtree
    pub async fn delete_account(&self, account_id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            AccountRepository::new(db.connection())
                .delete(account_id)
                .await?;
        }
        self.notifier.notify(account_id, EntityKind::Account);
        Ok(())
    }

    // ## Boards

    /// Create a board locally; pushed on the next synchronize call
    pub async fn create_board(&self, account_id: i64, title: &str, color: &str) -> Result<Board> {
        let title = non_empty(title, "board title")?;
        let board = {
            let db = self.db.lock().await;
            BoardRepository::new(db.connection())
                .insert(&Board::new_local(account_id, title, color))
                .await?
        };
        self.notifier.notify(account_id, EntityKind::Board);
        Ok(board)
    }

    /// Edit a board's fields locally and flag it for push
    pub async fn update_board(
        &self,
        account_id: i64,
        local_id: i64,
        title: &str,
        color: &str,
    ) -> Result<Board> {
        let title = non_empty(title, "board title")?;
        let board = {
            let db = self.db.lock().await;
            let repo = BoardRepository::new(db.connection());
            repo.update_content(local_id, title, color, now_ms()).await?;
            repo.get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("board {local_id}")))?
        };
        self.notifier.notify(account_id, EntityKind::Board);
        Ok(board)
    }

    /// Delete a board locally.
    ///
    /// A board the server never saw is purged outright; otherwise it is
    /// tombstoned until the delete push round-trips.
    pub async fn delete_board(&self, account_id: i64, local_id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = BoardRepository::new(db.connection());
            let board = repo
                .get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("board {local_id}")))?;
            if board.id.is_none() {
                repo.purge(local_id).await?;
            } else {
                repo.tombstone(local_id, now_ms()).await?;
            }
        }
        self.notifier.notify(account_id, EntityKind::Board);
        self.notifier.notify(account_id, EntityKind::Stack);
        self.notifier.notify(account_id, EntityKind::Card);
        Ok(())
    }

    /// Fetch a board by `(account_id, local_id)`
    pub async fn get_board(&self, account_id: i64, local_id: i64) -> Result<Board> {
        let db = self.db.lock().await;
        BoardRepository::new(db.connection())
            .get(account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("board {local_id}")))
    }

    /// List an account's visible boards
    pub async fn get_boards(&self, account_id: i64) -> Result<Vec<Board>> {
        let db = self.db.lock().await;
        BoardRepository::new(db.connection()).list(account_id).await
    }

    // ## Stacks

    /// Create a stack locally; pushed on the next synchronize call
    pub async fn create_stack(
        &self,
        account_id: i64,
        board_local_id: i64,
        title: &str,
        sort_order: i64,
    ) -> Result<Stack> {
        let title = non_empty(title, "stack title")?;
        let stack = {
            let db = self.db.lock().await;
            ensure_board_live(&db, account_id, board_local_id).await?;
            StackRepository::new(db.connection())
                .insert(&Stack::new_local(
                    account_id,
                    board_local_id,
                    title,
                    sort_order,
                ))
                .await?
        };
        self.notifier.notify(account_id, EntityKind::Stack);
        Ok(stack)
    }

    /// Edit a stack's fields locally and flag it for push
    pub async fn update_stack(
        &self,
        account_id: i64,
        local_id: i64,
        title: &str,
        sort_order: i64,
    ) -> Result<Stack> {
        let title = non_empty(title, "stack title")?;
        let stack = {
            let db = self.db.lock().await;
            let repo = StackRepository::new(db.connection());
            repo.update_content(local_id, title, sort_order, now_ms())
                .await?;
            repo.get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("stack {local_id}")))?
        };
        self.notifier.notify(account_id, EntityKind::Stack);
        Ok(stack)
    }

    /// Delete a stack locally (purge if never pushed, tombstone otherwise)
    pub async fn delete_stack(&self, account_id: i64, local_id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = StackRepository::new(db.connection());
            let stack = repo
                .get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("stack {local_id}")))?;
            if stack.id.is_none() {
                repo.purge(local_id).await?;
            } else {
                repo.tombstone(local_id, now_ms()).await?;
            }
        }
        self.notifier.notify(account_id, EntityKind::Stack);
        self.notifier.notify(account_id, EntityKind::Card);
        Ok(())
    }

    /// Fetch a stack by `(account_id, local_id)`
    pub async fn get_stack(&self, account_id: i64, local_id: i64) -> Result<Stack> {
        let db = self.db.lock().await;
        StackRepository::new(db.connection())
            .get(account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("stack {local_id}")))
    }

    /// List a board's visible stacks in board order
    pub async fn get_stacks_for_board(&self, board_local_id: i64) -> Result<Vec<Stack>> {
        let db = self.db.lock().await;
        StackRepository::new(db.connection())
            .list_for_board(board_local_id)
            .await
    }

    // ## Cards

    /// Create a card locally; pushed on the next synchronize call
    pub async fn create_card(
        &self,
        account_id: i64,
        stack_local_id: i64,
        title: &str,
        sort_order: i64,
    ) -> Result<Card> {
        let title = non_empty(title, "card title")?;
        let card = {
            let db = self.db.lock().await;
            ensure_stack_live(&db, account_id, stack_local_id).await?;
            CardRepository::new(db.connection())
                .insert(&Card::new_local(
                    account_id,
                    stack_local_id,
                    title,
                    sort_order,
                ))
                .await?
        };
        self.notifier.notify(account_id, EntityKind::Card);
        Ok(card)
    }

    /// Edit a card's fields locally and flag it for push
    pub async fn update_card(
        &self,
        account_id: i64,
        local_id: i64,
        title: &str,
        description: &str,
        due_date: Option<i64>,
        sort_order: i64,
    ) -> Result<Card> {
        let title = non_empty(title, "card title")?;
        let card = {
            let db = self.db.lock().await;
            let repo = CardRepository::new(db.connection());
            repo.update_content(local_id, title, description, due_date, sort_order, now_ms())
                .await?;
            repo.get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("card {local_id}")))?
        };
        self.notifier.notify(account_id, EntityKind::Card);
        Ok(card)
    }

    /// Delete a card locally (purge if never pushed, tombstone otherwise)
    pub async fn delete_card(&self, account_id: i64, local_id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = CardRepository::new(db.connection());
            let card = repo
                .get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("card {local_id}")))?;
            if card.id.is_none() {
                repo.purge(local_id).await?;
            } else {
                repo.tombstone(local_id, now_ms()).await?;
            }
        }
        self.notifier.notify(account_id, EntityKind::Card);
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Fetch a card by `(account_id, local_id)`
    pub async fn get_card(&self, account_id: i64, local_id: i64) -> Result<Card> {
        let db = self.db.lock().await;
        CardRepository::new(db.connection())
            .get(account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("card {local_id}")))
    }

    /// List a stack's visible cards in stack order
    pub async fn get_cards_for_stack(&self, stack_local_id: i64) -> Result<Vec<Card>> {
        let db = self.db.lock().await;
        CardRepository::new(db.connection())
            .list_for_stack(stack_local_id)
            .await
    }

    // ## Labels

    /// Create a label locally; pushed on the next synchronize call
    pub async fn create_label(
        &self,
        account_id: i64,
        board_local_id: i64,
        title: &str,
        color: &str,
    ) -> Result<Label> {
        let title = non_empty(title, "label title")?;
        let label = {
            let db = self.db.lock().await;
            ensure_board_live(&db, account_id, board_local_id).await?;
            LabelRepository::new(db.connection())
                .insert(&Label::new_local(account_id, board_local_id, title, color))
                .await?
        };
        self.notifier.notify(account_id, EntityKind::Label);
        Ok(label)
    }

    /// Edit a label's fields locally and flag it for push
    pub async fn update_label(
        &self,
        account_id: i64,
        local_id: i64,
        title: &str,
        color: &str,
    ) -> Result<Label> {
        let title = non_empty(title, "label title")?;
        let label = {
            let db = self.db.lock().await;
            let repo = LabelRepository::new(db.connection());
            repo.update_content(local_id, title, color, now_ms()).await?;
            repo.get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("label {local_id}")))?
        };
        self.notifier.notify(account_id, EntityKind::Label);
        Ok(label)
    }

    /// Delete a label locally (purge if never pushed, tombstone otherwise)
    pub async fn delete_label(&self, account_id: i64, local_id: i64) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LabelRepository::new(db.connection());
            let label = repo
                .get(account_id, local_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("label {local_id}")))?;
            if label.id.is_none() {
                repo.purge(local_id).await?;
            } else {
                repo.tombstone(local_id, now_ms()).await?;
            }
        }
        self.notifier.notify(account_id, EntityKind::Label);
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Case-insensitive substring search over a board's labels
    pub async fn search_labels(
        &self,
        account_id: i64,
        board_local_id: i64,
        term: &str,
    ) -> Result<Vec<Label>> {
        let db = self.db.lock().await;
        LabelRepository::new(db.connection())
            .search_by_title(account_id, board_local_id, term)
            .await
    }

    // ## Users

    /// List the users known to an account
    pub async fn list_users(&self, account_id: i64) -> Result<Vec<User>> {
        let db = self.db.lock().await;
        UserRepository::new(db.connection()).list(account_id).await
    }

    /// Case-insensitive substring search over uid and display name
    pub async fn search_users(&self, account_id: i64, term: &str) -> Result<Vec<User>> {
        let db = self.db.lock().await;
        UserRepository::new(db.connection())
            .search(account_id, term)
            .await
    }

    // ## Card relations

    /// Assign a user to a card; pushed as a dedicated call on the next sync
    pub async fn assign_user(
        &self,
        account_id: i64,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<()> {
        {
            let db = self.db.lock().await;
            CardRepository::new(db.connection())
                .request_user_assignment(card_local_id, user_local_id)
                .await?;
        }
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Unassign a user from a card
    pub async fn unassign_user(
        &self,
        account_id: i64,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<()> {
        {
            let db = self.db.lock().await;
            CardRepository::new(db.connection())
                .request_user_unassignment(card_local_id, user_local_id)
                .await?;
        }
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Attach a label to a card
    pub async fn assign_label(
        &self,
        account_id: i64,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<()> {
        {
            let db = self.db.lock().await;
            CardRepository::new(db.connection())
                .request_label_assignment(card_local_id, label_local_id)
                .await?;
        }
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Detach a label from a card
    pub async fn unassign_label(
        &self,
        account_id: i64,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<()> {
        {
            let db = self.db.lock().await;
            CardRepository::new(db.connection())
                .request_label_unassignment(card_local_id, label_local_id)
                .await?;
        }
        self.notifier.notify(account_id, EntityKind::CardRelation);
        Ok(())
    }

    /// Users currently assigned to a card
    pub async fn users_for_card(&self, card_local_id: i64) -> Result<Vec<User>> {
        let db = self.db.lock().await;
        CardRepository::new(db.connection())
            .users_for_card(card_local_id)
            .await
    }

    /// Labels currently attached to a card
    pub async fn labels_for_card(&self, card_local_id: i64) -> Result<Vec<Label>> {
        let db = self.db.lock().await;
        CardRepository::new(db.connection())
            .labels_for_card(card_local_id)
            .await
    }

    // ## Live queries

    /// Live view of an account's boards
    pub fn watch_boards(&self, account_id: i64) -> LiveQuery<Board> {
        let service = self.clone();
        live_query(
            &self.notifier,
            account_id,
            vec![EntityKind::Board],
            move || {
                let service = service.clone();
                async move { service.get_boards(account_id).await }
            },
        )
    }

    /// Live view of a board's stacks
    pub fn watch_stacks_for_board(
        &self,
        account_id: i64,
        board_local_id: i64,
    ) -> LiveQuery<Stack> {
        let service = self.clone();
        live_query(
            &self.notifier,
            account_id,
            vec![EntityKind::Stack, EntityKind::Board],
            move || {
                let service = service.clone();
                async move { service.get_stacks_for_board(board_local_id).await }
            },
        )
    }

    /// Live view of a stack's cards
    pub fn watch_cards_for_stack(
        &self,
        account_id: i64,
        stack_local_id: i64,
    ) -> LiveQuery<Card> {
        let service = self.clone();
        live_query(
            &self.notifier,
            account_id,
            vec![EntityKind::Card, EntityKind::Stack],
            move || {
                let service = service.clone();
                async move { service.get_cards_for_stack(stack_local_id).await }
            },
        )
    }

    /// Live label search scoped to a board
    pub fn watch_label_search(
        &self,
        account_id: i64,
        board_local_id: i64,
        term: impl Into<String>,
    ) -> LiveQuery<Label> {
        let service = self.clone();
        let term = term.into();
        live_query(
            &self.notifier,
            account_id,
            vec![EntityKind::Label, EntityKind::Board],
            move || {
                let service = service.clone();
                let term = term.clone();
                async move {
                    service
                        .search_labels(account_id, board_local_id, &term)
                        .await
                }
            },
        )
    }
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}

async fn ensure_board_live(db: &Database, account_id: i64, board_local_id: i64) -> Result<()> {
    let board = BoardRepository::new(db.connection())
        .get(account_id, board_local_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("board {board_local_id}")))?;
    if board.status == SyncStatus::LocalDeleted {
        return Err(Error::Constraint(format!(
            "board {board_local_id} is deleted"
        )));
    }
    Ok(())
}

async fn ensure_stack_live(db: &Database, account_id: i64, stack_local_id: i64) -> Result<()> {
    let stack = StackRepository::new(db.connection())
        .get(account_id, stack_local_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("stack {stack_local_id}")))?;
    if stack.status == SyncStatus::LocalDeleted {
        return Err(Error::Constraint(format!(
            "stack {stack_local_id} is deleted"
        )));
    }
    Ok(())
}
