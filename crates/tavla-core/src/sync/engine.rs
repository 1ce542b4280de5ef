//! Pull-merge-push reconciliation per account
//!
//! One engine instance is constructed per process and injected into callers;
//! it holds the at-most-one-sync-per-account invariant. A `synchronize` run
//! walks the account's scopes in dependency order (boards, then each board's
//! stacks and cards), pulls deltas since the account watermark, merges them
//! under the local-wins rule, advances the watermark, and finally pushes
//! pending local work. Failures abort the remainder of the run, leave
//! committed rows alone, and are never retried here.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use crate::connectivity::Connectivity;
use crate::db::{
    AccountRepository, BoardRepository, CardRepository, Database, LabelRepository,
    StackRepository, UserRepository,
};
use crate::error::{Error, Result};
use crate::models::{Account, Board, Card, Label, Stack, SyncStatus};
use crate::observe::EntityKind;
use crate::remote::{
    BoardDto, BoardWrite, CardDto, CardWrite, LabelWrite, RemoteApi, StackDto, StackWrite,
};
use crate::services::StoreService;

use super::merge::{classify_remote_row, omission_purges, MergeAction};

/// Row counts of one `synchronize` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Rows inserted or overwritten from server listings
    pub pulled: usize,
    /// Local changes successfully pushed (creates, updates, deletes, relations)
    pub pushed: usize,
    /// Rows removed after vanishing from a server listing
    pub purged: usize,
}

/// Process-scoped sync coordinator
pub struct SyncEngine<R> {
    store: StoreService,
    remote: R,
    connectivity: Arc<dyn Connectivity>,
    in_flight: StdMutex<HashSet<i64>>,
}

/// RAII claim of an account's sync slot
struct SyncClaim<'a> {
    set: &'a StdMutex<HashSet<i64>>,
    account_id: i64,
}

impl<'a> SyncClaim<'a> {
    fn claim(set: &'a StdMutex<HashSet<i64>>, account_id: i64) -> Result<Self> {
        let mut claimed = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(account_id) {
            return Err(Error::SyncInProgress(account_id));
        }
        Ok(Self { set, account_id })
    }
}

impl Drop for SyncClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.account_id);
    }
}

impl<R: RemoteApi> SyncEngine<R> {
    /// Create the engine over a store, a gateway, and a connectivity source
    pub fn new(store: StoreService, remote: R, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            store,
            remote,
            connectivity,
            in_flight: StdMutex::new(HashSet::new()),
        }
    }

    /// The store this engine reconciles
    pub const fn store(&self) -> &StoreService {
        &self.store
    }

    /// Run one full reconciliation pass for an account.
    ///
    /// Fails with [`Error::SyncInProgress`] when a pass for the same account
    /// is already running.
    pub async fn synchronize(&self, account_id: i64) -> Result<SyncSummary> {
        let _claim = SyncClaim::claim(&self.in_flight, account_id)?;
        let account = self.store.get_account(account_id).await?;
        // recorded before the pull so changes landing mid-pull are re-pulled
        // next time instead of missed
        let pull_start = chrono::Utc::now().timestamp_millis();
        tracing::info!(account_id, since = ?account.last_sync, "sync started");

        let mut summary = SyncSummary::default();

        // ## Pull phase, dependency order
        let board_dtos = self.remote.boards(&account, account.last_sync).await?;
        {
            let handle = self.store.db_handle();
            let db = handle.lock().await;
            merge_boards(&db, &account, &board_dtos, &mut summary).await?;
        }

        for board in self.known_boards(account_id).await? {
            let Some(board_id) = board.id else { continue };
            if board.status == SyncStatus::LocalDeleted {
                continue;
            }
            let stack_dtos = self
                .remote
                .stacks(&account, board_id, account.last_sync)
                .await?;
            let handle = self.store.db_handle();
            let db = handle.lock().await;
            merge_stacks(&db, &account, &board, &stack_dtos, &mut summary).await?;
        }

        // ## Watermark: the pull phase completed without transport failure
        {
            let handle = self.store.db_handle();
            let db = handle.lock().await;
            AccountRepository::new(db.connection())
                .set_last_sync(account_id, pull_start)
                .await?;
        }

        if summary.pulled > 0 || summary.purged > 0 {
            self.notify_all(account_id);
        }
        let pushed_before_push_phase = summary.pushed;

        // ## Push phase, dependency order
        self.push_boards(&account, &mut summary).await?;
        self.push_labels(&account, &mut summary).await?;
        self.push_stacks(&account, &mut summary).await?;
        self.push_cards(&account, &mut summary).await?;
        self.push_relations(&account, &mut summary).await?;

        if summary.pushed > pushed_before_push_phase {
            self.notify_all(account_id);
        }

        tracing::info!(
            account_id,
            pulled = summary.pulled,
            pushed = summary.pushed,
            purged = summary.purged,
            "sync finished"
        );
        Ok(summary)
    }

    async fn known_boards(&self, account_id: i64) -> Result<Vec<Board>> {
        let handle = self.store.db_handle();
        let db = handle.lock().await;
        BoardRepository::new(db.connection())
            .list_all(account_id)
            .await
    }

    async fn push_boards(&self, account: &Account, summary: &mut SyncSummary) -> Result<()> {
        let dirty: Vec<Board> = self
            .known_boards(account.id)
            .await?
            .into_iter()
            .filter(|board| board.status != SyncStatus::UpToDate)
            .collect();

        for board in dirty {
            match board.status {
                SyncStatus::LocalEdited => {
                    self.connectivity.ensure_online()?;
                    let write = BoardWrite::from_model(&board);
                    let created = board.id.is_none();
                    let dto = match board.id {
                        None => self.remote.create_board(account, &write).await?,
                        Some(id) => self.remote.update_board(account, id, &write).await?,
                    };

                    let handle = self.store.db_handle();
                    let db = handle.lock().await;
                    BoardRepository::new(db.connection())
                        .mark_synced(board.local_id, dto.id, dto.last_modified_ms())
                        .await?;
                    if created {
                        // a fresh board may come back with server-side defaults
                        merge_board_children(&db, account, board.local_id, &dto, summary)
                            .await?;
                    }
                    summary.pushed += 1;
                }
                SyncStatus::LocalDeleted => {
                    if let Some(id) = board.id {
                        self.connectivity.ensure_online()?;
                        self.remote.delete_board(account, id).await?;
                    }
                    let handle = self.store.db_handle();
                    let db = handle.lock().await;
                    BoardRepository::new(db.connection())
                        .purge(board.local_id)
                        .await?;
                    summary.pushed += 1;
                }
                SyncStatus::UpToDate => {}
            }
        }
        Ok(())
    }

    async fn push_labels(&self, account: &Account, summary: &mut SyncSummary) -> Result<()> {
        for board in self.known_boards(account.id).await? {
            let Some(board_id) = board.id else { continue };

            let dirty: Vec<Label> = {
                let handle = self.store.db_handle();
                let db = handle.lock().await;
                LabelRepository::new(db.connection())
                    .list_all_for_board(board.local_id)
                    .await?
                    .into_iter()
                    .filter(|label| label.status != SyncStatus::UpToDate)
                    .collect()
            };

            for label in dirty {
                match label.status {
                    SyncStatus::LocalEdited => {
                        self.connectivity.ensure_online()?;
                        let write = LabelWrite::from_model(&label);
                        let dto = match label.id {
                            None => self.remote.create_label(account, board_id, &write).await?,
                            Some(id) => {
                                self.remote.update_label(account, board_id, id, &write).await?
                            }
                        };

                        let handle = self.store.db_handle();
                        let db = handle.lock().await;
                        LabelRepository::new(db.connection())
                            .mark_synced(label.local_id, dto.id, dto.last_modified_ms())
                            .await?;
                        summary.pushed += 1;
                    }
                    SyncStatus::LocalDeleted => {
                        if let Some(id) = label.id {
                            self.connectivity.ensure_online()?;
                            self.remote.delete_label(account, board_id, id).await?;
                        }
                        let handle = self.store.db_handle();
                        let db = handle.lock().await;
                        LabelRepository::new(db.connection())
                            .purge(label.local_id)
                            .await?;
                        summary.pushed += 1;
                    }
                    SyncStatus::UpToDate => {}
                }
            }
        }
        Ok(())
    }

    async fn push_stacks(&self, account: &Account, summary: &mut SyncSummary) -> Result<()> {
        for board in self.known_boards(account.id).await? {
            let Some(board_id) = board.id else { continue };

            let dirty: Vec<Stack> = {
                let handle = self.store.db_handle();
                let db = handle.lock().await;
                StackRepository::new(db.connection())
                    .list_all_for_board(board.local_id)
                    .await?
                    .into_iter()
                    .filter(|stack| stack.status != SyncStatus::UpToDate)
                    .collect()
            };

            for stack in dirty {
                match stack.status {
                    SyncStatus::LocalEdited => {
                        self.connectivity.ensure_online()?;
                        let write = StackWrite::from_model(&stack);
                        let dto = match stack.id {
                            None => self.remote.create_stack(account, board_id, &write).await?,
                            Some(id) => {
                                self.remote.update_stack(account, board_id, id, &write).await?
                            }
                        };

                        let handle = self.store.db_handle();
                        let db = handle.lock().await;
                        StackRepository::new(db.connection())
                            .mark_synced(stack.local_id, dto.id, dto.last_modified_ms())
                            .await?;
                        summary.pushed += 1;
                    }
                    SyncStatus::LocalDeleted => {
                        if let Some(id) = stack.id {
                            self.connectivity.ensure_online()?;
                            self.remote.delete_stack(account, board_id, id).await?;
                        }
                        let handle = self.store.db_handle();
                        let db = handle.lock().await;
                        StackRepository::new(db.connection())
                            .purge(stack.local_id)
                            .await?;
                        summary.pushed += 1;
                    }
                    SyncStatus::UpToDate => {}
                }
            }
        }
        Ok(())
    }

    async fn push_cards(&self, account: &Account, summary: &mut SyncSummary) -> Result<()> {
        for board in self.known_boards(account.id).await? {
            let Some(board_id) = board.id else { continue };

            let stacks: Vec<Stack> = {
                let handle = self.store.db_handle();
                let db = handle.lock().await;
                StackRepository::new(db.connection())
                    .list_all_for_board(board.local_id)
                    .await?
            };

            for stack in stacks {
                let Some(stack_id) = stack.id else { continue };
                if stack.status == SyncStatus::LocalDeleted {
                    continue;
                }

                let dirty: Vec<Card> = {
                    let handle = self.store.db_handle();
                    let db = handle.lock().await;
                    CardRepository::new(db.connection())
                        .list_all_for_stack(stack.local_id)
                        .await?
                        .into_iter()
                        .filter(|card| card.status != SyncStatus::UpToDate)
                        .collect()
                };

                for card in dirty {
                    match card.status {
                        SyncStatus::LocalEdited => {
                            self.connectivity.ensure_online()?;
                            let write = CardWrite::from_model(&card);
                            let dto = match card.id {
                                None => {
                                    self.remote
                                        .create_card(account, board_id, stack_id, &write)
                                        .await?
                                }
                                Some(id) => {
                                    self.remote
                                        .update_card(account, board_id, stack_id, id, &write)
                                        .await?
                                }
                            };

                            let handle = self.store.db_handle();
                            let db = handle.lock().await;
                            CardRepository::new(db.connection())
                                .mark_synced(card.local_id, dto.id, dto.last_modified_ms())
                                .await?;
                            summary.pushed += 1;
                        }
                        SyncStatus::LocalDeleted => {
                            if let Some(id) = card.id {
                                self.connectivity.ensure_online()?;
                                self.remote
                                    .delete_card(account, board_id, stack_id, id)
                                    .await?;
                            }
                            let handle = self.store.db_handle();
                            let db = handle.lock().await;
                            CardRepository::new(db.connection())
                                .purge(card.local_id)
                                .await?;
                            summary.pushed += 1;
                        }
                        SyncStatus::UpToDate => {}
                    }
                }
            }
        }
        Ok(())
    }

    async fn push_relations(&self, account: &Account, summary: &mut SyncSummary) -> Result<()> {
        let (pending_users, pending_labels) = {
            let handle = self.store.db_handle();
            let db = handle.lock().await;
            let cards = CardRepository::new(db.connection());
            (
                cards.pending_user_assignments(account.id).await?,
                cards.pending_label_assignments(account.id).await?,
            )
        };

        for row in pending_users {
            let (target, uid) = {
                let handle = self.store.db_handle();
                let db = handle.lock().await;
                let target = resolve_card_coordinates(&db, account, row.card_local_id).await?;
                let uid = UserRepository::new(db.connection())
                    .get(account.id, row.user_local_id)
                    .await?
                    .map(|user| user.uid);
                (target, uid)
            };
            let (Some(target), Some(uid)) = (target, uid) else {
                tracing::warn!(
                    card = row.card_local_id,
                    user = row.user_local_id,
                    "skipping relation push, remote coordinates incomplete"
                );
                continue;
            };

            self.connectivity.ensure_online()?;
            let handle = self.store.db_handle();
            match row.status {
                SyncStatus::LocalEdited => {
                    self.remote
                        .assign_user(account, target.board_id, target.stack_id, target.card_id, &uid)
                        .await?;
                    let db = handle.lock().await;
                    CardRepository::new(db.connection())
                        .set_user_assignment_status(
                            row.card_local_id,
                            row.user_local_id,
                            SyncStatus::UpToDate,
                        )
                        .await?;
                    summary.pushed += 1;
                }
                SyncStatus::LocalDeleted => {
                    self.remote
                        .unassign_user(
                            account,
                            target.board_id,
                            target.stack_id,
                            target.card_id,
                            &uid,
                        )
                        .await?;
                    let db = handle.lock().await;
                    CardRepository::new(db.connection())
                        .delete_user_assignment(row.card_local_id, row.user_local_id)
                        .await?;
                    summary.pushed += 1;
                }
                SyncStatus::UpToDate => {}
            }
        }

        for row in pending_labels {
            let (target, label_id) = {
                let handle = self.store.db_handle();
                let db = handle.lock().await;
                let target = resolve_card_coordinates(&db, account, row.card_local_id).await?;
                let label_id = LabelRepository::new(db.connection())
                    .get(account.id, row.label_local_id)
                    .await?
                    .and_then(|label| label.id);
                (target, label_id)
            };
            let (Some(target), Some(label_id)) = (target, label_id) else {
                tracing::warn!(
                    card = row.card_local_id,
                    label = row.label_local_id,
                    "skipping relation push, remote coordinates incomplete"
                );
                continue;
            };

            self.connectivity.ensure_online()?;
            let handle = self.store.db_handle();
            match row.status {
                SyncStatus::LocalEdited => {
                    self.remote
                        .assign_label(
                            account,
                            target.board_id,
                            target.stack_id,
                            target.card_id,
                            label_id,
                        )
                        .await?;
                    let db = handle.lock().await;
                    CardRepository::new(db.connection())
                        .set_label_assignment_status(
                            row.card_local_id,
                            row.label_local_id,
                            SyncStatus::UpToDate,
                        )
                        .await?;
                    summary.pushed += 1;
                }
                SyncStatus::LocalDeleted => {
                    self.remote
                        .unassign_label(
                            account,
                            target.board_id,
                            target.stack_id,
                            target.card_id,
                            label_id,
                        )
                        .await?;
                    let db = handle.lock().await;
                    CardRepository::new(db.connection())
                        .delete_label_assignment(row.card_local_id, row.label_local_id)
                        .await?;
                    summary.pushed += 1;
                }
                SyncStatus::UpToDate => {}
            }
        }

        Ok(())
    }

    fn notify_all(&self, account_id: i64) {
        let notifier = self.store.notifier();
        for kind in [
            EntityKind::Board,
            EntityKind::Stack,
            EntityKind::Card,
            EntityKind::Label,
            EntityKind::User,
            EntityKind::CardRelation,
        ] {
            notifier.notify(account_id, kind);
        }
    }
}

/// Remote path coordinates of a card
struct CardCoordinates {
    board_id: i64,
    stack_id: i64,
    card_id: i64,
}

async fn resolve_card_coordinates(
    db: &Database,
    account: &Account,
    card_local_id: i64,
) -> Result<Option<CardCoordinates>> {
    let Some(card) = CardRepository::new(db.connection())
        .get(account.id, card_local_id)
        .await?
    else {
        return Ok(None);
    };
    let Some(card_id) = card.id else {
        return Ok(None);
    };
    let Some(stack) = StackRepository::new(db.connection())
        .get(account.id, card.stack_local_id)
        .await?
    else {
        return Ok(None);
    };
    let Some(stack_id) = stack.id else {
        return Ok(None);
    };
    let Some(board) = BoardRepository::new(db.connection())
        .get(account.id, stack.board_local_id)
        .await?
    else {
        return Ok(None);
    };
    let Some(board_id) = board.id else {
        return Ok(None);
    };
    Ok(Some(CardCoordinates {
        board_id,
        stack_id,
        card_id,
    }))
}

async fn merge_boards(
    db: &Database,
    account: &Account,
    dtos: &[BoardDto],
    summary: &mut SyncSummary,
) -> Result<()> {
    let boards = BoardRepository::new(db.connection());
    let mut listed = HashSet::new();

    for dto in dtos {
        listed.insert(dto.id);
        let existing = boards.find_by_remote_id(account.id, dto.id).await?;
        let action = classify_remote_row(existing.as_ref().map(|board| board.status));

        let target = match (action, existing) {
            (MergeAction::Insert, _) => {
                let inserted = boards
                    .insert(&Board {
                        local_id: 0,
                        id: Some(dto.id),
                        account_id: account.id,
                        title: dto.title.clone(),
                        color: dto.color.clone(),
                        last_modified_local: dto.last_modified_ms(),
                        status: SyncStatus::UpToDate,
                    })
                    .await?;
                summary.pulled += 1;
                Some(inserted.local_id)
            }
            (MergeAction::Overwrite, Some(board)) => {
                boards
                    .apply_pull(board.local_id, &dto.title, &dto.color, dto.last_modified_ms())
                    .await?;
                summary.pulled += 1;
                Some(board.local_id)
            }
            (MergeAction::Skip, Some(board)) => {
                tracing::debug!(board = board.local_id, "pull skipped, local changes pending");
                // a tombstoned board's subtree is left for its delete push
                (board.status == SyncStatus::LocalEdited).then_some(board.local_id)
            }
            (_, None) => None,
        };

        if let Some(board_local_id) = target {
            merge_board_children(db, account, board_local_id, dto, summary).await?;
        }
    }

    let known = boards
        .list_all(account.id)
        .await?
        .into_iter()
        .map(|board| (board.local_id, board.id, board.status));
    for local_id in omission_purges(known, &listed) {
        boards.purge(local_id).await?;
        summary.purged += 1;
    }
    Ok(())
}

async fn merge_board_children(
    db: &Database,
    account: &Account,
    board_local_id: i64,
    dto: &BoardDto,
    summary: &mut SyncSummary,
) -> Result<()> {
    let labels = LabelRepository::new(db.connection());
    let mut listed = HashSet::new();

    for label_dto in &dto.labels {
        listed.insert(label_dto.id);
        let existing = labels.find_by_remote_id(account.id, label_dto.id).await?;
        let action = classify_remote_row(existing.as_ref().map(|label| label.status));
        match (action, existing) {
            (MergeAction::Insert, _) => {
                labels
                    .insert(&Label {
                        local_id: 0,
                        id: Some(label_dto.id),
                        account_id: account.id,
                        board_local_id,
                        title: label_dto.title.clone(),
                        color: label_dto.color.clone(),
                        last_modified_local: label_dto.last_modified_ms(),
                        status: SyncStatus::UpToDate,
                    })
                    .await?;
                summary.pulled += 1;
            }
            (MergeAction::Overwrite, Some(label)) => {
                labels
                    .apply_pull(
                        label.local_id,
                        &label_dto.title,
                        &label_dto.color,
                        label_dto.last_modified_ms(),
                    )
                    .await?;
                summary.pulled += 1;
            }
            _ => {}
        }
    }

    let known = labels
        .list_all_for_board(board_local_id)
        .await?
        .into_iter()
        .map(|label| (label.local_id, label.id, label.status));
    for local_id in omission_purges(known, &listed) {
        labels.purge(local_id).await?;
        summary.purged += 1;
    }

    let users = UserRepository::new(db.connection());
    for user_dto in &dto.users {
        users
            .upsert_pulled(
                account.id,
                &user_dto.uid,
                &user_dto.display_name,
                dto.last_modified_ms(),
            )
            .await?;
    }
    Ok(())
}

async fn merge_stacks(
    db: &Database,
    account: &Account,
    board: &Board,
    dtos: &[StackDto],
    summary: &mut SyncSummary,
) -> Result<()> {
    let stacks = StackRepository::new(db.connection());
    let mut listed = HashSet::new();

    for dto in dtos {
        listed.insert(dto.id);
        let existing = stacks.find_by_remote_id(account.id, dto.id).await?;
        let action = classify_remote_row(existing.as_ref().map(|stack| stack.status));

        let target = match (action, existing) {
            (MergeAction::Insert, _) => {
                let inserted = stacks
                    .insert(&Stack {
                        local_id: 0,
                        id: Some(dto.id),
                        account_id: account.id,
                        board_local_id: board.local_id,
                        title: dto.title.clone(),
                        sort_order: dto.order,
                        last_modified_local: dto.last_modified_ms(),
                        status: SyncStatus::UpToDate,
                    })
                    .await?;
                summary.pulled += 1;
                Some(inserted.local_id)
            }
            (MergeAction::Overwrite, Some(stack)) => {
                stacks
                    .apply_pull(stack.local_id, &dto.title, dto.order, dto.last_modified_ms())
                    .await?;
                summary.pulled += 1;
                Some(stack.local_id)
            }
            (MergeAction::Skip, Some(stack)) => {
                tracing::debug!(stack = stack.local_id, "pull skipped, local changes pending");
                (stack.status == SyncStatus::LocalEdited).then_some(stack.local_id)
            }
            (_, None) => None,
        };

        if let Some(stack_local_id) = target {
            merge_cards(db, account, stack_local_id, &dto.cards, summary).await?;
        }
    }

    let known = stacks
        .list_all_for_board(board.local_id)
        .await?
        .into_iter()
        .map(|stack| (stack.local_id, stack.id, stack.status));
    for local_id in omission_purges(known, &listed) {
        stacks.purge(local_id).await?;
        summary.purged += 1;
    }
    Ok(())
}

async fn merge_cards(
    db: &Database,
    account: &Account,
    stack_local_id: i64,
    dtos: &[CardDto],
    summary: &mut SyncSummary,
) -> Result<()> {
    let cards = CardRepository::new(db.connection());
    let mut listed = HashSet::new();

    for dto in dtos {
        listed.insert(dto.id);
        let due_date = dto.due_date_ms()?;
        let existing = cards.find_by_remote_id(account.id, dto.id).await?;
        let action = classify_remote_row(existing.as_ref().map(|card| card.status));

        let target = match (action, existing) {
            (MergeAction::Insert, _) => {
                let inserted = cards
                    .insert(&Card {
                        local_id: 0,
                        id: Some(dto.id),
                        account_id: account.id,
                        stack_local_id,
                        title: dto.title.clone(),
                        description: dto.description.clone(),
                        due_date,
                        sort_order: dto.order,
                        last_modified_local: dto.last_modified_ms(),
                        status: SyncStatus::UpToDate,
                    })
                    .await?;
                summary.pulled += 1;
                Some(inserted.local_id)
            }
            (MergeAction::Overwrite, Some(card)) => {
                cards
                    .apply_pull(
                        card.local_id,
                        &dto.title,
                        &dto.description,
                        due_date,
                        dto.order,
                        dto.last_modified_ms(),
                    )
                    .await?;
                if card.stack_local_id != stack_local_id {
                    cards.reparent(card.local_id, stack_local_id).await?;
                }
                summary.pulled += 1;
                Some(card.local_id)
            }
            (MergeAction::Skip, Some(card)) => {
                tracing::debug!(card = card.local_id, "pull skipped, local changes pending");
                (card.status == SyncStatus::LocalEdited).then_some(card.local_id)
            }
            (_, None) => None,
        };

        if let Some(card_local_id) = target {
            merge_card_relations(db, account, card_local_id, dto).await?;
        }
    }

    let known = cards
        .list_all_for_stack(stack_local_id)
        .await?
        .into_iter()
        .map(|card| (card.local_id, card.id, card.status));
    for local_id in omission_purges(known, &listed) {
        cards.purge(local_id).await?;
        summary.purged += 1;
    }
    Ok(())
}

async fn merge_card_relations(
    db: &Database,
    account: &Account,
    card_local_id: i64,
    dto: &CardDto,
) -> Result<()> {
    let cards = CardRepository::new(db.connection());
    let users = UserRepository::new(db.connection());
    let labels = LabelRepository::new(db.connection());

    let mut user_local_ids = Vec::with_capacity(dto.assigned_users.len());
    for user_dto in &dto.assigned_users {
        let user = users
            .upsert_pulled(
                account.id,
                &user_dto.uid,
                &user_dto.display_name,
                dto.last_modified_ms(),
            )
            .await?;
        user_local_ids.push(user.local_id);
    }
    cards
        .reconcile_pulled_user_assignments(card_local_id, &user_local_ids)
        .await?;

    let mut label_local_ids = Vec::with_capacity(dto.labels.len());
    for label_dto in &dto.labels {
        match labels.find_by_remote_id(account.id, label_dto.id).await? {
            Some(label) => label_local_ids.push(label.local_id),
            None => tracing::debug!(
                label = label_dto.id,
                "card references a label not known locally yet"
            ),
        }
    }
    cards
        .reconcile_pulled_label_assignments(card_local_id, &label_local_ids)
        .await?;
    Ok(())
}
