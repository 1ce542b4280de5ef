//! End-to-end sync engine behavior against an in-memory fake server

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use tavla_core::models::{Account, SyncStatus};
use tavla_core::remote::{
    BoardDto, BoardWrite, CardDto, CardWrite, LabelDto, LabelWrite, RemoteApi, StackDto,
    StackWrite, UserDto,
};
use tavla_core::{Error, NetworkStatus, Result, StoreService, SyncEngine};

/// Server-side state the fake remote serves and mutates
#[derive(Default)]
struct ServerState {
    next_id: i64,
    boards: BTreeMap<i64, BoardDto>,
    /// board id -> stack id -> stack (cards nested)
    stacks: BTreeMap<i64, BTreeMap<i64, StackDto>>,
    fail_listings: bool,
    fail_mutations: bool,
    listing_delay_ms: u64,
    since_seen: Vec<Option<i64>>,
    calls: Vec<String>,
}

impl ServerState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_board(&mut self, title: &str) -> i64 {
        let id = self.alloc_id();
        self.boards.insert(
            id,
            BoardDto {
                id,
                title: title.to_string(),
                color: "0082c9".to_string(),
                last_modified: 1,
                labels: Vec::new(),
                users: Vec::new(),
            },
        );
        self.stacks.entry(id).or_default();
        id
    }

    fn add_label(&mut self, board_id: i64, title: &str) -> i64 {
        let id = self.alloc_id();
        if let Some(board) = self.boards.get_mut(&board_id) {
            board.labels.push(LabelDto {
                id,
                title: title.to_string(),
                color: "ff0000".to_string(),
                last_modified: 1,
            });
        }
        id
    }

    fn add_user(&mut self, board_id: i64, uid: &str, display_name: &str) {
        if let Some(board) = self.boards.get_mut(&board_id) {
            board.users.push(UserDto {
                uid: uid.to_string(),
                display_name: display_name.to_string(),
            });
        }
    }

    fn add_stack(&mut self, board_id: i64, title: &str, order: i64) -> i64 {
        let id = self.alloc_id();
        self.stacks.entry(board_id).or_default().insert(
            id,
            StackDto {
                id,
                title: title.to_string(),
                order,
                last_modified: 1,
                cards: Vec::new(),
            },
        );
        id
    }

    fn add_card(&mut self, board_id: i64, stack_id: i64, title: &str) -> i64 {
        let id = self.alloc_id();
        if let Some(stack) = self
            .stacks
            .entry(board_id)
            .or_default()
            .get_mut(&stack_id)
        {
            stack.cards.push(CardDto {
                id,
                title: title.to_string(),
                description: String::new(),
                duedate: None,
                order: 0,
                last_modified: 1,
                assigned_users: Vec::new(),
                labels: Vec::new(),
            });
        }
        id
    }

    fn card_mut(&mut self, board_id: i64, stack_id: i64, card_id: i64) -> Option<&mut CardDto> {
        self.stacks
            .get_mut(&board_id)?
            .get_mut(&stack_id)?
            .cards
            .iter_mut()
            .find(|card| card.id == card_id)
    }
}

/// Scriptable in-memory implementation of the remote gateway
#[derive(Clone)]
struct FakeRemote {
    state: Arc<Mutex<ServerState>>,
}

impl FakeRemote {
    fn new(state: ServerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn since_seen(&self) -> Vec<Option<i64>> {
        self.lock().since_seen.clone()
    }

    async fn listing_gate(&self) -> Result<()> {
        let delay = {
            let state = self.lock();
            if state.fail_listings {
                return Err(Error::Http { status: 500 });
            }
            state.listing_delay_ms
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    fn mutation_gate(&self) -> Result<()> {
        if self.lock().fail_mutations {
            return Err(Error::Http { status: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn boards(&self, _account: &Account, since: Option<i64>) -> Result<Vec<BoardDto>> {
        self.lock().since_seen.push(since);
        self.listing_gate().await?;
        Ok(self.lock().boards.values().cloned().collect())
    }

    async fn create_board(&self, _account: &Account, board: &BoardWrite) -> Result<BoardDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        let id = state.alloc_id();
        let dto = BoardDto {
            id,
            title: board.title.clone(),
            color: board.color.clone(),
            last_modified: 10,
            labels: Vec::new(),
            users: Vec::new(),
        };
        state.boards.insert(id, dto.clone());
        state.stacks.entry(id).or_default();
        state.calls.push(format!("createBoard {}", board.title));
        Ok(dto)
    }

    async fn update_board(
        &self,
        _account: &Account,
        id: i64,
        board: &BoardWrite,
    ) -> Result<BoardDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("updateBoard {id}"));
        let dto = state
            .boards
            .get_mut(&id)
            .ok_or(Error::Http { status: 404 })?;
        dto.title = board.title.clone();
        dto.color = board.color.clone();
        dto.last_modified += 1;
        Ok(dto.clone())
    }

    async fn delete_board(&self, _account: &Account, id: i64) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("deleteBoard {id}"));
        state.boards.remove(&id);
        state.stacks.remove(&id);
        Ok(())
    }

    async fn stacks(
        &self,
        _account: &Account,
        board_id: i64,
        _since: Option<i64>,
    ) -> Result<Vec<StackDto>> {
        self.listing_gate().await?;
        Ok(self
            .lock()
            .stacks
            .get(&board_id)
            .map(|stacks| stacks.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_stack(
        &self,
        _account: &Account,
        board_id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        let id = state.alloc_id();
        let dto = StackDto {
            id,
            title: stack.title.clone(),
            order: stack.order,
            last_modified: 10,
            cards: Vec::new(),
        };
        state.stacks.entry(board_id).or_default().insert(id, dto.clone());
        state.calls.push(format!("createStack {}", stack.title));
        Ok(dto)
    }

    async fn update_stack(
        &self,
        _account: &Account,
        board_id: i64,
        id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("updateStack {id}"));
        let dto = state
            .stacks
            .get_mut(&board_id)
            .and_then(|stacks| stacks.get_mut(&id))
            .ok_or(Error::Http { status: 404 })?;
        dto.title = stack.title.clone();
        dto.order = stack.order;
        dto.last_modified += 1;
        Ok(StackDto {
            cards: Vec::new(),
            ..dto.clone()
        })
    }

    async fn delete_stack(&self, _account: &Account, board_id: i64, id: i64) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("deleteStack {id}"));
        state
            .stacks
            .get_mut(&board_id)
            .and_then(|stacks| stacks.remove(&id));
        Ok(())
    }

    async fn create_card(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        card: &CardWrite,
    ) -> Result<CardDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        let id = state.alloc_id();
        let dto = CardDto {
            id,
            title: card.title.clone(),
            description: card.description.clone(),
            duedate: card.duedate.clone(),
            order: card.order,
            last_modified: 10,
            assigned_users: Vec::new(),
            labels: Vec::new(),
        };
        if let Some(stack) = state
            .stacks
            .entry(board_id)
            .or_default()
            .get_mut(&stack_id)
        {
            stack.cards.push(dto.clone());
        }
        state.calls.push(format!("createCard {}", card.title));
        Ok(dto)
    }

    async fn update_card(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
        card: &CardWrite,
    ) -> Result<CardDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("updateCard {id}"));
        let dto = state
            .card_mut(board_id, stack_id, id)
            .ok_or(Error::Http { status: 404 })?;
        dto.title = card.title.clone();
        dto.description = card.description.clone();
        dto.duedate = card.duedate.clone();
        dto.order = card.order;
        dto.last_modified += 1;
        Ok(dto.clone())
    }

    async fn delete_card(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
    ) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("deleteCard {id}"));
        if let Some(stack) = state
            .stacks
            .get_mut(&board_id)
            .and_then(|stacks| stacks.get_mut(&stack_id))
        {
            stack.cards.retain(|card| card.id != id);
        }
        Ok(())
    }

    async fn create_label(
        &self,
        _account: &Account,
        board_id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        let id = state.alloc_id();
        let dto = LabelDto {
            id,
            title: label.title.clone(),
            color: label.color.clone(),
            last_modified: 10,
        };
        if let Some(board) = state.boards.get_mut(&board_id) {
            board.labels.push(dto.clone());
        }
        state.calls.push(format!("createLabel {}", label.title));
        Ok(dto)
    }

    async fn update_label(
        &self,
        _account: &Account,
        board_id: i64,
        id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("updateLabel {id}"));
        let dto = state
            .boards
            .get_mut(&board_id)
            .and_then(|board| board.labels.iter_mut().find(|l| l.id == id))
            .ok_or(Error::Http { status: 404 })?;
        dto.title = label.title.clone();
        dto.color = label.color.clone();
        dto.last_modified += 1;
        Ok(dto.clone())
    }

    async fn delete_label(&self, _account: &Account, board_id: i64, id: i64) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("deleteLabel {id}"));
        if let Some(board) = state.boards.get_mut(&board_id) {
            board.labels.retain(|label| label.id != id);
        }
        Ok(())
    }

    async fn assign_user(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("assignUser {card_id} {uid}"));
        if let Some(card) = state.card_mut(board_id, stack_id, card_id) {
            if !card.assigned_users.iter().any(|user| user.uid == uid) {
                card.assigned_users.push(UserDto {
                    uid: uid.to_string(),
                    display_name: uid.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn unassign_user(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("unassignUser {card_id} {uid}"));
        if let Some(card) = state.card_mut(board_id, stack_id, card_id) {
            card.assigned_users.retain(|user| user.uid != uid);
        }
        Ok(())
    }

    async fn assign_label(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state.calls.push(format!("assignLabel {card_id} {label_id}"));
        let label = state
            .boards
            .get(&board_id)
            .and_then(|board| board.labels.iter().find(|l| l.id == label_id).cloned());
        if let (Some(card), Some(label)) = (state.card_mut(board_id, stack_id, card_id), label) {
            if !card.labels.iter().any(|l| l.id == label_id) {
                card.labels.push(label);
            }
        }
        Ok(())
    }

    async fn unassign_label(
        &self,
        _account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()> {
        self.mutation_gate()?;
        let mut state = self.lock();
        state
            .calls
            .push(format!("unassignLabel {card_id} {label_id}"));
        if let Some(card) = state.card_mut(board_id, stack_id, card_id) {
            card.labels.retain(|label| label.id != label_id);
        }
        Ok(())
    }
}

async fn engine_with(state: ServerState) -> (SyncEngine<FakeRemote>, FakeRemote, i64) {
    engine_with_network(state, NetworkStatus::new(true)).await
}

async fn engine_with_network(
    state: ServerState,
    network: NetworkStatus,
) -> (SyncEngine<FakeRemote>, FakeRemote, i64) {
    let store = StoreService::open_in_memory().await.unwrap();
    let account = store
        .create_account("work", "jane", "https://cloud.example.com")
        .await
        .unwrap();
    let remote = FakeRemote::new(state);
    let engine = SyncEngine::new(store, remote.clone(), Arc::new(network));
    (engine, remote, account.id)
}

#[tokio::test(flavor = "multi_thread")]
async fn first_sync_populates_store_and_advances_watermark() {
    let mut state = ServerState::default();
    let board_id = state.add_board("Roadmap");
    state.add_label(board_id, "Urgent");
    state.add_user(board_id, "jane", "Jane Doe");
    let stack_id = state.add_stack(board_id, "To do", 0);
    let card_id = state.add_card(board_id, stack_id, "Ship it");
    if let Some(card) = state.card_mut(board_id, stack_id, card_id) {
        card.assigned_users.push(UserDto {
            uid: "jane".to_string(),
            display_name: "Jane Doe".to_string(),
        });
    }

    let (engine, remote, account_id) = engine_with(state).await;
    let before = chrono::Utc::now().timestamp_millis();
    let summary = engine.synchronize(account_id).await.unwrap();

    // board + label + stack + card
    assert_eq!(summary.pulled, 4);
    assert_eq!(summary.pushed, 0);

    let store = engine.store();
    let boards = store.get_boards(account_id).await.unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].title, "Roadmap");
    assert_eq!(boards[0].status, SyncStatus::UpToDate);
    assert_eq!(boards[0].id, Some(board_id));

    let stacks = store.get_stacks_for_board(boards[0].local_id).await.unwrap();
    assert_eq!(stacks.len(), 1);
    let cards = store.get_cards_for_stack(stacks[0].local_id).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Ship it");

    let assignees = store.users_for_card(cards[0].local_id).await.unwrap();
    assert_eq!(assignees.len(), 1);
    assert_eq!(assignees[0].uid, "jane");

    // never-synced accounts pull without a since header; the watermark is
    // the pull start instant
    assert_eq!(remote.since_seen(), vec![None]);
    let account = store.get_account(account_id).await.unwrap();
    let watermark = account.last_sync.unwrap();
    assert!(watermark >= before);

    // the next pull carries the stored watermark
    engine.synchronize(account_id).await.unwrap();
    assert_eq!(remote.since_seen()[1], Some(watermark));
}

#[tokio::test(flavor = "multi_thread")]
async fn local_creates_push_and_receive_server_ids() {
    let (engine, remote, account_id) = engine_with(ServerState::default()).await;
    let store = engine.store().clone();

    let board = store
        .create_board(account_id, "Backlog", "0082c9")
        .await
        .unwrap();
    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.pushed, 1);

    let board = store.get_board(account_id, board.local_id).await.unwrap();
    assert_eq!(board.status, SyncStatus::UpToDate);
    assert!(board.id.is_some());
    assert_eq!(remote.calls(), vec!["createBoard Backlog"]);

    // children created under the fresh board push on the following pass,
    // now that the board has a server id
    let stack = store
        .create_stack(account_id, board.local_id, "To do", 0)
        .await
        .unwrap();
    let card = store
        .create_card(account_id, stack.local_id, "Ship it", 0)
        .await
        .unwrap();
    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.pushed, 2);

    let stack = store.get_stack(account_id, stack.local_id).await.unwrap();
    let card = store.get_card(account_id, card.local_id).await.unwrap();
    assert!(stack.id.is_some());
    assert!(card.id.is_some());
    assert_eq!(card.status, SyncStatus::UpToDate);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_push_leaves_row_and_id_untouched() {
    let (engine, remote, account_id) = engine_with(ServerState::default()).await;
    let store = engine.store().clone();

    let board = store
        .create_board(account_id, "Backlog", "0082c9")
        .await
        .unwrap();
    remote.lock().fail_mutations = true;

    let err = engine.synchronize(account_id).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500 }));

    let board = store.get_board(account_id, board.local_id).await.unwrap();
    assert_eq!(board.status, SyncStatus::LocalEdited);
    assert_eq!(board.id, None);

    // the pull phase completed, so the watermark did advance
    assert!(store
        .get_account(account_id)
        .await
        .unwrap()
        .last_sync
        .is_some());

    // a later pass retries the same push
    remote.lock().fail_mutations = false;
    engine.synchronize(account_id).await.unwrap();
    let board = store.get_board(account_id, board.local_id).await.unwrap();
    assert_eq!(board.status, SyncStatus::UpToDate);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_pull_leaves_watermark_untouched() {
    let mut state = ServerState::default();
    state.fail_listings = true;

    let (engine, _remote, account_id) = engine_with(state).await;
    let err = engine.synchronize(account_id).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500 }));

    let account = engine.store().get_account(account_id).await.unwrap();
    assert_eq!(account.last_sync, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn pending_local_edit_survives_conflicting_pull() {
    let mut state = ServerState::default();
    let board_id = state.add_board("Roadmap");
    let stack_id = state.add_stack(board_id, "To do", 0);
    let card_id = state.add_card(board_id, stack_id, "Server title");

    let (engine, remote, account_id) = engine_with(state).await;
    let store = engine.store().clone();
    engine.synchronize(account_id).await.unwrap();

    let boards = store.get_boards(account_id).await.unwrap();
    let stacks = store.get_stacks_for_board(boards[0].local_id).await.unwrap();
    let card = store.get_cards_for_stack(stacks[0].local_id).await.unwrap()[0].clone();

    // edit locally, then let the server change the same card
    store
        .update_card(account_id, card.local_id, "Local title", "", None, 0)
        .await
        .unwrap();
    {
        let mut server = remote.lock();
        if let Some(dto) = server.card_mut(board_id, stack_id, card_id) {
            dto.title = "Newer server title".to_string();
            dto.last_modified = 100;
        }
        // keep the push from resolving the conflict within this pass
        server.fail_mutations = true;
    }

    let err = engine.synchronize(account_id).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500 }));

    // pull merged around the dirty row: pending state and fields intact
    let card = store.get_card(account_id, card.local_id).await.unwrap();
    assert_eq!(card.title, "Local title");
    assert_eq!(card.status, SyncStatus::LocalEdited);

    // with the server healthy again the local edit wins by being pushed
    remote.lock().fail_mutations = false;
    engine.synchronize(account_id).await.unwrap();
    let card = store.get_card(account_id, card.local_id).await.unwrap();
    assert_eq!(card.status, SyncStatus::UpToDate);
    let server_title = remote
        .lock()
        .card_mut(board_id, stack_id, card_id)
        .map(|dto| dto.title.clone());
    assert_eq!(server_title.as_deref(), Some("Local title"));
}

#[tokio::test(flavor = "multi_thread")]
async fn local_tombstone_is_not_resurrected_by_pull() {
    let mut state = ServerState::default();
    let board_id = state.add_board("Roadmap");
    let stack_id = state.add_stack(board_id, "To do", 0);
    let card_id = state.add_card(board_id, stack_id, "Doomed");

    let (engine, remote, account_id) = engine_with(state).await;
    let store = engine.store().clone();
    engine.synchronize(account_id).await.unwrap();

    let boards = store.get_boards(account_id).await.unwrap();
    let stacks = store.get_stacks_for_board(boards[0].local_id).await.unwrap();
    let card = store.get_cards_for_stack(stacks[0].local_id).await.unwrap()[0].clone();

    store.delete_card(account_id, card.local_id).await.unwrap();
    remote.lock().fail_mutations = true;

    // the listing still contains the card; the tombstone must hold
    let err = engine.synchronize(account_id).await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 500 }));
    let tombstoned = store.get_card(account_id, card.local_id).await.unwrap();
    assert_eq!(tombstoned.status, SyncStatus::LocalDeleted);
    assert!(store
        .get_cards_for_stack(stacks[0].local_id)
        .await
        .unwrap()
        .is_empty());

    // once the delete round-trips the row is purged on both sides
    remote.lock().fail_mutations = false;
    engine.synchronize(account_id).await.unwrap();
    assert!(matches!(
        store.get_card(account_id, card.local_id).await,
        Err(Error::NotFound(_))
    ));
    assert!(remote
        .calls()
        .iter()
        .any(|call| call == &format!("deleteCard {card_id}")));
    assert!(remote.lock().card_mut(board_id, stack_id, card_id).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_deletion_by_omission_cascades_locally() {
    let mut state = ServerState::default();
    let board_id = state.add_board("Roadmap");
    let stack_id = state.add_stack(board_id, "To do", 0);
    let card_id = state.add_card(board_id, stack_id, "Ship it");
    if let Some(card) = state.card_mut(board_id, stack_id, card_id) {
        card.assigned_users.push(UserDto {
            uid: "jane".to_string(),
            display_name: "Jane Doe".to_string(),
        });
    }

    let (engine, remote, account_id) = engine_with(state).await;
    let store = engine.store().clone();
    engine.synchronize(account_id).await.unwrap();

    let boards = store.get_boards(account_id).await.unwrap();
    let stacks = store.get_stacks_for_board(boards[0].local_id).await.unwrap();
    let card = store.get_cards_for_stack(stacks[0].local_id).await.unwrap()[0].clone();

    // the stack disappears server-side
    remote
        .lock()
        .stacks
        .get_mut(&board_id)
        .unwrap()
        .remove(&stack_id);

    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.purged, 1);

    assert!(store
        .get_stacks_for_board(boards[0].local_id)
        .await
        .unwrap()
        .is_empty());
    // the cascade removed the card and its join rows
    assert!(matches!(
        store.get_card(account_id, card.local_id).await,
        Err(Error::NotFound(_))
    ));
    assert!(store.users_for_card(card.local_id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn relation_changes_push_as_dedicated_calls() {
    let mut state = ServerState::default();
    let board_id = state.add_board("Roadmap");
    state.add_user(board_id, "jane", "Jane Doe");
    let label_id = state.add_label(board_id, "Urgent");
    let stack_id = state.add_stack(board_id, "To do", 0);
    let card_id = state.add_card(board_id, stack_id, "Ship it");

    let (engine, remote, account_id) = engine_with(state).await;
    let store = engine.store().clone();
    engine.synchronize(account_id).await.unwrap();

    let boards = store.get_boards(account_id).await.unwrap();
    let stacks = store.get_stacks_for_board(boards[0].local_id).await.unwrap();
    let card = store.get_cards_for_stack(stacks[0].local_id).await.unwrap()[0].clone();
    let user = store.search_users(account_id, "jane").await.unwrap()[0].clone();
    let label = store
        .search_labels(account_id, boards[0].local_id, "urgent")
        .await
        .unwrap()[0]
        .clone();

    store
        .assign_user(account_id, card.local_id, user.local_id)
        .await
        .unwrap();
    store
        .assign_label(account_id, card.local_id, label.local_id)
        .await
        .unwrap();

    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.pushed, 2);
    let calls = remote.calls();
    assert!(calls.contains(&format!("assignUser {card_id} jane")));
    assert!(calls.contains(&format!("assignLabel {card_id} {label_id}")));

    // pushed relations are settled; nothing further to push
    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.pushed, 0);

    // and the unassign path round-trips too
    store
        .unassign_user(account_id, card.local_id, user.local_id)
        .await
        .unwrap();
    let summary = engine.synchronize(account_id).await.unwrap();
    assert_eq!(summary.pushed, 1);
    assert!(remote
        .calls()
        .contains(&format!("unassignUser {card_id} jane")));
    assert!(store.users_for_card(card.local_id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_push_fails_typed_without_reaching_the_server() {
    let (engine, remote, account_id) =
        engine_with_network(ServerState::default(), NetworkStatus::new(false)).await;
    let store = engine.store().clone();

    let board = store
        .create_board(account_id, "Backlog", "0082c9")
        .await
        .unwrap();

    let err = engine.synchronize(account_id).await.unwrap_err();
    assert!(matches!(err, Error::Offline));

    // nothing reached the server and the local row kept its pending state
    assert!(remote.calls().is_empty());
    let board = store.get_board(account_id, board.local_id).await.unwrap();
    assert_eq!(board.status, SyncStatus::LocalEdited);
    assert_eq!(board.id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_syncs_for_one_account_are_prevented() {
    let mut state = ServerState::default();
    state.add_board("Roadmap");
    state.listing_delay_ms = 300;

    let (engine, _remote, account_id) = engine_with(state).await;
    let engine = Arc::new(engine);

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.synchronize(account_id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = engine.synchronize(account_id).await;

    assert!(matches!(second, Err(Error::SyncInProgress(id)) if id == account_id));
    assert!(first.await.unwrap().is_ok());
}
