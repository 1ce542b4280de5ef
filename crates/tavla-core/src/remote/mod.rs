//! Remote gateway for the server API

mod dto;
mod http;

pub use dto::{
    BoardDto, BoardWrite, CardDto, CardWrite, LabelDto, LabelWrite, StackDto, StackWrite, UserDto,
};
pub use http::HttpRemote;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Account;

/// One method per (entity type × operation) pair of the server API.
///
/// Listing calls take the caller's watermark (epoch ms) and may return only
/// rows changed since it. No call retries on failure; retry policy belongs to
/// the sync engine's caller. Mutating calls fail with [`crate::Error::Offline`]
/// before any I/O when the device has no connectivity.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    // ## Boards
    async fn boards(&self, account: &Account, since: Option<i64>) -> Result<Vec<BoardDto>>;
    async fn create_board(&self, account: &Account, board: &BoardWrite) -> Result<BoardDto>;
    async fn update_board(&self, account: &Account, id: i64, board: &BoardWrite)
        -> Result<BoardDto>;
    async fn delete_board(&self, account: &Account, id: i64) -> Result<()>;

    // ## Stacks
    async fn stacks(
        &self,
        account: &Account,
        board_id: i64,
        since: Option<i64>,
    ) -> Result<Vec<StackDto>>;
    async fn create_stack(
        &self,
        account: &Account,
        board_id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto>;
    async fn update_stack(
        &self,
        account: &Account,
        board_id: i64,
        id: i64,
        stack: &StackWrite,
    ) -> Result<StackDto>;
    async fn delete_stack(&self, account: &Account, board_id: i64, id: i64) -> Result<()>;

    // ## Cards
    async fn create_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card: &CardWrite,
    ) -> Result<CardDto>;
    async fn update_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
        card: &CardWrite,
    ) -> Result<CardDto>;
    async fn delete_card(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        id: i64,
    ) -> Result<()>;

    // ## Labels
    async fn create_label(
        &self,
        account: &Account,
        board_id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto>;
    async fn update_label(
        &self,
        account: &Account,
        board_id: i64,
        id: i64,
        label: &LabelWrite,
    ) -> Result<LabelDto>;
    async fn delete_label(&self, account: &Account, board_id: i64, id: i64) -> Result<()>;

    // ## Card relations (idempotent)
    async fn assign_user(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()>;
    async fn unassign_user(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        uid: &str,
    ) -> Result<()>;
    async fn assign_label(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()>;
    async fn unassign_label(
        &self,
        account: &Account,
        board_id: i64,
        stack_id: i64,
        card_id: i64,
        label_id: i64,
    ) -> Result<()>;
}
