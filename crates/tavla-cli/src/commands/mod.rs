pub mod account;
pub mod board;
pub mod card;
pub mod label;
pub mod stack;
pub mod sync;
pub mod watch;

use crate::error::CliError;
use tavla_core::{Account, StoreService};

/// Resolve an account by its unique name
pub async fn resolve_account(store: &StoreService, name: &str) -> Result<Account, CliError> {
    store
        .account_by_name(name)
        .await?
        .ok_or_else(|| CliError::AccountNotFound(name.to_string()))
}
