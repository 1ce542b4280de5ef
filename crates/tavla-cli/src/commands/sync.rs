use std::sync::Arc;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::remote::HttpRemote;
use tavla_core::{NetworkStatus, StoreService, SyncEngine};

pub async fn run(store: &StoreService, account: &str, offline: bool) -> Result<(), CliError> {
    let account = resolve_account(store, account).await?;

    let network = Arc::new(NetworkStatus::new(!offline));
    let mut remote = HttpRemote::new(network.clone())?;
    if let Ok(password) = std::env::var("TAVLA_APP_PASSWORD") {
        remote = remote.with_app_password(password);
    }

    let engine = SyncEngine::new(store.clone(), remote, network);
    let summary = engine.synchronize(account.id).await?;

    println!(
        "Sync completed: {} pulled, {} pushed, {} removed",
        summary.pulled, summary.pushed, summary.purged
    );
    Ok(())
}
