use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

/// Tail an account's boards, reprinting on every committed change
pub async fn run(store: &StoreService, account: &str) -> Result<(), CliError> {
    let account = resolve_account(store, account).await?;
    let mut boards = store.watch_boards(account.id);

    println!("Watching boards of '{}' (ctrl-c to stop)", account.name);
    loop {
        tokio::select! {
            changed = boards.changed() => {
                if !changed {
                    break;
                }
                let current = boards.current();
                if current.is_empty() {
                    println!("-- no boards --");
                } else {
                    for board in current {
                        println!("[{}] {}", board.local_id, board.title);
                    }
                    println!("--");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
