use clap::Subcommand;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

#[derive(Subcommand)]
pub enum BoardCommand {
    /// Create a board (pushed on the next sync)
    Add {
        /// Board title
        title: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Board color as a hex string
        #[arg(long, default_value = "0082c9")]
        color: String,
    },
    /// List boards of an account
    List {
        /// Account name
        #[arg(long)]
        account: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a board (synced to the server on the next sync)
    Delete {
        /// Local board id
        board: i64,
        /// Account name
        #[arg(long)]
        account: String,
    },
}

pub async fn run(store: &StoreService, command: BoardCommand) -> Result<(), CliError> {
    match command {
        BoardCommand::Add {
            title,
            account,
            color,
        } => {
            let account = resolve_account(store, &account).await?;
            let board = store.create_board(account.id, &title, &color).await?;
            println!("[{}] {}", board.local_id, board.title);
            Ok(())
        }
        BoardCommand::List { account, json } => {
            let account = resolve_account(store, &account).await?;
            let boards = store.get_boards(account.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&boards)?);
                return Ok(());
            }
            if boards.is_empty() {
                println!("No boards. Create one with `tavla board add` or run `tavla sync`.");
                return Ok(());
            }
            for board in boards {
                let synced = if board.id.is_some() { "" } else { "  (local only)" };
                println!("[{}] {}{synced}", board.local_id, board.title);
            }
            Ok(())
        }
        BoardCommand::Delete { board, account } => {
            let account = resolve_account(store, &account).await?;
            store.delete_board(account.id, board).await?;
            println!("Deleted board {board}");
            Ok(())
        }
    }
}
