use clap::Subcommand;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

#[derive(Subcommand)]
pub enum StackCommand {
    /// Create a stack on a board (pushed on the next sync)
    Add {
        /// Stack title
        title: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Local board id
        #[arg(long)]
        board: i64,
        /// Position within the board
        #[arg(long, default_value = "0")]
        order: i64,
    },
    /// List stacks of a board
    List {
        /// Account name
        #[arg(long)]
        account: String,
        /// Local board id
        #[arg(long)]
        board: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a stack (synced to the server on the next sync)
    Delete {
        /// Local stack id
        stack: i64,
        /// Account name
        #[arg(long)]
        account: String,
    },
}

pub async fn run(store: &StoreService, command: StackCommand) -> Result<(), CliError> {
    match command {
        StackCommand::Add {
            title,
            account,
            board,
            order,
        } => {
            let account = resolve_account(store, &account).await?;
            let stack = store.create_stack(account.id, board, &title, order).await?;
            println!("[{}] {}", stack.local_id, stack.title);
            Ok(())
        }
        StackCommand::List {
            account,
            board,
            json,
        } => {
            resolve_account(store, &account).await?;
            let stacks = store.get_stacks_for_board(board).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stacks)?);
                return Ok(());
            }
            if stacks.is_empty() {
                println!("No stacks on board {board}.");
                return Ok(());
            }
            for stack in stacks {
                println!("[{}] {}", stack.local_id, stack.title);
            }
            Ok(())
        }
        StackCommand::Delete { stack, account } => {
            let account = resolve_account(store, &account).await?;
            store.delete_stack(account.id, stack).await?;
            println!("Deleted stack {stack}");
            Ok(())
        }
    }
}
