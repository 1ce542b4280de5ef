use clap::Subcommand;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

#[derive(Subcommand)]
pub enum LabelCommand {
    /// Create a label on a board (pushed on the next sync)
    Add {
        /// Label title
        title: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Local board id
        #[arg(long)]
        board: i64,
        /// Label color as a hex string
        #[arg(long, default_value = "31cc7c")]
        color: String,
    },
    /// Search labels on a board by title substring
    Search {
        /// Search term (case-insensitive substring)
        term: String,
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
    /// Delete a label (synced to the server on the next sync)
    Delete {
        /// Local label id
        label: i64,
        /// Account name
        #[arg(long)]
        account: String,
    },
}

pub async fn run(store: &StoreService, command: LabelCommand) -> Result<(), CliError> {
    match command {
        LabelCommand::Add {
            title,
            account,
            board,
            color,
        } => {
            let account = resolve_account(store, &account).await?;
            let label = store.create_label(account.id, board, &title, &color).await?;
            println!("[{}] {} #{}", label.local_id, label.title, label.color);
            Ok(())
        }
        LabelCommand::Search {
            term,
            account,
            board,
            json,
        } => {
            let account = resolve_account(store, &account).await?;
            let labels = store.search_labels(account.id, board, &term).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&labels)?);
                return Ok(());
            }
            if labels.is_empty() {
                println!("No labels matching '{term}'.");
                return Ok(());
            }
            for label in labels {
                println!("[{}] {} #{}", label.local_id, label.title, label.color);
            }
            Ok(())
        }
        LabelCommand::Delete { label, account } => {
            let account = resolve_account(store, &account).await?;
            store.delete_label(account.id, label).await?;
            println!("Deleted label {label}");
            Ok(())
        }
    }
}
