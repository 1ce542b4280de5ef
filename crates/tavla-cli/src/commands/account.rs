use clap::Subcommand;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

#[derive(Subcommand)]
pub enum AccountCommand {
    /// Register a server account
    Add {
        /// Unique account name
        name: String,
        /// Login name on the server
        #[arg(long)]
        user: String,
        /// Server base URL, e.g. https://cloud.example.com
        #[arg(long)]
        url: String,
    },
    /// List registered accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an account and its local data
    Remove {
        /// Account name
        name: String,
    },
}

pub async fn run(store: &StoreService, command: AccountCommand) -> Result<(), CliError> {
    match command {
        AccountCommand::Add { name, user, url } => {
            let account = store.create_account(&name, &user, &url).await?;
            println!("Added account '{}' ({})", account.name, account.url);
            Ok(())
        }
        AccountCommand::List { json } => {
            let accounts = store.list_accounts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }
            if accounts.is_empty() {
                println!("No accounts registered.");
                return Ok(());
            }
            for account in accounts {
                let synced = match account.last_sync {
                    Some(ms) => chrono::DateTime::from_timestamp_millis(ms)
                        .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339()),
                    None => "never".to_string(),
                };
                println!(
                    "{}  {}@{}  last sync: {synced}",
                    account.name, account.user_name, account.url
                );
            }
            Ok(())
        }
        AccountCommand::Remove { name } => {
            let account = resolve_account(store, &name).await?;
            store.delete_account(account.id).await?;
            println!("Removed account '{name}' and its local data");
            Ok(())
        }
    }
}
