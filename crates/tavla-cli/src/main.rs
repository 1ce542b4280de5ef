//! Tavla CLI - offline-first kanban boards from the terminal

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use error::CliError;
use tavla_core::StoreService;

#[derive(Parser)]
#[command(name = "tavla")]
#[command(about = "Offline-first kanban boards from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to the local database file
    #[arg(long, value_name = "PATH", global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage server accounts
    Account {
        #[command(subcommand)]
        command: commands::account::AccountCommand,
    },
    /// Manage boards
    Board {
        #[command(subcommand)]
        command: commands::board::BoardCommand,
    },
    /// Manage stacks within a board
    Stack {
        #[command(subcommand)]
        command: commands::stack::StackCommand,
    },
    /// Manage cards within a stack
    Card {
        #[command(subcommand)]
        command: commands::card::CardCommand,
    },
    /// Manage labels within a board
    Label {
        #[command(subcommand)]
        command: commands::label::LabelCommand,
    },
    /// Reconcile an account with its server
    Sync {
        /// Account name
        #[arg(long)]
        account: String,
        /// Treat the device as disconnected (pushes fail fast)
        #[arg(long)]
        offline: bool,
    },
    /// Tail an account's boards as they change
    Watch {
        /// Account name
        #[arg(long)]
        account: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let db_path = resolve_db_path(cli.db_path)?;
    tracing::debug!(path = %db_path.display(), "opening local store");
    let store = StoreService::open_path(&db_path).await?;

    match cli.command {
        Commands::Account { command } => commands::account::run(&store, command).await,
        Commands::Board { command } => commands::board::run(&store, command).await,
        Commands::Stack { command } => commands::stack::run(&store, command).await,
        Commands::Card { command } => commands::card::run(&store, command).await,
        Commands::Label { command } => commands::label::run(&store, command).await,
        Commands::Sync { account, offline } => {
            commands::sync::run(&store, &account, offline).await
        }
        Commands::Watch { account } => commands::watch::run(&store, &account).await,
    }
}

fn resolve_db_path(override_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = override_path {
        return Ok(path);
    }
    if let Ok(path) = std::env::var("TAVLA_DB_PATH") {
        return Ok(PathBuf::from(path));
    }
    dirs::data_dir()
        .map(|dir| dir.join("tavla").join("tavla.db"))
        .ok_or(CliError::NoDataDir)
}
