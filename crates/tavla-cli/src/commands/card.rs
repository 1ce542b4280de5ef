use clap::Subcommand;

use super::resolve_account;
use crate::error::CliError;
use tavla_core::StoreService;

#[derive(Subcommand)]
pub enum CardCommand {
    /// Create a card in a stack (pushed on the next sync)
    Add {
        /// Card title
        title: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Local stack id
        #[arg(long)]
        stack: i64,
        /// Description text
        #[arg(long, default_value = "")]
        description: String,
        /// Due date as RFC 3339
        #[arg(long)]
        due: Option<String>,
        /// Position within the stack
        #[arg(long, default_value = "0")]
        order: i64,
    },
    /// List cards of a stack
    List {
        /// Account name
        #[arg(long)]
        account: String,
        /// Local stack id
        #[arg(long)]
        stack: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a card's fields
    Edit {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
        /// New title
        #[arg(long)]
        title: String,
        /// New description
        #[arg(long, default_value = "")]
        description: String,
        /// Due date as RFC 3339 (omit to clear)
        #[arg(long)]
        due: Option<String>,
        /// Position within the stack
        #[arg(long, default_value = "0")]
        order: i64,
    },
    /// Delete a card (synced to the server on the next sync)
    Delete {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
    },
    /// Assign a user to a card
    Assign {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
        /// Server uid of the user
        #[arg(long)]
        user: String,
    },
    /// Unassign a user from a card
    Unassign {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
        /// Server uid of the user
        #[arg(long)]
        user: String,
    },
    /// Attach a label to a card
    Tag {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
        /// Label title (substring match on the card's board)
        #[arg(long)]
        label: String,
    },
    /// Detach a label from a card
    Untag {
        /// Local card id
        card: i64,
        /// Account name
        #[arg(long)]
        account: String,
        /// Label title (substring match on the card's board)
        #[arg(long)]
        label: String,
    },
}

pub async fn run(store: &StoreService, command: CardCommand) -> Result<(), CliError> {
    match command {
        CardCommand::Add {
            title,
            account,
            stack,
            description,
            due,
            order,
        } => {
            let account = resolve_account(store, &account).await?;
            let card = store.create_card(account.id, stack, &title, order).await?;
            let due_date = parse_due(due.as_deref())?;
            if !description.is_empty() || due_date.is_some() {
                store
                    .update_card(
                        account.id,
                        card.local_id,
                        &title,
                        &description,
                        due_date,
                        order,
                    )
                    .await?;
            }
            println!("[{}] {}", card.local_id, card.title);
            Ok(())
        }
        CardCommand::List {
            account,
            stack,
            json,
        } => {
            resolve_account(store, &account).await?;
            let cards = store.get_cards_for_stack(stack).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
                return Ok(());
            }
            if cards.is_empty() {
                println!("No cards in stack {stack}.");
                return Ok(());
            }
            for card in cards {
                let assignees = store.users_for_card(card.local_id).await?;
                let names: Vec<&str> = assignees.iter().map(|u| u.uid.as_str()).collect();
                let suffix = if names.is_empty() {
                    String::new()
                } else {
                    format!("  @{}", names.join(" @"))
                };
                println!("[{}] {}{suffix}", card.local_id, card.title);
            }
            Ok(())
        }
        CardCommand::Edit {
            card,
            account,
            title,
            description,
            due,
            order,
        } => {
            let account = resolve_account(store, &account).await?;
            let due_date = parse_due(due.as_deref())?;
            let card = store
                .update_card(account.id, card, &title, &description, due_date, order)
                .await?;
            println!("[{}] {}", card.local_id, card.title);
            Ok(())
        }
        CardCommand::Delete { card, account } => {
            let account = resolve_account(store, &account).await?;
            store.delete_card(account.id, card).await?;
            println!("Deleted card {card}");
            Ok(())
        }
        CardCommand::Assign {
            card,
            account,
            user,
        } => {
            let account = resolve_account(store, &account).await?;
            let target = find_user(store, account.id, &user).await?;
            store.assign_user(account.id, card, target).await?;
            println!("Assigned {user} to card {card}");
            Ok(())
        }
        CardCommand::Unassign {
            card,
            account,
            user,
        } => {
            let account = resolve_account(store, &account).await?;
            let target = find_user(store, account.id, &user).await?;
            store.unassign_user(account.id, card, target).await?;
            println!("Unassigned {user} from card {card}");
            Ok(())
        }
        CardCommand::Tag {
            card,
            account,
            label,
        } => {
            let account = resolve_account(store, &account).await?;
            let target = find_label(store, account.id, card, &label).await?;
            store.assign_label(account.id, card, target).await?;
            println!("Tagged card {card} with '{label}'");
            Ok(())
        }
        CardCommand::Untag {
            card,
            account,
            label,
        } => {
            let account = resolve_account(store, &account).await?;
            let target = find_label(store, account.id, card, &label).await?;
            store.unassign_label(account.id, card, target).await?;
            println!("Untagged '{label}' from card {card}");
            Ok(())
        }
    }
}

fn parse_due(due: Option<&str>) -> Result<Option<i64>, CliError> {
    match due {
        None => Ok(None),
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|date| Some(date.timestamp_millis()))
            .map_err(|_| CliError::InvalidDueDate(raw.to_string())),
    }
}

async fn find_user(store: &StoreService, account_id: i64, uid: &str) -> Result<i64, CliError> {
    let matches = store.search_users(account_id, uid).await?;
    matches
        .iter()
        .find(|user| user.uid == uid)
        .or_else(|| matches.first())
        .map(|user| user.local_id)
        .ok_or_else(|| CliError::UserNotFound(uid.to_string()))
}

async fn find_label(
    store: &StoreService,
    account_id: i64,
    card_local_id: i64,
    title: &str,
) -> Result<i64, CliError> {
    let card = store.get_card(account_id, card_local_id).await?;
    let stack = store.get_stack(account_id, card.stack_local_id).await?;
    let matches = store
        .search_labels(account_id, stack.board_local_id, title)
        .await?;
    matches
        .first()
        .map(|label| label.local_id)
        .ok_or_else(|| CliError::LabelNotFound(title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_due_accepts_rfc3339() {
        let due = parse_due(Some("2026-03-01T12:00:00+00:00")).unwrap();
        assert_eq!(due, Some(1_772_366_400_000));
        assert_eq!(parse_due(None).unwrap(), None);
    }

    #[test]
    fn parse_due_rejects_garbage() {
        assert!(matches!(
            parse_due(Some("next tuesday")),
            Err(CliError::InvalidDueDate(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn find_label_matches_on_the_cards_board() {
        let store = StoreService::open_in_memory().await.unwrap();
        let account = store
            .create_account("work", "jane", "https://cloud.example.com")
            .await
            .unwrap();
        let board = store
            .create_board(account.id, "Roadmap", "0082c9")
            .await
            .unwrap();
        let stack = store
            .create_stack(account.id, board.local_id, "To do", 0)
            .await
            .unwrap();
        let card = store
            .create_card(account.id, stack.local_id, "Task", 0)
            .await
            .unwrap();
        let label = store
            .create_label(account.id, board.local_id, "Urgent", "ff0000")
            .await
            .unwrap();

        let found = find_label(&store, account.id, card.local_id, "urg")
            .await
            .unwrap();
        assert_eq!(found, label.local_id);

        assert!(matches!(
            find_label(&store, account.id, card.local_id, "missing").await,
            Err(CliError::LabelNotFound(_))
        ));
    }
}
