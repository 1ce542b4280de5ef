//! Change notification for local-store commits
//!
//! Committed writes are fanned out as [`ChangeEvent`]s; a [`LiveQuery`]
//! keeps a store query's result continuously fresh for one subscriber and
//! stops on drop, so a stopped observer can never receive further emissions.

use std::future::Future;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::Result;

/// Kind of entity a committed write touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Board,
    Stack,
    Card,
    Label,
    User,
    /// A card↔user or card↔label relation row
    CardRelation,
}

/// A committed local-store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Account whose subtree changed
    pub account_id: i64,
    /// What kind of row changed
    pub kind: EntityKind,
}

const CHANNEL_CAPACITY: usize = 64;

/// Broadcast hub for store commits
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    /// Create a notifier with no subscribers yet
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish a committed mutation to all current subscribers
    pub fn notify(&self, account_id: i64, kind: EntityKind) {
        tracing::trace!(account_id, ?kind, "store commit");
        // no subscribers is fine
        let _ = self.tx.send(ChangeEvent { account_id, kind });
    }

    /// Subscribe to the raw event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A live, continuously updated view over a store query.
///
/// The query re-runs after every commit that matches its entity kinds and
/// account scope. Dropping the handle is the unsubscribe: the refresh task
/// is aborted and no further emissions occur.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> LiveQuery<T> {
    /// Latest emitted result set
    pub fn current(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next emission; `false` once the query has shut down
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a live query over `query`, refreshed on matching commits
pub fn live_query<T, F, Fut>(
    notifier: &ChangeNotifier,
    account_id: i64,
    kinds: Vec<EntityKind>,
    query: F,
) -> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    let (tx, rx) = watch::channel(Vec::new());
    let mut events = notifier.subscribe();

    let task = tokio::spawn(async move {
        match query().await {
            Ok(rows) => {
                let _ = tx.send(rows);
            }
            Err(error) => tracing::warn!(%error, "live query initial run failed"),
        }

        loop {
            match events.recv().await {
                Ok(event) if event.account_id == account_id && kinds.contains(&event.kind) => {}
                Ok(_) => continue,
                // after a lag we cannot know what was missed; refresh anyway
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match query().await {
                Ok(rows) => {
                    if tx.send(rows).is_err() {
                        break;
                    }
                }
                Err(error) => tracing::warn!(%error, "live query refresh failed"),
            }
        }
    });

    LiveQuery { rx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_emission<T: Clone>(query: &mut LiveQuery<T>) -> Vec<T> {
        assert!(timeout(Duration::from_secs(2), query.changed())
            .await
            .expect("emission timed out"));
        query.current()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_matching_commit_triggers_refresh() {
        let notifier = ChangeNotifier::new();
        let value = Arc::new(AtomicI64::new(1));

        let source = Arc::clone(&value);
        let mut query = live_query(&notifier, 7, vec![EntityKind::Board], move || {
            let source = Arc::clone(&source);
            async move { Ok(vec![source.load(Ordering::SeqCst)]) }
        });

        assert_eq!(next_emission(&mut query).await, vec![1]);

        value.store(2, Ordering::SeqCst);
        notifier.notify(7, EntityKind::Board);
        assert_eq!(next_emission(&mut query).await, vec![2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_foreign_commits_are_ignored() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicI64::new(0));

        let counter = Arc::clone(&runs);
        let mut query = live_query(&notifier, 7, vec![EntityKind::Board], move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0i64])
            }
        });
        assert!(timeout(Duration::from_secs(2), query.changed()).await.unwrap());

        // other account, other entity kind
        notifier.notify(8, EntityKind::Board);
        notifier.notify(7, EntityKind::Card);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drop_unsubscribes() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicI64::new(0));

        let counter = Arc::clone(&runs);
        let mut query = live_query(&notifier, 7, vec![EntityKind::Board], move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0i64])
            }
        });
        assert!(timeout(Duration::from_secs(2), query.changed()).await.unwrap());
        drop(query);

        notifier.notify(7, EntityKind::Board);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
