use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Forum, Result};

/// A write landed in one of the collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Any message document: creation, deletion, counters, reply lists
    Messages,
    Reactions(Uuid),
    Announcements,
    /// Per-user settings, including dismissed announcements
    Preferences(String),
}

/// Fans out change notices to every live subscription.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Change>,
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: Change) {
        // No receivers is the normal idle state
        let _ = self.tx.send(change);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// A live view that is recomputed from the store after every relevant change.
///
/// Each delivered value is a complete snapshot. Dropping the subscription
/// stops the recompute task, so views must keep it only while displayed.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T: Clone> Subscription<T> {
    /// The most recent snapshot.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the feed has stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `pred`, checking the current one first.
    pub async fn wait_for<P>(&mut self, mut pred: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let snapshot = self.rx.wait_for(|v| pred(v)).await.ok()?;
        Some(snapshot.clone())
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Forum {
    /// Start a subscription that recomputes `snapshot` whenever `relevant`
    /// matches a published change.
    ///
    /// The hub receiver is taken before the initial snapshot so no change can
    /// slip between the two. A lagged receiver recomputes, since a full
    /// snapshot covers whatever was missed. A failed recompute keeps the last
    /// delivered snapshot.
    pub(crate) async fn live<T, F, R>(
        self: &Arc<Self>,
        label: &'static str,
        relevant: R,
        snapshot: F,
    ) -> Result<Subscription<T>>
    where
        T: Send + Sync + 'static,
        F: Fn(&Forum) -> Result<T> + Clone + Send + Sync + 'static,
        R: Fn(&Change) -> bool + Send + 'static,
    {
        let mut changes = self.hub.subscribe();
        let initial = self.blocking(snapshot.clone()).await?;
        let (tx, rx) = watch::channel(initial);

        let forum = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if relevant(&change) => {}
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("{} subscription lagged by {} changes", label, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match forum.blocking(snapshot.clone()).await {
                    Ok(value) => {
                        if tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{} subscription recompute failed: {}", label, e),
                }
            }
        });

        Ok(Subscription { rx, task })
    }
}

/// Await a future with a hard deadline; test helper shared by the service modules.
#[cfg(test)]
pub(crate) async fn within<F: std::future::Future>(f: F) -> F::Output {
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("timed out waiting for subscription")
}
