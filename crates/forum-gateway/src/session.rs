use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use forum_core::{Forum, Subscription};
use forum_types::events::{GatewayCommand, GatewayEvent};

/// Upper bound on reaction summaries one connection may watch at once.
pub const MAX_REACTION_SUBSCRIPTIONS: usize = 200;

/// The live views one gateway connection holds open.
///
/// Each view is a forwarding task that owns its [`Subscription`]; aborting
/// the task drops the subscription, which stops the recompute. Dropping the
/// session tears every view down.
pub struct Session {
    forum: Arc<Forum>,
    address: String,
    events: mpsc::Sender<GatewayEvent>,
    feed: Option<JoinHandle<()>>,
    announcements: Option<JoinHandle<()>>,
    reactions: HashMap<Uuid, JoinHandle<()>>,
}

impl Session {
    pub fn new(forum: Arc<Forum>, address: String, events: mpsc::Sender<GatewayEvent>) -> Self {
        Self {
            forum,
            address,
            events,
            feed: None,
            announcements: None,
            reactions: HashMap::new(),
        }
    }

    pub fn is_watching_feed(&self) -> bool {
        self.feed.is_some()
    }

    pub fn is_watching_announcements(&self) -> bool {
        self.announcements.is_some()
    }

    pub fn reaction_subscriptions(&self) -> usize {
        self.reactions.len()
    }

    pub async fn handle(&mut self, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::SubscribeFeed => {
                if self.feed.is_some() {
                    debug!("{} already watching the feed", self.address);
                    return;
                }
                match self.forum.subscribe_messages().await {
                    Ok(sub) => {
                        self.feed = Some(forward(sub, self.events.clone(), |messages| {
                            GatewayEvent::FeedSnapshot { messages }
                        }));
                    }
                    Err(e) => self.refuse(format!("feed unavailable: {}", e)).await,
                }
            }

            GatewayCommand::UnsubscribeFeed => {
                if let Some(task) = self.feed.take() {
                    task.abort();
                }
            }

            GatewayCommand::SubscribeReactions { message_id } => {
                if self.reactions.contains_key(&message_id) {
                    return;
                }
                if self.reactions.len() >= MAX_REACTION_SUBSCRIPTIONS {
                    self.refuse(format!(
                        "at most {} reaction subscriptions per connection",
                        MAX_REACTION_SUBSCRIPTIONS
                    ))
                    .await;
                    return;
                }
                match self.forum.subscribe_reactions(message_id).await {
                    Ok(sub) => {
                        let task = forward(sub, self.events.clone(), move |reactions| {
                            GatewayEvent::ReactionSnapshot {
                                message_id,
                                reactions,
                            }
                        });
                        self.reactions.insert(message_id, task);
                    }
                    Err(e) => self.refuse(format!("reactions unavailable: {}", e)).await,
                }
            }

            GatewayCommand::UnsubscribeReactions { message_id } => {
                if let Some(task) = self.reactions.remove(&message_id) {
                    task.abort();
                }
            }

            GatewayCommand::SubscribeAnnouncements => {
                if self.announcements.is_some() {
                    return;
                }
                match self.forum.subscribe_announcements(&self.address).await {
                    Ok(sub) => {
                        self.announcements = Some(forward(sub, self.events.clone(), |announcements| {
                            GatewayEvent::AnnouncementSnapshot { announcements }
                        }));
                    }
                    Err(e) => self.refuse(format!("announcements unavailable: {}", e)).await,
                }
            }

            GatewayCommand::UnsubscribeAnnouncements => {
                if let Some(task) = self.announcements.take() {
                    task.abort();
                }
            }
        }
    }

    async fn refuse(&self, message: String) {
        warn!("{}: {}", self.address, message);
        let _ = self.events.send(GatewayEvent::Error { message }).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for task in [self.feed.take(), self.announcements.take()].into_iter().flatten() {
            task.abort();
        }
        for (_, task) in self.reactions.drain() {
            task.abort();
        }
    }
}

/// Push the current snapshot, then every later one, until the connection
/// goes away or the subscription ends.
fn forward<T, E>(mut sub: Subscription<T>, events: mpsc::Sender<GatewayEvent>, to_event: E) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    E: Fn(T) -> GatewayEvent + Send + 'static,
{
    tokio::spawn(async move {
        let mut snapshot = Some(sub.current());
        while let Some(value) = snapshot {
            if events.send(to_event(value)).await.is_err() {
                break;
            }
            snapshot = sub.changed().await;
        }
    })
}
