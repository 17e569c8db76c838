pub mod announcements;
pub mod composer;
pub mod config;
pub mod error;
pub mod hub;
pub mod messages;
pub mod preferences;
pub mod rate_limit;
pub mod reactions;
pub mod reports;
pub mod users;
pub mod votes;

mod convert;

use std::sync::Arc;

use forum_db::Database;
use tracing::warn;

pub use config::ForumConfig;
pub use error::{ForumError, Result};
pub use hub::{Change, Hub, Subscription};
pub use reports::Moderator;
pub use users::Identity;

/// The forum's business logic over one document store.
///
/// Services are synchronous and block on SQLite; async callers go through
/// [`Forum::blocking`]. Each service lives in its own module as an
/// `impl Forum` block.
pub struct Forum {
    db: Database,
    hub: Hub,
    config: ForumConfig,
}

impl Forum {
    pub fn new(db: Database, config: ForumConfig) -> Self {
        Self {
            db,
            hub: Hub::new(),
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn config(&self) -> &ForumConfig {
        &self.config
    }

    /// Run a service call on the blocking pool.
    pub async fn blocking<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&Forum) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let forum = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&forum))
            .await
            .map_err(|e| ForumError::Store(anyhow::anyhow!("blocking task failed: {}", e)))?
    }
}

/// Secondary writes that must not fail the primary operation: the failure is
/// logged and dropped, and the affected field may drift.
pub(crate) fn best_effort(what: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        warn!("Best-effort {} failed: {}", what, e);
    }
}
