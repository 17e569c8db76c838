use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use forum_api::auth::AppStateInner;

/// Background task that forgets senders whose rate-limit window has drained.
pub async fn run_prune_loop(state: Arc<AppStateInner>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match state.rate_limiter.prune() {
            Ok(count) => {
                if count > 0 {
                    debug!("Rate limiter: forgot {} idle senders", count);
                }
            }
            Err(e) => {
                warn!("Rate limiter prune error: {}", e);
            }
        }
    }
}
