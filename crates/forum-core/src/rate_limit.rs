//! Per-user send allowance.
//!
//! Each accepted send occupies one slot for `window`; once `ceiling` slots
//! are taken further sends are refused and a notice blocks input for
//! `notice`. This is a courtesy limit. It keeps one chatty session in check
//! but is no defence against a determined client.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use forum_types::api::RateLimitStatus;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{ForumError, Result};

#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Sends allowed inside one window.
    pub ceiling: u32,
    /// How long each send counts against the allowance.
    pub window: Duration,
    /// How long input stays blocked after a refused send.
    pub notice: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ceiling: 5,
            window: Duration::from_secs(60),
            notice: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Default)]
struct Allowance {
    /// Times of accepted sends still inside the window, oldest first.
    sends: VecDeque<Instant>,
    notice_until: Option<Instant>,
}

impl Allowance {
    fn expire(&mut self, now: Instant, window: Duration) {
        while self.sends.front().is_some_and(|&t| now.duration_since(t) >= window) {
            self.sends.pop_front();
        }
        if self.notice_until.is_some_and(|until| now >= until) {
            self.notice_until = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.sends.is_empty() && self.notice_until.is_none()
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    users: Mutex<HashMap<String, Allowance>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Take one slot of the allowance for a send about to be attempted.
    ///
    /// The ceiling check and the slot are one step under the lock, so
    /// concurrent sends cannot all pass before any is counted. Refused while
    /// a notice is showing or once the window is full; a refusal (re)starts
    /// the notice. A send that then fails hands its slot back with
    /// [`RateLimiter::release`].
    pub fn reserve(&self, user: &str) -> Result<()> {
        let now = Instant::now();
        let mut users = self.lock()?;
        let allowance = users.entry(user.to_string()).or_default();
        allowance.expire(now, self.config.window);

        if let Some(until) = allowance.notice_until {
            return Err(ForumError::RateLimited {
                notice: until.saturating_duration_since(now),
            });
        }
        if allowance.sends.len() >= self.config.ceiling as usize {
            allowance.notice_until = Some(now + self.config.notice);
            debug!("Rate limited {} ({} sends in window)", user, allowance.sends.len());
            return Err(ForumError::RateLimited {
                notice: self.config.notice,
            });
        }
        allowance.sends.push_back(now);
        Ok(())
    }

    /// Return the most recent reservation after the send failed.
    pub fn release(&self, user: &str) {
        match self.lock() {
            Ok(mut users) => {
                if let Some(allowance) = users.get_mut(user) {
                    allowance.sends.pop_back();
                }
            }
            Err(e) => warn!("Rate limiter unavailable, slot of {} not released: {}", user, e),
        }
    }

    pub fn status(&self, user: &str) -> Result<RateLimitStatus> {
        let now = Instant::now();
        let mut users = self.lock()?;
        let (used, notice_active) = match users.get_mut(user) {
            Some(allowance) => {
                allowance.expire(now, self.config.window);
                (allowance.sends.len() as u32, allowance.notice_until.is_some())
            }
            None => (0, false),
        };
        Ok(RateLimitStatus {
            ceiling: self.config.ceiling,
            remaining: self.config.ceiling.saturating_sub(used),
            notice_active,
        })
    }

    /// Drop users whose window has fully drained.
    pub fn prune(&self) -> Result<usize> {
        let now = Instant::now();
        let mut users = self.lock()?;
        let before = users.len();
        users.retain(|_, allowance| {
            allowance.expire(now, self.config.window);
            !allowance.is_idle()
        });
        Ok(before - users.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Allowance>>> {
        self.users
            .lock()
            .map_err(|e| ForumError::Store(anyhow::anyhow!("rate limiter lock poisoned: {}", e)))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(limiter: &RateLimiter, user: &str) -> Result<()> {
        limiter.reserve(user)
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_send_waits_for_the_window() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            send(&limiter, "0xa11ce").unwrap();
        }

        match send(&limiter, "0xa11ce") {
            Err(ForumError::RateLimited { notice }) => assert_eq!(notice, Duration::from_secs(3)),
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert!(limiter.status("0xa11ce").unwrap().notice_active);

        // Other sessions are unaffected
        send(&limiter, "0xb0b").unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        send(&limiter, "0xa11ce").unwrap();
        let status = limiter.status("0xa11ce").unwrap();
        assert_eq!(status.remaining, 4);
        assert!(!status.notice_active);
    }

    #[tokio::test(start_paused = true)]
    async fn notice_blocks_input_even_after_a_slot_frees() {
        let limiter = RateLimiter::new(RateLimitConfig {
            ceiling: 1,
            window: Duration::from_secs(2),
            notice: Duration::from_secs(3),
        });
        send(&limiter, "u").unwrap();
        assert!(send(&limiter, "u").is_err());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(send(&limiter, "u"), Err(ForumError::RateLimited { .. })));

        tokio::time::advance(Duration::from_secs(1)).await;
        send(&limiter, "u").unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn allowance_recovers_one_slot_at_a_time() {
        let limiter = RateLimiter::default();
        send(&limiter, "u").unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..4 {
            send(&limiter, "u").unwrap();
        }
        assert_eq!(limiter.status("u").unwrap().remaining, 0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.status("u").unwrap().remaining, 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(limiter.prune().unwrap(), 1);
        assert_eq!(limiter.status("u").unwrap().remaining, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn released_slots_are_not_counted() {
        let limiter = RateLimiter::default();
        send(&limiter, "u").unwrap();
        send(&limiter, "u").unwrap();
        limiter.release("u");
        assert_eq!(limiter.status("u").unwrap().remaining, 4);

        // Releasing for an unknown user is a no-op
        limiter.release("0xnobody");
        assert_eq!(limiter.status("0xnobody").unwrap().remaining, 5);
    }

    #[test]
    fn parallel_reservations_stop_at_the_ceiling() {
        let limiter = std::sync::Arc::new(RateLimiter::default());
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(20));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    limiter.reserve("u").is_ok()
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 5);
    }
}
