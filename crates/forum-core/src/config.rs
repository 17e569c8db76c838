use std::collections::HashSet;

/// Limits observed in the deployed client, exposed so deployments can tune them.
#[derive(Debug, Clone)]
pub struct ForumConfig {
    /// Upper bound on message length, counted in characters.
    pub max_message_chars: usize,
    /// Number of most recent messages delivered by the feed.
    pub feed_window: u32,
    /// Users with fewer sent messages count as new for announcement targeting.
    pub new_user_threshold: i64,
    /// Lower-cased wallet addresses allowed to moderate.
    pub moderators: HashSet<String>,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 300,
            feed_window: 100,
            new_user_threshold: 5,
            moderators: HashSet::new(),
        }
    }
}

impl ForumConfig {
    pub fn with_moderators<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.moderators = addresses
            .into_iter()
            .map(|a| normalize_address(a.as_ref()))
            .filter(|a| !a.is_empty())
            .collect();
        self
    }

    pub fn is_moderator(&self, address: &str) -> bool {
        self.moderators.contains(&normalize_address(address))
    }
}

/// Wallet addresses are hex and compared case-insensitively.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
