use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

use forum_core::ForumConfig;
use forum_core::rate_limit::RateLimitConfig;

/// Placeholder JWT secrets that are never accepted as-is.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "forum-dev-secret";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub identity_url: Option<String>,
    pub forum: ForumConfig,
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = match var("FORUM_JWT_SECRET") {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.as_str()) => secret,
            _ => {
                warn!("FORUM_JWT_SECRET is unset or a placeholder, using the development secret");
                DEV_SECRET.to_string()
            }
        };

        let port: u16 = var("FORUM_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("FORUM_PORT")?;

        let mut forum = ForumConfig::default();
        if let Some(list) = var("FORUM_MODERATORS") {
            forum = forum.with_moderators(list.split(','));
        }
        if let Some(max) = var("FORUM_MAX_MESSAGE_CHARS") {
            forum.max_message_chars = max.parse().context("FORUM_MAX_MESSAGE_CHARS")?;
        }

        let mut rate_limit = RateLimitConfig::default();
        if let Some(ceiling) = var("FORUM_RATE_LIMIT") {
            rate_limit.ceiling = ceiling.parse().context("FORUM_RATE_LIMIT")?;
        }
        if let Some(secs) = var("FORUM_RATE_WINDOW_SECS") {
            rate_limit.window = Duration::from_secs(secs.parse().context("FORUM_RATE_WINDOW_SECS")?);
        }

        Ok(Self {
            host: var("FORUM_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("FORUM_DB_PATH").unwrap_or_else(|| "forum.db".into()).into(),
            jwt_secret,
            identity_url: var("FORUM_IDENTITY_URL"),
            forum,
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("forum.db"));
        assert_eq!(config.jwt_secret, DEV_SECRET);
        assert!(config.identity_url.is_none());
        assert_eq!(config.forum.max_message_chars, 300);
        assert_eq!(config.rate_limit.ceiling, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("FORUM_PORT", "8080"),
            ("FORUM_JWT_SECRET", "a-real-secret"),
            ("FORUM_MODERATORS", "0xABC, 0xdef ,"),
            ("FORUM_RATE_LIMIT", "10"),
            ("FORUM_RATE_WINDOW_SECS", "30"),
            ("FORUM_IDENTITY_URL", "https://id.example"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, "a-real-secret");
        assert!(config.forum.is_moderator("0xabc"));
        assert!(config.forum.is_moderator("0xDEF"));
        assert_eq!(config.forum.moderators.len(), 2);
        assert_eq!(config.rate_limit.ceiling, 10);
        assert_eq!(config.rate_limit.window, Duration::from_secs(30));
        assert_eq!(config.identity_url.as_deref(), Some("https://id.example"));
    }

    #[test]
    fn placeholder_secret_falls_back() {
        let config = config(&[("FORUM_JWT_SECRET", "dev-secret-change-me")]).unwrap();
        assert_eq!(config.jwt_secret, DEV_SECRET);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(config(&[("FORUM_PORT", "http")]).is_err());
        assert!(config(&[("FORUM_RATE_LIMIT", "-1")]).is_err());
    }
}
