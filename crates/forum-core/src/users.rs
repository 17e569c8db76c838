use chrono::Utc;
use forum_db::format_timestamp;
use forum_db::models::UserRow;
use forum_types::models::User;
use tracing::info;

use crate::config::normalize_address;
use crate::{Forum, ForumError, Result, convert};

/// What the identity provider vouches for after a wallet login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub address: String,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_orb_verified: bool,
}

impl Forum {
    /// Create the user on first authentication, otherwise refresh the
    /// identity fields and `last_seen`.
    pub fn login_user(&self, identity: &Identity) -> Result<User> {
        let address = normalize_address(&identity.address);
        if address.is_empty() {
            return Err(ForumError::invalid("missing wallet address"));
        }

        let username = identity
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| short_address(&address));
        let now = format_timestamp(Utc::now());

        let created = self.db.upsert_user(&UserRow {
            address: address.clone(),
            username: username.clone(),
            is_orb_verified: identity.is_orb_verified,
            profile_picture_url: identity.profile_picture_url.clone(),
            created_at: now.clone(),
            last_seen: now,
            message_count: 0,
            reputation: 0,
        })?;
        if created {
            info!("New user {} ({})", username, address);
        }

        self.get_user(&address)?.ok_or(ForumError::NotFound("user"))
    }

    pub fn get_user(&self, address: &str) -> Result<Option<User>> {
        Ok(self.db.get_user(&normalize_address(address))?.map(convert::user))
    }
}

/// Fallback handle for wallets without a username: `0x1234…abcd`.
fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
