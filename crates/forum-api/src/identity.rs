//! Wallet sign-in against the external identity provider.
//!
//! The provider checks the wallet signature and knows the account's handle,
//! avatar and proof-of-personhood status. Without a provider URL the server
//! trusts whatever the client sends, which is only fit for development.

use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use forum_core::Identity;
use forum_core::config::normalize_address;
use forum_types::api::WalletLoginRequest;

use crate::error::ApiError;

#[derive(Serialize)]
struct VerifyRequest<'a> {
    address: &'a str,
    message: &'a str,
    signature: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    profile_picture_url: Option<String>,
}

#[derive(Deserialize)]
struct VerificationStatus {
    is_orb_verified: bool,
}

pub struct IdentityProvider {
    remote: Option<Remote>,
}

struct Remote {
    client: reqwest::Client,
    base_url: Url,
}

impl IdentityProvider {
    /// Provider at `base_url`, or trusted mode when there is none.
    pub fn new(base_url: Option<String>) -> anyhow::Result<Self> {
        let Some(raw) = base_url else {
            return Ok(Self::trusted());
        };
        let base_url = Url::parse(&raw).with_context(|| format!("invalid identity provider URL '{}'", raw))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("identity provider URL '{}' cannot carry a path", raw);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building identity provider client")?;
        Ok(Self {
            remote: Some(Remote { client, base_url }),
        })
    }

    /// Accept the client's claims without checking them.
    pub fn trusted() -> Self {
        Self { remote: None }
    }

    pub fn is_trusted(&self) -> bool {
        self.remote.is_none()
    }

    pub async fn verify(&self, req: &WalletLoginRequest) -> Result<Identity, ApiError> {
        let Some(remote) = &self.remote else {
            warn!("No identity provider configured, trusting wallet claims for {}", req.address);
            return Ok(Identity {
                address: req.address.clone(),
                username: req.username.clone(),
                profile_picture_url: req.profile_picture_url.clone(),
                is_orb_verified: req.is_orb_verified.unwrap_or(false),
            });
        };

        let verdict: VerifyResponse = remote
            .client
            .post(remote.endpoint(&["verify"]))
            .json(&VerifyRequest {
                address: &req.address,
                message: &req.message,
                signature: &req.signature,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::IdentityProvider(e.to_string()))?
            .json()
            .await
            .map_err(|e| ApiError::IdentityProvider(e.to_string()))?;

        if !verdict.valid {
            debug!("Signature rejected for {}", req.address);
            return Err(ApiError::Unauthorized);
        }

        let address = normalize_address(&req.address);
        Ok(Identity {
            is_orb_verified: remote.orb_verified(&address).await,
            address,
            username: verdict.username,
            profile_picture_url: verdict.profile_picture_url,
        })
    }
}

impl Remote {
    /// `base_url` with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked at construction
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Verification lookups that fail leave the user unverified.
    async fn orb_verified(&self, address: &str) -> bool {
        let status = async {
            self.client
                .get(self.endpoint(&["verification", address]))
                .send()
                .await?
                .error_for_status()?
                .json::<VerificationStatus>()
                .await
        };
        match status.await {
            Ok(s) => s.is_orb_verified,
            Err(e) => {
                warn!("Verification lookup for {} failed: {}", address, e);
                false
            }
        }
    }
}
