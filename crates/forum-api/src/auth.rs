use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use forum_core::Forum;
use forum_core::rate_limit::RateLimiter;
use forum_types::api::{Claims, LoginResponse, WalletLoginRequest};
use forum_types::models::User;

use crate::error::ApiError;
use crate::identity::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub forum: Arc<Forum>,
    pub rate_limiter: RateLimiter,
    pub identity: IdentityProvider,
    pub jwt_secret: String,
}

/// Exchange a signed wallet payload for a session token.
///
/// The identity provider checks the signature and supplies the handle and
/// verification status; the user record is created or refreshed from that.
pub async fn wallet_login(
    State(state): State<AppState>,
    Json(req): Json<WalletLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state.identity.verify(&req).await?;

    let user = state
        .forum
        .blocking(move |forum| forum.login_user(&identity))
        .await?;

    let token = create_token(&state.jwt_secret, &user.address, &user.username)
        .map_err(forum_core::ForumError::from)?;

    info!("{} ({}) signed in", user.username, user.address);
    Ok(Json(LoginResponse { token, user }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(current_user(&state, &claims).await?))
}

/// The stored user behind a session. A token for an address with no user
/// record is treated as unauthenticated.
pub(crate) async fn current_user(state: &AppState, claims: &Claims) -> Result<User, ApiError> {
    let address = claims.sub.clone();
    state
        .forum
        .blocking(move |forum| forum.get_user(&address))
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub fn create_token(secret: &str, address: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: address.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
