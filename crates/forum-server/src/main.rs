mod cleanup;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use forum_api::auth::{AppState, AppStateInner};
use forum_api::identity::IdentityProvider;
use forum_api::middleware::decode_token;
use forum_core::Forum;
use forum_core::rate_limit::RateLimiter;
use forum_gateway::connection;

use crate::config::ServerConfig;

#[derive(Deserialize)]
struct GatewayQuery {
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum=debug,forum_core=debug,forum_api=debug,forum_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    let db = forum_db::Database::open(&config.db_path)?;
    let forum = Arc::new(Forum::new(db, config.forum.clone()));

    if forum.seed_welcome_announcement()? {
        info!("Seeded welcome announcement");
    }

    let identity = IdentityProvider::new(config.identity_url.clone())?;
    if identity.is_trusted() {
        warn!("FORUM_IDENTITY_URL is unset: wallet claims are accepted without verification");
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        forum,
        rate_limiter: RateLimiter::new(config.rate_limit),
        identity,
        jwt_secret: config.jwt_secret.clone(),
    });

    tokio::spawn(cleanup::run_prune_loop(state.clone(), 300));

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(forum_api::router(state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Forum server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Browsers cannot set headers on a WebSocket handshake, so the session
/// token rides in the query string and is checked before upgrading.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let Some(claims) = decode_token(&state.jwt_secret, &query.token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let forum = state.forum.clone();
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, forum, claims.sub, claims.username)
    })
}
