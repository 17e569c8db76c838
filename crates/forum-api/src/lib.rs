pub mod announcements;
pub mod auth;
pub mod error;
pub mod identity;
pub mod messages;
pub mod middleware;
pub mod moderation;
pub mod preferences;
pub mod reactions;
pub mod reports;
pub mod votes;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};

use auth::AppState;

/// All REST routes. Everything except wallet login sits behind the JWT
/// middleware; moderator routes additionally check the moderator list.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/wallet", post(auth::wallet_login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/messages", get(messages::list_messages).post(messages::send_message))
        .route("/messages/{message_id}", get(messages::get_message))
        .route("/messages/{message_id}/vote", get(votes::get_vote).post(votes::vote))
        .route(
            "/messages/{message_id}/reactions",
            get(reactions::get_reactions).post(reactions::toggle_reaction),
        )
        .route("/messages/{message_id}/reports", post(reports::create_report))
        .route("/announcements", get(announcements::active_announcements))
        .route(
            "/announcements/{announcement_id}/dismiss",
            post(announcements::dismiss_announcement),
        )
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_display),
        )
        .route("/preferences/last-read", put(preferences::update_last_read))
        .route("/rate-limit", get(messages::rate_limit_status))
        .route("/mod/reports", get(moderation::list_reports))
        .route("/mod/reports/{report_id}", put(moderation::update_report))
        .route("/mod/messages/flagged", get(moderation::flagged_messages))
        .route("/mod/messages/{message_id}", delete(moderation::delete_message))
        .route("/mod/announcements", post(moderation::create_announcement))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
