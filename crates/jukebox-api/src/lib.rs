pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod preferences;
pub mod pvmsg;
pub mod sanitize;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post},
};
use serde_json::json;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// Build the HTTP router. CORS and request tracing layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/pvmsg",
            get(messages::list_private_messages).post(messages::send_private_message),
        )
        .route("/pvmsg/{id}", get(messages::get_private_message))
        .route(
            "/preferences/{name}",
            get(preferences::get_preference).put(preferences::set_preference),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
