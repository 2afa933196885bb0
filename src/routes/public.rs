use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints any caller may hit. They read the caller's session when there is
/// one but never require it.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /session
        // Session, role, features and home path for navigation rendering.
        .route("/session", get(handlers::get_session))
        // GET /landing?path=...&from_public_link=...
        // Landing Redirector decision for the path the frontend is showing.
        .route("/landing", get(handlers::get_landing))
        // GET /access/{feature}
        // Single feature check; unknown features deny.
        .route("/access/{feature}", get(handlers::get_feature_access))
        // POST /auth/sign-out
        // Revokes the bearer token at the identity provider.
        .route("/auth/sign-out", post(handlers::sign_out))
}
