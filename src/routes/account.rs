use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Account Home Router
///
/// `GET /account`, guarded by `require_signed_in`. The Landing Redirector
/// sends every verified session without an admin or baker role here,
/// including one whose role is unresolved, so this surface must not demand
/// a role or the two would bounce the visitor between `/` and `/account`.
pub fn account_home_routes() -> Router<AppState> {
    Router::new()
        // GET /account
        // Profile, role, features and open order count. Empty features without a role.
        .route("/account", get(handlers::get_account))
}

/// Account Router Module
///
/// Customer surfaces. Guarded by `require_user`: a verified session with any
/// role. Order detail lives here too so that a baker following a link to
/// `/orders/{id}` is admitted by the same tier check.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        // PUT /account/profile
        // Owner edits their display name (`profile-edit`).
        .route("/account/profile", put(handlers::update_profile))
        // GET /account/orders
        // Caller's own orders (`order-history`).
        .route("/account/orders", get(handlers::get_my_orders))
        // GET /orders/{id}
        // Owner or order managers only; anyone else sees 404.
        .route("/orders/{id}", get(handlers::get_order_detail))
}
