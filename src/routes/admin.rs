use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Admin portal surfaces, guarded by `require_admin`. User management
/// handlers additionally check the `user-management` feature.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin-portal
        // Store-wide counters.
        .route("/admin-portal", get(handlers::get_admin_dashboard))
        // GET /admin-portal/users
        .route("/admin-portal/users", get(handlers::list_users))
        // PUT /admin-portal/users/{id}/role
        // Promote or demote an account. Self-demotion is refused.
        .route("/admin-portal/users/{id}/role", put(handlers::set_user_role))
}
