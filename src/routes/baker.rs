use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Baker Router Module
///
/// Baker portal surfaces, guarded by `require_baker` (baker or admin).
pub fn baker_routes() -> Router<AppState> {
    Router::new()
        // GET /baker-portal
        // Open order counters per status.
        .route("/baker-portal", get(handlers::get_baker_dashboard))
        // GET /baker-portal/available-orders
        // Pending orders waiting for a baker, oldest first.
        .route(
            "/baker-portal/available-orders",
            get(handlers::get_available_orders),
        )
        // PUT /baker-portal/orders/{id}/status
        // Advance an order through its lifecycle (`order-management`).
        .route(
            "/baker-portal/orders/{id}/status",
            put(handlers::update_order_status),
        )
}
