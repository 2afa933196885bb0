use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access core: policy, route classification, guard and landing redirector.
pub mod guard;
pub mod policy;
pub mod redirector;
pub mod routing;
pub mod session;

// Service plumbing around the core.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Account, Baker, Admin).
pub mod routes;
use routes::{account, admin, baker, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityClient, SupabaseIdentityClient};
pub use repository::{PostgresRepository, RepositoryState};
pub use routing::RouteTable;

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and the
/// `ToSchema` models; served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session, handlers::get_landing, handlers::get_feature_access,
        handlers::sign_out, handlers::get_account, handlers::update_profile,
        handlers::get_my_orders, handlers::get_order_detail, handlers::get_baker_dashboard,
        handlers::get_available_orders, handlers::update_order_status,
        handlers::get_admin_dashboard, handlers::list_users, handlers::set_user_role
    ),
    components(
        schemas(
            models::Role, models::Profile, models::Order, models::OrderStatus,
            models::UpdateProfileRequest, models::SetRoleRequest, models::SetOrderStatusRequest,
            models::SessionView, models::LandingResponse, models::FeatureAccess,
            models::AccountOverview, models::BakerDashboard, models::AdminDashboard,
            policy::Feature, routing::RouteClass,
        )
    ),
    tags(
        (name = "bakery-portal", description = "Storefront access gateway and portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state for every request: the store, the identity
/// provider client, the configuration and the declared route table.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub identity: IdentityState,
    pub config: AppConfig,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    /// Builds the state, deriving the route table from the configured exempt prefixes.
    pub fn new(repo: RepositoryState, identity: IdentityState, config: AppConfig) -> Self {
        let routes = Arc::new(RouteTable::with_exempt_prefixes(
            &config.redirect_exempt_prefixes,
        ));
        Self {
            repo,
            identity,
            config,
            routes,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<RouteTable> {
    fn from_ref(app_state: &AppState) -> Arc<RouteTable> {
        app_state.routes.clone()
    }
}

/// create_router
///
/// Assembles the tiers, wraps each guarded tier in its route guard layer and
/// applies the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            account::account_home_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_signed_in,
            )),
        )
        .merge(
            account::account_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_user,
            )),
        )
        .merge(
            baker::baker_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_baker,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_admin,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id` so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
