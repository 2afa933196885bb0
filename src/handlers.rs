use crate::{
    AppState,
    auth::{AuthContext, AuthUser},
    error::AccessError,
    guard::require_feature,
    models::{
        AccountOverview, AdminDashboard, BakerDashboard, FeatureAccess, LandingResponse, Order,
        OrderStatus, Profile, Role, SessionView, SetOrderStatusRequest, SetRoleRequest,
        UpdateProfileRequest,
    },
    policy::{self, Feature},
    redirector::{self, Location, NavState},
    routing,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// LandingQuery
///
/// Location the frontend is about to show, plus the public-link opt-out flag
/// carried in its navigation state.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LandingQuery {
    pub path: String,
    #[serde(default)]
    pub from_public_link: bool,
}

// --- Session & Navigation ---

/// get_session
///
/// [Public Route] Describes the caller's session for navigation rendering.
/// Anonymous callers get an empty view rather than an error.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Session view", body = SessionView))
)]
pub async fn get_session(auth: AuthContext) -> Json<SessionView> {
    let signed_in = auth.session.identity.is_some();
    Json(SessionView {
        signed_in,
        email_verified: auth.session.email_verified,
        role: auth.role,
        features: policy::features_for(auth.role),
        home: signed_in.then(|| routing::landing_path(auth.role).to_string()),
    })
}

/// get_landing
///
/// [Public Route] Runs the Landing Redirector for `path` against the caller's
/// session. The frontend calls this on every navigation and follows `to`
/// when the decision is `navigate`.
#[utoipa::path(
    get,
    path = "/landing",
    params(LandingQuery),
    responses((status = 200, description = "Redirect decision", body = LandingResponse))
)]
pub async fn get_landing(
    auth: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
) -> Json<LandingResponse> {
    let path = if query.path.starts_with('/') {
        query.path
    } else {
        format!("/{}", query.path)
    };
    let location = Location {
        path,
        state: NavState {
            from_public_link: query.from_public_link,
        },
    };

    let decision =
        redirector::compute_redirect(&auth.session, auth.role, &location, &state.routes);
    tracing::debug!(path = %location.path, decision = ?decision, role = ?auth.role, "landing decision");

    Json(LandingResponse {
        decision: decision.label().to_string(),
        to: decision.target().map(str::to_string),
        replace: matches!(decision, redirector::RedirectDecision::Navigate { replace: true, .. }),
        class: state.routes.classify(&location.path, auth.role),
    })
}

/// get_feature_access
///
/// [Public Route] Checks a single feature for the caller. Unknown feature
/// names answer `allowed: false` instead of 404.
#[utoipa::path(
    get,
    path = "/access/{feature}",
    params(("feature" = String, Path, description = "Feature name, e.g. order-management")),
    responses((status = 200, description = "Access check", body = FeatureAccess))
)]
pub async fn get_feature_access(
    auth: AuthContext,
    Path(feature): Path<String>,
) -> Json<FeatureAccess> {
    let allowed = policy::has_access_named(auth.role, &feature);
    Json(FeatureAccess { feature, allowed })
}

/// sign_out
///
/// [Public Route] Revokes the caller's bearer token at the identity provider.
/// Without a token there is nothing to revoke (401).
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "No session"),
        (status = 502, description = "Identity provider failure")
    )
)]
pub async fn sign_out(
    auth: AuthContext,
    State(state): State<AppState>,
) -> Result<StatusCode, AccessError> {
    let Some(token) = auth.token else {
        return Ok(StatusCode::UNAUTHORIZED);
    };
    state.identity.sign_out(&token).await?;
    tracing::info!(user_id = ?auth.session.identity_id(), "signed out");
    Ok(StatusCode::NO_CONTENT)
}

// --- Account (user tier) ---

/// get_account
///
/// [Signed-in Route] Landing payload of the customer account surface. Also
/// served to a verified session without a role, which sees no features and
/// no order counts.
#[utoipa::path(
    get,
    path = "/account",
    responses((status = 200, description = "Account overview", body = AccountOverview))
)]
pub async fn get_account(user: AuthUser, State(state): State<AppState>) -> Json<AccountOverview> {
    let profile = match state.repo.get_profile(user.id).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "get_account profile lookup failed");
            None
        }
    };
    let open_orders = if policy::has_access(user.role, Feature::OrderHistory) {
        state
            .repo
            .get_orders_for_customer(user.id)
            .await
            .iter()
            .filter(|o| {
                OrderStatus::OPEN
                    .iter()
                    .any(|s| s.as_str() == o.status.as_str())
            })
            .count() as i64
    } else {
        0
    };

    Json(AccountOverview {
        profile,
        role: user.role,
        features: policy::features_for(user.role),
        open_orders,
    })
}

/// update_profile
///
/// [User Route] Edits the caller's own display name. Requires `profile-edit`.
#[utoipa::path(
    put,
    path = "/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 400, description = "Blank display name"),
        (status = 404, description = "No profile"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, StatusCode> {
    require_feature(user.role, Feature::ProfileEdit)?;

    let display_name = payload.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .repo
        .update_display_name(user.id, display_name)
        .await?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// get_my_orders
///
/// [User Route] The caller's own orders, newest first. Requires `order-history`.
#[utoipa::path(
    get,
    path = "/account/orders",
    responses((status = 200, description = "My orders", body = [Order]))
)]
pub async fn get_my_orders(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, StatusCode> {
    require_feature(user.role, Feature::OrderHistory)?;
    Ok(Json(state.repo.get_orders_for_customer(user.id).await))
}

/// get_order_detail
///
/// [User Route] One order. Visible to its customer and to anyone holding
/// `order-management`; everyone else gets 404 so order ids do not leak.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_order_detail(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, StatusCode> {
    let order = state.repo.get_order(id).await.ok_or(StatusCode::NOT_FOUND)?;
    if order.customer_id == user.id || policy::has_access(user.role, Feature::OrderManagement) {
        Ok(Json(order))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

// --- Baker Portal ---

/// get_baker_dashboard
///
/// [Baker Route] Open order counters per status.
#[utoipa::path(
    get,
    path = "/baker-portal",
    responses((status = 200, description = "Dashboard", body = BakerDashboard))
)]
pub async fn get_baker_dashboard(State(state): State<AppState>) -> Json<BakerDashboard> {
    Json(state.repo.get_baker_dashboard().await)
}

/// get_available_orders
///
/// [Baker Route] Orders nobody has accepted yet, oldest first.
#[utoipa::path(
    get,
    path = "/baker-portal/available-orders",
    responses((status = 200, description = "Pending orders", body = [Order]))
)]
pub async fn get_available_orders(State(state): State<AppState>) -> Json<Vec<Order>> {
    Json(state.repo.get_orders_by_status(OrderStatus::Pending).await)
}

/// update_order_status
///
/// [Baker Route] Moves an order through its lifecycle. Requires `order-management`.
#[utoipa::path(
    put,
    path = "/baker-portal/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = SetOrderStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 404, description = "Not found"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn update_order_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetOrderStatusRequest>,
) -> Result<Json<Order>, StatusCode> {
    require_feature(user.role, Feature::OrderManagement)?;
    let order = state
        .repo
        .set_order_status(id, payload.status)
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;
    tracing::info!(order_id = %id, status = payload.status.as_str(), by = %user.id, "order status changed");
    Ok(Json(order))
}

// --- Admin Portal ---

/// get_admin_dashboard
///
/// [Admin Route] Store-wide counters.
#[utoipa::path(
    get,
    path = "/admin-portal",
    responses((status = 200, description = "Dashboard", body = AdminDashboard))
)]
pub async fn get_admin_dashboard(State(state): State<AppState>) -> Json<AdminDashboard> {
    Json(state.repo.get_admin_dashboard().await)
}

/// list_users
///
/// [Admin Route] All profiles. Requires `user-management`.
#[utoipa::path(
    get,
    path = "/admin-portal/users",
    responses((status = 200, description = "Profiles", body = [Profile]))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, StatusCode> {
    require_feature(user.role, Feature::UserManagement)?;
    Ok(Json(state.repo.list_profiles().await))
}

/// set_user_role
///
/// [Admin Route] Changes a profile's role. Requires `user-management`.
/// An admin cannot demote themselves (409), so the store always keeps the
/// admin who made the change.
#[utoipa::path(
    put,
    path = "/admin-portal/users/{id}/role",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 404, description = "Not found"),
        (status = 409, description = "Self-demotion"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn set_user_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<Profile>, StatusCode> {
    require_feature(user.role, Feature::UserManagement)?;
    if id == user.id && payload.role != Role::Admin {
        return Err(StatusCode::CONFLICT);
    }
    let profile = state
        .repo
        .set_role(id, payload.role)
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;
    tracing::info!(profile_id = %id, role = %payload.role, by = %user.id, "role changed");
    Ok(Json(profile))
}
