use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{policy::Feature, routing::RouteClass};

// --- Roles ---

/// Role
///
/// Coarse authorization tier attached to a session. The profile store holds the
/// canonical value as text; anything that does not parse into one of these
/// variants is treated as "no role" and denied everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Baker,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Baker, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Baker => "baker",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "baker" => Ok(Role::Baker),
            "user" => Ok(Role::User),
            _ => Err(()),
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Profile
///
/// The storefront's mirror of an identity-provider account, stored in `profiles`.
/// `role` is kept as raw text so that a bad value in the store degrades to a
/// denial instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            email: String::new(),
            display_name: None,
            role: Role::User.as_str().to_string(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Profile {
    pub fn resolved_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// OrderStatus
///
/// Lifecycle of a cake order as tracked by the baker portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Baking,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses a baker still has work to do on.
    pub const OPEN: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Baking,
        OrderStatus::Ready,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Baking => "baking",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Order
///
/// A placed cake order from the `orders` table. Totals are stored in cents.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub cake_name: String,
    pub status: String,
    pub total_cents: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            customer_id: Uuid::nil(),
            cake_name: String::new(),
            status: OrderStatus::Pending.as_str().to_string(),
            total_cents: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// UpdateProfileRequest
///
/// Partial profile edit (PUT /account/profile). Only the display name is editable
/// by the owner; email and role belong to the identity provider and admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

/// SetRoleRequest
///
/// Admin payload for PUT /admin-portal/users/{id}/role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetOrderStatusRequest {
    pub status: OrderStatus,
}

// --- Response Payloads (Output Schemas) ---

/// SessionView
///
/// What the frontend needs to render navigation for the caller: whether a
/// session exists, its verification state, the resolved role, the features the
/// role unlocks and the role's landing path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SessionView {
    pub signed_in: bool,
    pub email_verified: bool,
    pub role: Option<Role>,
    pub features: Vec<Feature>,
    pub home: Option<String>,
}

/// LandingResponse
///
/// Landing Redirector decision for a path the frontend is about to show.
/// `decision` is one of `stay`, `hold` or `navigate`; `to` is set only for `navigate`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct LandingResponse {
    pub decision: String,
    pub to: Option<String>,
    pub replace: bool,
    pub class: RouteClass,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct FeatureAccess {
    pub feature: String,
    pub allowed: bool,
}

/// AccountOverview
///
/// Landing payload for the customer account surface (GET /account).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccountOverview {
    pub profile: Option<Profile>,
    pub role: Option<Role>,
    pub features: Vec<Feature>,
    pub open_orders: i64,
}

/// BakerDashboard
///
/// Per-status counters for the baker portal landing page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BakerDashboard {
    pub pending: i64,
    pub accepted: i64,
    pub baking: i64,
    pub ready: i64,
}

/// AdminDashboard
///
/// Aggregated counters for the admin portal landing page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_bakers: i64,
    pub total_orders: i64,
    pub open_orders: i64,
}
