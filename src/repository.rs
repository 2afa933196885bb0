use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AccessError,
    models::{AdminDashboard, BakerDashboard, Order, OrderStatus, Profile, Role},
    session::RoleSource,
};

/// Repository Trait
///
/// Contract for everything the portals read from or write to the profile and
/// order store. Handlers and the auth extractor only ever see
/// `Arc<dyn Repository>`, so tests swap in mocks.
///
/// Reads that feed listings degrade to empty results on store errors (logged).
/// `get_profile` and the writes keep the error: role resolution must tell "no
/// role" apart from "lookup failed", and a failed write is a 500, not a 404.
/// `Ok(None)` on a write means the row does not exist.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AccessError>;
    async fn list_profiles(&self) -> Vec<Profile>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>, AccessError>;
    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: String,
    ) -> Result<Option<Profile>, AccessError>;

    // --- Orders ---
    async fn get_order(&self, id: Uuid) -> Option<Order>;
    async fn get_orders_for_customer(&self, customer_id: Uuid) -> Vec<Order>;
    async fn get_orders_by_status(&self, status: OrderStatus) -> Vec<Order>;
    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, AccessError>;

    // --- Dashboards ---
    async fn get_baker_dashboard(&self) -> BakerDashboard;
    async fn get_admin_dashboard(&self) -> AdminDashboard;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// ProfileRoles
///
/// Role Source backed by the `profiles` table. A missing profile and a role
/// string that does not parse both resolve to `None`.
#[derive(Clone)]
pub struct ProfileRoles {
    repo: RepositoryState,
}

impl ProfileRoles {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RoleSource for ProfileRoles {
    async fn fetch_role(&self, identity_id: Uuid) -> Result<Option<Role>, AccessError> {
        let profile = self
            .repo
            .get_profile(identity_id)
            .await
            .map_err(|e| AccessError::RoleFetch(e.to_string()))?;
        Ok(profile.and_then(|p| p.resolved_role()))
    }
}

/// PostgresRepository
///
/// `Repository` backed by Postgres.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, status: Option<OrderStatus>) -> i64 {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        query.fetch_one(&self.pool).await.unwrap_or_else(|e| {
            tracing::error!("count error ({}): {:?}", sql, e);
            0
        })
    }
}

const PROFILE_COLUMNS: &str = "id, email, display_name, role, created_at";
const ORDER_COLUMNS: &str = "id, customer_id, cake_name, status, total_cents, created_at";
const COUNT_BY_STATUS: &str = "SELECT COUNT(*) FROM orders WHERE status = $1";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AccessError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// list_profiles
    ///
    /// Admin user-management listing, newest accounts first.
    async fn list_profiles(&self) -> Vec<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC");
        match sqlx::query_as::<_, Profile>(&sql).fetch_all(&self.pool).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("list_profiles error: {:?}", e);
                vec![]
            }
        }
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>, AccessError> {
        let sql =
            format!("UPDATE profiles SET role = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: String,
    ) -> Result<Option<Profile>, AccessError> {
        let sql = format!(
            "UPDATE profiles SET display_name = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(display_name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn get_order(&self, id: Uuid) -> Option<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_order error: {:?}", e);
                None
            })
    }

    async fn get_orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC"
        );
        match sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!("get_orders_for_customer error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_orders_by_status
    ///
    /// Oldest first, so the baker queue is worked in arrival order.
    async fn get_orders_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 ORDER BY created_at ASC");
        match sqlx::query_as::<_, Order>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!("get_orders_by_status error: {:?}", e);
                vec![]
            }
        }
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, AccessError> {
        let sql = format!("UPDATE orders SET status = $1 WHERE id = $2 RETURNING {ORDER_COLUMNS}");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn get_baker_dashboard(&self) -> BakerDashboard {
        BakerDashboard {
            pending: self.count(COUNT_BY_STATUS, Some(OrderStatus::Pending)).await,
            accepted: self.count(COUNT_BY_STATUS, Some(OrderStatus::Accepted)).await,
            baking: self.count(COUNT_BY_STATUS, Some(OrderStatus::Baking)).await,
            ready: self.count(COUNT_BY_STATUS, Some(OrderStatus::Ready)).await,
        }
    }

    /// get_admin_dashboard
    ///
    /// Compiles the admin counters; each counter falls back to 0 on error.
    async fn get_admin_dashboard(&self) -> AdminDashboard {
        let mut open_orders = 0;
        for status in OrderStatus::OPEN {
            open_orders += self.count(COUNT_BY_STATUS, Some(status)).await;
        }
        AdminDashboard {
            total_users: self.count("SELECT COUNT(*) FROM profiles", None).await,
            total_bakers: self
                .count(
                    "SELECT COUNT(*) FROM profiles WHERE lower(trim(role)) = 'baker'",
                    None,
                )
                .await,
            total_orders: self.count("SELECT COUNT(*) FROM orders", None).await,
            open_orders,
        }
    }
}
