#![allow(dead_code)]

use async_trait::async_trait;
use bakery_portal::{
    AppConfig, AppState, MockIdentityClient,
    auth::Claims,
    config::Env,
    error::AccessError,
    identity::IdentityState,
    models::{AdminDashboard, BakerDashboard, Order, OrderStatus, Profile, Role},
    repository::Repository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};
use uuid::Uuid;

// --- In-memory Repository ---

// Backs handler and router tests. `fail_profiles` makes every profile lookup
// error so role resolution failures can be exercised; `fail_writes` does the
// same for every write.
#[derive(Default)]
pub struct MemoryRepo {
    pub profiles: Mutex<Vec<Profile>>,
    pub orders: Mutex<Vec<Order>>,
    pub fail_profiles: bool,
    pub fail_writes: bool,
}

impl MemoryRepo {
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
            ..Self::default()
        }
    }

    pub fn add_order(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    fn check_write(&self) -> Result<(), AccessError> {
        if self.fail_writes {
            return Err(AccessError::Store("pool timed out".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AccessError> {
        if self.fail_profiles {
            return Err(AccessError::Store("profiles unavailable".to_string()));
        }
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_profiles(&self) -> Vec<Profile> {
        self.profiles.lock().unwrap().clone()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<Profile>, AccessError> {
        self.check_write()?;
        let mut profiles = self.profiles.lock().unwrap();
        Ok(profiles.iter_mut().find(|p| p.id == id).map(|profile| {
            profile.role = role.as_str().to_string();
            profile.clone()
        }))
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: String,
    ) -> Result<Option<Profile>, AccessError> {
        self.check_write()?;
        let mut profiles = self.profiles.lock().unwrap();
        Ok(profiles.iter_mut().find(|p| p.id == id).map(|profile| {
            profile.display_name = Some(display_name);
            profile.clone()
        }))
    }

    async fn get_order(&self, id: Uuid) -> Option<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
    }

    async fn get_orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect()
    }

    async fn get_orders_by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.status == status.as_str())
            .cloned()
            .collect()
    }

    async fn set_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, AccessError> {
        self.check_write()?;
        let mut orders = self.orders.lock().unwrap();
        Ok(orders.iter_mut().find(|o| o.id == id).map(|order| {
            order.status = status.as_str().to_string();
            order.clone()
        }))
    }

    async fn get_baker_dashboard(&self) -> BakerDashboard {
        let orders = self.orders.lock().unwrap();
        let count = |s: OrderStatus| orders.iter().filter(|o| o.status == s.as_str()).count() as i64;
        BakerDashboard {
            pending: count(OrderStatus::Pending),
            accepted: count(OrderStatus::Accepted),
            baking: count(OrderStatus::Baking),
            ready: count(OrderStatus::Ready),
        }
    }

    async fn get_admin_dashboard(&self) -> AdminDashboard {
        let profiles = self.profiles.lock().unwrap();
        let orders = self.orders.lock().unwrap();
        AdminDashboard {
            total_users: profiles.len() as i64,
            total_bakers: profiles
                .iter()
                .filter(|p| p.resolved_role() == Some(Role::Baker))
                .count() as i64,
            total_orders: orders.len() as i64,
            open_orders: orders
                .iter()
                .filter(|o| OrderStatus::OPEN.iter().any(|s| s.as_str() == o.status))
                .count() as i64,
        }
    }
}

// --- Fixtures ---

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub fn profile(role: &str) -> Profile {
    let id = Uuid::new_v4();
    Profile {
        id,
        email: format!("{}@bakery.test", role),
        role: role.to_string(),
        ..Profile::default()
    }
}

pub fn order(customer_id: Uuid, status: OrderStatus) -> Order {
    Order {
        id: Uuid::new_v4(),
        customer_id,
        cake_name: "Lemon drizzle".to_string(),
        status: status.as_str().to_string(),
        total_cents: 2450,
        ..Order::default()
    }
}

/// Mints an access token signed with `TEST_JWT_SECRET`.
/// A negative `exp_offset` produces an already-expired token.
pub fn create_token(user_id: Uuid, email_verified: bool, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        email: Some("customer@bakery.test".to_string()),
        email_verified,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub fn create_app_state(env: Env, repo: Arc<MemoryRepo>, identity: IdentityState) -> AppState {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.redirect_exempt_prefixes = vec!["/gift-cards".to_string()];

    AppState::new(repo, identity, config)
}

pub fn default_state(repo: Arc<MemoryRepo>) -> AppState {
    create_app_state(
        Env::Production,
        repo,
        Arc::new(MockIdentityClient::new()) as IdentityState,
    )
}
