//! Postgres-backed repository tests. They need a reachable `DATABASE_URL`
//! and are ignored by default: `cargo test -- --ignored`.

use bakery_portal::{
    models::{OrderStatus, Role},
    repository::{PostgresRepository, ProfileRoles, Repository, RepositoryState},
    session::RoleSource,
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

async fn create_test_profile(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{}-{}@test.com", role, id))
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to create test profile");
    id
}

async fn create_test_order(pool: &PgPool, customer_id: Uuid, status: OrderStatus) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, customer_id, cake_name, status, total_cents) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(customer_id)
    .bind("Black forest")
    .bind(status.as_str())
    .bind(3200_i64)
    .execute(pool)
    .await
    .expect("Failed to create test order");
    id
}

// --- Tests ---

#[tokio::test]
#[ignore]
#[serial]
async fn test_profile_role_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_test_profile(&ctx.pool, "user").await;

    let profile = repo.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.resolved_role(), Some(Role::User));

    let updated = repo.set_role(id, Role::Baker).await.unwrap().unwrap();
    assert_eq!(updated.role, "baker");

    let renamed = repo
        .update_display_name(id, "Pat".to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.display_name.as_deref(), Some("Pat"));

    assert!(repo.get_profile(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_profile_roles_source() {
    let ctx = DbTestContext::setup().await;
    let admin = create_test_profile(&ctx.pool, "admin").await;
    let broken = create_test_profile(&ctx.pool, "pastry-chef").await;

    let roles = ProfileRoles::new(Arc::new(ctx.repository()) as RepositoryState);
    assert_eq!(roles.fetch_role(admin).await.unwrap(), Some(Role::Admin));
    assert_eq!(roles.fetch_role(broken).await.unwrap(), None);
    assert_eq!(roles.fetch_role(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_order_queries_and_status_updates() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let customer = create_test_profile(&ctx.pool, "user").await;
    let pending = create_test_order(&ctx.pool, customer, OrderStatus::Pending).await;
    create_test_order(&ctx.pool, customer, OrderStatus::Delivered).await;

    assert_eq!(repo.get_orders_for_customer(customer).await.len(), 2);
    assert!(
        repo.get_orders_by_status(OrderStatus::Pending)
            .await
            .iter()
            .any(|o| o.id == pending)
    );

    let before = repo.get_baker_dashboard().await;
    let accepted = repo
        .set_order_status(pending, OrderStatus::Accepted)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted.status, "accepted");
    let after = repo.get_baker_dashboard().await;
    assert_eq!(after.accepted, before.accepted + 1);

    assert!(repo.get_order(Uuid::new_v4()).await.is_none());
    assert!(
        repo.set_order_status(Uuid::new_v4(), OrderStatus::Ready)
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.get_admin_dashboard().await.total_orders >= 2);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_baker_count_matches_role_parsing() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let before = repo.get_admin_dashboard().await.total_bakers;

    // Stored casing and padding are not normalised by the store.
    let id = create_test_profile(&ctx.pool, " Baker ").await;
    let roles = ProfileRoles::new(Arc::new(ctx.repository()) as RepositoryState);
    assert_eq!(roles.fetch_role(id).await.unwrap(), Some(Role::Baker));

    let after = repo.get_admin_dashboard().await.total_bakers;
    assert_eq!(after, before + 1);
}
