// Shared across integration test binaries; each one uses a subset.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

use pix_checkout_api::{
    db,
    entities::product::{self, DeliveryMode},
    events,
    gateway::PixGateway,
    services::{
        checkout::CheckoutOrchestrator,
        customers::CustomerResolver,
        orders::OrderLifecycleService,
        poller::{PaymentPoller, PollerConfig},
        products::ProductCatalogService,
    },
};

/// Service graph wired against an in-memory database and a
/// caller-supplied gateway.
pub struct TestHarness {
    pub db: Arc<DatabaseConnection>,
    pub catalog: ProductCatalogService,
    pub customers: CustomerResolver,
    pub orders: Arc<OrderLifecycleService>,
    pub checkout: Arc<CheckoutOrchestrator>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestHarness {
    /// Short polling windows so watcher tests finish in real time.
    pub async fn new(gateway: Arc<dyn PixGateway>) -> Self {
        Self::with_poller(
            gateway,
            PollerConfig {
                interval: Duration::from_millis(50),
                timeout: Duration::from_secs(3),
            },
        )
        .await
    }

    pub async fn with_poller(gateway: Arc<dyn PixGateway>, poller_config: PollerConfig) -> Self {
        let db = Arc::new(fresh_database().await);

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let catalog = ProductCatalogService::new(db.clone());
        let customers = CustomerResolver::new(db.clone(), event_sender.clone());
        let orders = Arc::new(OrderLifecycleService::new(db.clone(), event_sender));
        let poller = PaymentPoller::new(gateway.clone(), poller_config);
        let checkout = Arc::new(CheckoutOrchestrator::new(
            catalog.clone(),
            customers.clone(),
            orders.clone(),
            gateway,
            poller,
            24,
        ));

        Self {
            db,
            catalog,
            customers,
            orders,
            checkout,
            _event_task: event_task,
        }
    }
}

/// Single-connection in-memory SQLite; one pooled connection keeps the
/// in-memory database alive and shared across the harness.
pub async fn fresh_database() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = Database::connect(opt).await.expect("sqlite in-memory");
    db::run_migrations(&conn).await.expect("migrations");
    conn
}

pub struct ProductSpec {
    pub name: &'static str,
    pub slug: &'static str,
    pub price: Decimal,
    pub required_fields: Vec<&'static str>,
    pub order_bump_product_id: Option<Uuid>,
    pub upsell_product_id: Option<Uuid>,
    pub is_active: bool,
}

impl Default for ProductSpec {
    fn default() -> Self {
        Self {
            name: "Curso Completo",
            slug: "curso-completo",
            price: Decimal::new(10000, 2),
            required_fields: vec!["nome", "email"],
            order_bump_product_id: None,
            upsell_product_id: None,
            is_active: true,
        }
    }
}

pub async fn seed_product(db: &DatabaseConnection, spec: ProductSpec) -> product::Model {
    let fields: Vec<_> = spec
        .required_fields
        .iter()
        .map(|name| json!({"name": name, "required": true}))
        .collect();

    let model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(spec.name.to_string()),
        slug: Set(spec.slug.to_string()),
        description: Set(None),
        price: Set(spec.price),
        is_active: Set(spec.is_active),
        delivery_mode: Set(DeliveryMode::RedirectLink),
        delivery_payload: Set(Some("https://example.com/members".to_string())),
        checkout_fields: Set(json!(fields)),
        order_bump_product_id: Set(spec.order_bump_product_id),
        upsell_product_id: Set(spec.upsell_product_id),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };

    model.insert(db).await.expect("seed product")
}

/// Standard buyer form covering the default required fields.
pub fn buyer_fields() -> std::collections::HashMap<String, String> {
    let mut fields = std::collections::HashMap::new();
    fields.insert("nome".to_string(), "Maria Silva".to_string());
    fields.insert("email".to_string(), "maria@example.com".to_string());
    fields.insert("telefone".to_string(), "+55 11 99999-0000".to_string());
    fields.insert("cpf".to_string(), "123.456.789-09".to_string());
    fields
}

/// Gateway stub for tests that never touch the provider.
pub struct NullGateway;

#[async_trait::async_trait]
impl PixGateway for NullGateway {
    async fn create_charge(
        &self,
        _: &pix_checkout_api::gateway::ChargeRequest,
    ) -> Result<pix_checkout_api::gateway::ChargeResult, pix_checkout_api::errors::ServiceError>
    {
        panic!("unexpected charge creation")
    }

    async fn get_charge_status(
        &self,
        _: &str,
    ) -> Result<pix_checkout_api::gateway::ChargeStatus, pix_checkout_api::errors::ServiceError>
    {
        panic!("unexpected status check")
    }
}

/// Minimal configuration for router-level tests.
pub fn test_config() -> pix_checkout_api::config::AppConfig {
    use pix_checkout_api::config::AppConfig;

    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18080,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        pix_api_base_url: "http://127.0.0.1:0".to_string(),
        pix_api_key: "test-key".to_string(),
        pix_http_timeout_secs: 2,
        poll_interval_secs: 1,
        poll_timeout_secs: 3,
        charge_expiration_hours: 24,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
    }
}
