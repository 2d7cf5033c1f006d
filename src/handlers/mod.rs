pub mod checkout;
pub mod customers;
pub mod health;
pub mod orders;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::{pix::PixClient, PixGateway};
use crate::services::{
    checkout::CheckoutOrchestrator,
    customers::CustomerResolver,
    orders::OrderLifecycleService,
    poller::{PaymentPoller, PollerConfig},
    products::ProductCatalogService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use crate::AppState;

/// Business-logic layer wired into the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: ProductCatalogService,
    pub customers: CustomerResolver,
    pub orders: Arc<OrderLifecycleService>,
    pub checkout: Arc<CheckoutOrchestrator>,
}

impl AppServices {
    /// Builds the full service graph against the live payment provider.
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, config: &AppConfig) -> Self {
        let gateway: Arc<dyn PixGateway> = Arc::new(PixClient::new(
            config.pix_api_base_url.as_str(),
            config.pix_api_key.as_str(),
            config.pix_http_timeout(),
        ));
        Self::with_gateway(db, event_sender, config, gateway)
    }

    /// Same graph with an injected gateway. Test seam.
    pub fn with_gateway(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: &AppConfig,
        gateway: Arc<dyn PixGateway>,
    ) -> Self {
        let catalog = ProductCatalogService::new(db.clone());
        let customers = CustomerResolver::new(db.clone(), event_sender.clone());
        let orders = Arc::new(OrderLifecycleService::new(db, event_sender));
        let poller = PaymentPoller::new(
            gateway.clone(),
            PollerConfig {
                interval: config.poll_interval(),
                timeout: config.poll_timeout(),
            },
        );
        let checkout = Arc::new(CheckoutOrchestrator::new(
            catalog.clone(),
            customers.clone(),
            orders.clone(),
            gateway,
            poller,
            config.charge_expiration_hours,
        ));

        Self {
            catalog,
            customers,
            orders,
            checkout,
        }
    }
}
