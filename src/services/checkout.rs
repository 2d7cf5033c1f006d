use crate::{
    entities::{order::OrderStatus, product},
    errors::ServiceError,
    gateway::{ChargeAmount, ChargeCustomer, ChargeItem, ChargeRequest, PixGateway},
    services::{
        customers::{ContactDetails, CustomerResolver},
        orders::{NewOrder, OrderLifecycleService},
        poller::{PaymentPoller, PollHandle},
        products::ProductCatalogService,
    },
};
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Result of a successful checkout submission: everything the buyer
/// needs to pay.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSubmission {
    pub order_id: Uuid,
    pub qr_image: String,
    pub qr_text: String,
    pub transaction_id: String,
}

/// What the checkout page renders before the buyer submits.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutPage {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub checkout_fields: Vec<product::CheckoutField>,
    pub order_bump: Option<CompanionOffer>,
}

/// A bump or upsell product surfaced alongside the main purchase.
#[derive(Debug, Clone, Serialize)]
pub struct CompanionOffer {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
}

impl CompanionOffer {
    fn from_product(p: &product::Model) -> Self {
        Self {
            product_id: p.id,
            name: p.name.clone(),
            slug: p.slug.clone(),
            price: p.price,
        }
    }
}

/// Buyer-facing view of an order's progress.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusView {
    pub order_id: Uuid,
    pub status: OrderStatus,
    /// Present once the order is paid
    pub delivery: Option<DeliveryInfo>,
    /// Present when paid, the product declares an upsell and the buyer
    /// has not accepted it yet
    pub upsell: Option<CompanionOffer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryInfo {
    pub mode: product::DeliveryMode,
    pub payload: Option<String>,
}

/// Drives the full purchase flow: form validation, customer
/// resolution, charge issuance, order persistence and the payment
/// watch. The only writer of orders on the public surface.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    catalog: ProductCatalogService,
    customers: CustomerResolver,
    orders: Arc<OrderLifecycleService>,
    gateway: Arc<dyn PixGateway>,
    poller: PaymentPoller,
    /// Live payment watchers keyed by order id
    watchers: Arc<DashMap<Uuid, PollHandle>>,
    charge_expiration: ChronoDuration,
}

impl CheckoutOrchestrator {
    pub fn new(
        catalog: ProductCatalogService,
        customers: CustomerResolver,
        orders: Arc<OrderLifecycleService>,
        gateway: Arc<dyn PixGateway>,
        poller: PaymentPoller,
        charge_expiration_hours: i64,
    ) -> Self {
        Self {
            catalog,
            customers,
            orders,
            gateway,
            poller,
            watchers: Arc::new(DashMap::new()),
            charge_expiration: ChronoDuration::hours(charge_expiration_hours),
        }
    }

    /// Checkout page data for a public slug.
    #[instrument(skip(self))]
    pub async fn get_checkout_page(&self, slug: &str) -> Result<CheckoutPage, ServiceError> {
        let prod = self.catalog.get_active_by_slug(slug).await?;
        let bump = self.catalog.order_bump_for(&prod).await?;

        Ok(CheckoutPage {
            product_id: prod.id,
            name: prod.name.clone(),
            slug: prod.slug.clone(),
            description: prod.description.clone(),
            price: prod.price,
            checkout_fields: prod.checkout_fields(),
            order_bump: bump.as_ref().map(CompanionOffer::from_product),
        })
    }

    /// Runs the whole submission: validate, resolve the buyer, freeze
    /// the total, issue the charge, persist the order and start
    /// watching the payment. A gateway failure aborts before any order
    /// row exists.
    #[instrument(skip(self, fields), fields(slug = %slug))]
    pub async fn submit_checkout(
        &self,
        slug: &str,
        fields: HashMap<String, String>,
        include_order_bump: bool,
    ) -> Result<CheckoutSubmission, ServiceError> {
        let prod = self.catalog.get_active_by_slug(slug).await?;

        self.validate_fields(&prod, &fields)?;
        let email = fields
            .get("email")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::MissingRequiredFields(vec!["email".to_string()]))?;

        let contact = contact_from_fields(&fields);

        // The total is frozen here. Later catalog edits never touch
        // already-created orders.
        let bump = if include_order_bump {
            self.catalog.order_bump_for(&prod).await?
        } else {
            None
        };
        let total = prod.price + bump.as_ref().map(|b| b.price).unwrap_or(Decimal::ZERO);

        let customer_id = self.customers.resolve_customer(&email, contact.clone()).await?;

        let mut items = vec![ChargeItem {
            name: prod.name.clone(),
            quantity: 1,
            unit_amount: to_minor_units(prod.price)?,
        }];
        if let Some(b) = &bump {
            items.push(ChargeItem {
                name: b.name.clone(),
                quantity: 1,
                unit_amount: to_minor_units(b.price)?,
            });
        }

        let request = ChargeRequest {
            reference_id: Uuid::new_v4().to_string(),
            customer: ChargeCustomer {
                name: contact.name.clone(),
                email: email.clone(),
                tax_id: contact.tax_id.clone(),
                phone: contact.phone.clone(),
            },
            items,
            amount: ChargeAmount {
                value: to_minor_units(total)?,
            },
            description: Some(prod.name.clone()),
            expiration_date: Some(Utc::now() + self.charge_expiration),
        };

        // No order is written until the provider accepted the charge.
        let charge = self.gateway.create_charge(&request).await.map_err(|e| {
            error!(error = %e, "Charge creation failed; no order persisted");
            e
        })?;

        let order = self
            .orders
            .create_order(NewOrder {
                customer_id,
                product_id: prod.id,
                amount: total,
                includes_order_bump: bump.is_some(),
                pix_qr_code: charge.qr_image.clone(),
                pix_copy_paste: charge.qr_text.clone(),
                transaction_id: charge.transaction_id.clone(),
            })
            .await?;

        self.start_payment_watch(order.id, charge.transaction_id.clone());

        info!(order_id = %order.id, total = %total, "Checkout submitted");

        Ok(CheckoutSubmission {
            order_id: order.id,
            qr_image: charge.qr_image,
            qr_text: charge.qr_text,
            transaction_id: charge.transaction_id,
        })
    }

    /// Current order status plus delivery payload and the pending
    /// upsell offer once paid.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order_status(&self, order_id: Uuid) -> Result<OrderStatusView, ServiceError> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let mut view = OrderStatusView {
            order_id,
            status: order.status,
            delivery: None,
            upsell: None,
        };

        if order.status == OrderStatus::Paid {
            if let Some(prod) = self.catalog.get_by_id(order.product_id).await? {
                view.delivery = Some(DeliveryInfo {
                    mode: prod.delivery_mode,
                    payload: prod.delivery_payload.clone(),
                });
                if !order.upsell_accepted {
                    view.upsell = self
                        .catalog
                        .upsell_for(&prod)
                        .await?
                        .as_ref()
                        .map(CompanionOffer::from_product);
                }
            }
        }

        Ok(view)
    }

    /// Records the buyer's upsell acceptance. Declining is purely a
    /// client-side navigation choice and never reaches the server.
    pub async fn accept_upsell(&self, order_id: Uuid) -> Result<(), ServiceError> {
        self.orders.accept_upsell(order_id).await
    }

    /// Stops watching an order's payment, typically because the buyer
    /// navigated away. Already-applied transitions stay applied.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub fn cancel_payment_watch(&self, order_id: Uuid) {
        if let Some((_, handle)) = self.watchers.remove(&order_id) {
            handle.cancel();
            info!(order_id = %order_id, "Payment watch cancelled");
        }
    }

    /// Number of live payment watchers. Shutdown/diagnostics helper.
    pub fn active_watch_count(&self) -> usize {
        self.watchers.len()
    }

    fn start_payment_watch(&self, order_id: Uuid, transaction_id: String) {
        let orders = self.orders.clone();
        let watchers = self.watchers.clone();

        let handle = self.poller.start(
            transaction_id,
            order_id,
            Box::new(move |outcome| {
                Box::pin(async move {
                    watchers.remove(&order_id);
                    if let Err(e) = orders.apply_payment_outcome(order_id, outcome).await {
                        error!(order_id = %order_id, error = %e, "Failed to apply payment outcome");
                    }
                })
            }),
        );

        self.watchers.insert(order_id, handle);
    }

    /// Checks the submission against the product's declared required
    /// fields. Email is always required since it keys the customer
    /// record.
    fn validate_fields(
        &self,
        prod: &product::Model,
        fields: &HashMap<String, String>,
    ) -> Result<(), ServiceError> {
        let is_blank =
            |name: &str| fields.get(name).map(|v| v.trim().is_empty()).unwrap_or(true);

        let mut missing: Vec<String> = prod
            .checkout_fields()
            .iter()
            .filter(|f| f.required && is_blank(&f.name))
            .map(|f| f.name.clone())
            .collect();

        if is_blank("email") && !missing.iter().any(|n| n == "email") {
            missing.push("email".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            warn!(?missing, "Checkout submission rejected");
            Err(ServiceError::MissingRequiredFields(missing))
        }
    }
}

/// Converts a decimal monetary amount into integer minor units
/// (centavos) for the provider wire format.
fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError(format!("Amount {} out of range", amount)))
}

/// Maps the loosely-named form fields onto the customer contact shape.
/// The form arrives with Portuguese names; English aliases are accepted
/// for API clients.
fn contact_from_fields(fields: &HashMap<String, String>) -> ContactDetails {
    let pick = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| fields.get(*n))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    ContactDetails {
        name: pick(&["nome", "name"]).unwrap_or_default(),
        phone: pick(&["telefone", "phone"]),
        tax_id: pick(&["cpf", "tax_id"]),
    }
}
