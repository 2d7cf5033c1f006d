use crate::{
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::poller::PaymentOutcome,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Fields required to persist a freshly charged order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub includes_order_bump: bool,
    pub pix_qr_code: String,
    pub pix_copy_paste: String,
    pub transaction_id: String,
}

/// Owns every Order state transition. Status moves pending → paid or
/// pending → cancelled; both targets are terminal, and transition
/// attempts from a terminal state converge to a logged no-op.
#[derive(Clone)]
pub struct OrderLifecycleService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderLifecycleService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Persists a pending order with its frozen amount and charge
    /// artifacts. Called once per successful charge issuance.
    #[instrument(skip(self, new_order), fields(customer_id = %new_order.customer_id, product_id = %new_order.product_id))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<order::Model, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let model = order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(new_order.customer_id),
            product_id: Set(new_order.product_id),
            amount: Set(new_order.amount),
            status: Set(OrderStatus::Pending),
            pix_qr_code: Set(new_order.pix_qr_code),
            pix_copy_paste: Set(new_order.pix_copy_paste),
            transaction_id: Set(new_order.transaction_id),
            includes_order_bump: Set(new_order.includes_order_bump),
            upsell_accepted: Set(false),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let inserted = model.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to persist order");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, amount = %inserted.amount, "Order created");

        self.event_sender
            .send(Event::OrderCreated {
                order_id,
                customer_id: inserted.customer_id,
                product_id: inserted.product_id,
                amount: inserted.amount,
            })
            .await;

        Ok(inserted)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<order::Model>, ServiceError> {
        Ok(OrderEntity::find_by_id(order_id).one(&*self.db).await?)
    }

    /// Paginated listing for back-office screens, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Applies a payment watch outcome. `Paid` and `Expired` drive the
    /// state machine; `TimedOut` deliberately leaves the order pending
    /// and only flags it for operators, since the charge may still
    /// resolve out-of-band.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn apply_payment_outcome(
        &self,
        order_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<OrderStatus, ServiceError> {
        let target = match outcome {
            PaymentOutcome::Paid => OrderStatus::Paid,
            PaymentOutcome::Expired => OrderStatus::Cancelled,
            PaymentOutcome::TimedOut => {
                let current = self.require_order(order_id).await?;
                if current.status == OrderStatus::Pending {
                    warn!(order_id = %order_id, txid = %current.transaction_id, "Payment watch inconclusive; order stays pending");
                    self.event_sender
                        .send(Event::OrderPaymentUnresolved {
                            order_id,
                            transaction_id: current.transaction_id,
                        })
                        .await;
                }
                return Ok(current.status);
            }
        };

        // Conditional single-row update: only a pending order moves, so
        // duplicate or late outcome deliveries cannot conflict.
        let result = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(target))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            let current = self.require_order(order_id).await?;
            // Stale transition: terminal state already reached.
            info!(
                order_id = %order_id,
                current_status = ?current.status,
                attempted = ?target,
                "Ignoring stale transition"
            );
            return Ok(current.status);
        }

        info!(order_id = %order_id, status = ?target, "Order status updated");

        let event = match target {
            OrderStatus::Paid => Event::OrderPaid(order_id),
            _ => Event::OrderCancelled(order_id),
        };
        self.event_sender.send(event).await;

        Ok(target)
    }

    /// Records the buyer's one-shot upsell acceptance. Idempotent: a
    /// repeat call succeeds without changing anything further.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn accept_upsell(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(order::Column::UpsellAccepted, Expr::value(true))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::UpsellAccepted.eq(false))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            // Either unknown order or already accepted.
            let current = self.require_order(order_id).await?;
            info!(order_id = %order_id, upsell_accepted = current.upsell_accepted, "Upsell already decided");
            return Ok(());
        }

        info!(order_id = %order_id, "Upsell accepted");
        self.event_sender.send(Event::UpsellAccepted(order_id)).await;
        Ok(())
    }

    async fn require_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        self.get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}
