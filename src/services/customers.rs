use crate::{
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Mutable contact fields carried by every checkout submission.
#[derive(Debug, Clone)]
pub struct ContactDetails {
    pub name: String,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

const RESOLVE_ATTEMPTS: usize = 3;

/// Deduplicates buyers by email. The email column's uniqueness
/// constraint is the serialization point: a lost insert race is
/// detected as a constraint violation and resolved by re-reading.
#[derive(Clone)]
pub struct CustomerResolver {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CustomerResolver {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Returns the stable customer id for `email`, creating the record
    /// on first purchase and overwriting contact fields on repeat ones
    /// (last submission wins).
    #[instrument(skip(self, contact), fields(email = %email))]
    pub async fn resolve_customer(
        &self,
        email: &str,
        contact: ContactDetails,
    ) -> Result<Uuid, ServiceError> {
        for attempt in 1..=RESOLVE_ATTEMPTS {
            if let Some(existing) = self.find_by_email(email).await? {
                let customer_id = existing.id;
                let mut active: customer::ActiveModel = existing.into();
                active.name = Set(contact.name.clone());
                active.phone = Set(contact.phone.clone());
                active.tax_id = Set(contact.tax_id.clone());
                active.updated_at = Set(Some(Utc::now()));
                active.update(&*self.db).await?;

                self.event_sender
                    .send(Event::CustomerUpdated(customer_id))
                    .await;
                return Ok(customer_id);
            }

            let customer_id = Uuid::new_v4();
            let model = customer::ActiveModel {
                id: Set(customer_id),
                name: Set(contact.name.clone()),
                email: Set(email.to_string()),
                phone: Set(contact.phone.clone()),
                tax_id: Set(contact.tax_id.clone()),
                created_at: Set(Utc::now()),
                updated_at: Set(None),
            };

            match model.insert(&*self.db).await {
                Ok(_) => {
                    info!(customer_id = %customer_id, "Customer created");
                    self.event_sender
                        .send(Event::CustomerCreated(customer_id))
                        .await;
                    return Ok(customer_id);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    // Another submission with the same email won the
                    // insert; the next pass reads its row.
                    warn!(attempt, "Customer insert lost a uniqueness race; retrying lookup");
                }
                Err(e) => return Err(ServiceError::DatabaseError(e)),
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not resolve customer for {} after {} attempts",
            email, RESOLVE_ATTEMPTS
        )))
    }

    pub async fn get_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find_by_id(customer_id)
            .one(&*self.db)
            .await?)
    }

    /// Paginated listing for back-office screens, newest first.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let paginator = CustomerEntity::find()
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((customers, total))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.db)
            .await?)
    }
}
