use crate::{
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Read-only catalog access for the checkout path. Product writes
/// belong to the admin surface and are not exposed here.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Loads the product behind a public checkout URL. Inactive and
    /// unknown slugs are indistinguishable to the buyer.
    #[instrument(skip(self))]
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<product::Model, ServiceError> {
        let found = ProductEntity::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;

        found.ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", slug)))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<product::Model>, ServiceError> {
        Ok(ProductEntity::find_by_id(id).one(&*self.db).await?)
    }

    /// Resolves the order-bump companion, if the product declares one
    /// and it is still sellable. A self-referencing declaration is a
    /// data error and is treated as "no bump".
    pub async fn order_bump_for(
        &self,
        product: &product::Model,
    ) -> Result<Option<product::Model>, ServiceError> {
        if product.references_self() {
            warn!(product_id = %product.id, "Product references itself as bump or upsell; ignoring");
            return Ok(None);
        }
        self.active_companion(product.order_bump_product_id).await
    }

    /// Resolves the post-payment upsell offer, same rules as the bump.
    pub async fn upsell_for(
        &self,
        product: &product::Model,
    ) -> Result<Option<product::Model>, ServiceError> {
        if product.references_self() {
            warn!(product_id = %product.id, "Product references itself as bump or upsell; ignoring");
            return Ok(None);
        }
        self.active_companion(product.upsell_product_id).await
    }

    async fn active_companion(
        &self,
        id: Option<Uuid>,
    ) -> Result<Option<product::Model>, ServiceError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let companion = self.get_by_id(id).await?;
        Ok(companion.filter(|p| p.is_active))
    }
}
