use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// Catalog product sold through the checkout. Created and edited by the
/// admin surface; read-only to the checkout path.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// URL-safe identifier used by the public checkout route
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Slug must be between 1 and 100 characters"
    ))]
    pub slug: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,

    pub is_active: bool,

    pub delivery_mode: DeliveryMode,

    /// Redirect URL, download location or membership grant, depending on
    /// the delivery mode
    #[sea_orm(nullable)]
    pub delivery_payload: Option<String>,

    /// Buyer-facing form declaration: JSON array of [`CheckoutField`]
    #[sea_orm(column_type = "Json")]
    pub checkout_fields: Json,

    #[sea_orm(nullable)]
    pub order_bump_product_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub upsell_product_id: Option<Uuid>,

    pub created_at: DateTimeUtc,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// How a paid order is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum DeliveryMode {
    #[sea_orm(string_value = "redirect-link")]
    RedirectLink,
    #[sea_orm(string_value = "downloadable-file")]
    DownloadableFile,
    #[sea_orm(string_value = "membership-area")]
    MembershipArea,
}

/// A custom form field declared by the product's checkout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutField {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_field_type")]
    pub field_type: String,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl Model {
    /// Parses the declared checkout fields, skipping malformed entries.
    pub fn checkout_fields(&self) -> Vec<CheckoutField> {
        match serde_json::from_value::<Vec<CheckoutField>>(self.checkout_fields.clone()) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(product_id = %self.id, error = %e, "Malformed checkout field declaration");
                Vec::new()
            }
        }
    }

    /// A product must never offer itself as its own bump or upsell.
    pub fn references_self(&self) -> bool {
        self.order_bump_product_id == Some(self.id) || self.upsell_product_id == Some(self.id)
    }
}
