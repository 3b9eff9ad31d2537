use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product entity for the catalog. `category_id` is required and always
/// references an existing category; orphaned products are reassigned to the
/// sentinel "Uncategorized" category by the category service.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub detailed_description: String,
    pub category_id: Uuid,
    pub price: Decimal,
    pub promotional_price: Option<Decimal>,
    pub sku: String,
    pub ean_upc: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub sizes: Json,
    #[sea_orm(column_type = "Json")]
    pub colors: Json,
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,

    #[sea_orm(has_many = "super::stock_by_store::Entity")]
    Stocks,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::stock_by_store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decode a JSON string-array column into a `Vec<String>`.
    fn string_list(value: &Json) -> Vec<String> {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn sizes_list(&self) -> Vec<String> {
        Self::string_list(&self.sizes)
    }

    pub fn colors_list(&self) -> Vec<String> {
        Self::string_list(&self.colors)
    }

    pub fn images_list(&self) -> Vec<String> {
        Self::string_list(&self.images)
    }
}
