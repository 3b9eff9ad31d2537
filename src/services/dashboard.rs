use crate::{
    entities::{category, product, Category, CategoryModel, Product},
    errors::ServiceError,
    services::products::{ProductService, ProductWithDetails},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A per-store stock row at or below this quantity counts as critical.
const CRITICAL_STOCK_THRESHOLD: i32 = 5;

/// Read-only aggregates for the admin dashboard
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    products: ProductService,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_products: u64,
    pub active_products: u64,
    pub inactive_products: u64,
    pub total_categories: u64,
    pub total_stores: u64,
    pub products_without_stock: u64,
    pub products_with_promotional_price: u64,
    pub products_without_category: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InactiveCategoryAlert {
    pub category: CategoryModel,
    pub product_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticalStockAlert {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub store_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardAlerts {
    pub inactive_categories_with_products: Vec<InactiveCategoryAlert>,
    pub products_without_images: Vec<ProductWithDetails>,
    pub critical_stock: Vec<CriticalStockAlert>,
    pub products_in_uncategorized: Vec<ProductWithDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentEntry {
    pub id: Uuid,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub products: Vec<RecentEntry>,
    pub categories: Vec<RecentEntry>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>, products: ProductService) -> Self {
        Self { db, products }
    }

    /// Headline counts for the dashboard landing page
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db;

        let total_products = Product::find().count(db).await?;
        let active_products = Product::find()
            .filter(product::Column::Active.eq(true))
            .count(db)
            .await?;
        let inactive_products = total_products.saturating_sub(active_products);
        let total_categories = Category::find().count(db).await?;
        let total_stores = crate::entities::Store::find().count(db).await?;
        let products_with_promotional_price = Product::find()
            .filter(product::Column::PromotionalPrice.is_not_null())
            .filter(product::Column::Active.eq(true))
            .count(db)
            .await?;

        let products_without_stock = self.products.products_without_stock().await?.len() as u64;
        let products_without_category = self.products.products_without_category_count().await?;

        Ok(DashboardSummary {
            total_products,
            active_products,
            inactive_products,
            total_categories,
            total_stores,
            products_without_stock,
            products_with_promotional_price,
            products_without_category,
        })
    }

    /// Data-quality alerts: inactive categories still holding products,
    /// active products with no images, critical stock rows and products
    /// parked in the Uncategorized sentinel.
    #[instrument(skip(self))]
    pub async fn alerts(&self) -> Result<DashboardAlerts, ServiceError> {
        let db = &*self.db;

        let mut inactive_categories_with_products = Vec::new();
        let inactive_categories = Category::find()
            .filter(category::Column::Active.eq(false))
            .all(db)
            .await?;
        for cat in inactive_categories {
            let product_count = Product::find()
                .filter(product::Column::CategoryId.eq(cat.id))
                .count(db)
                .await?;
            if product_count > 0 {
                inactive_categories_with_products.push(InactiveCategoryAlert {
                    category: cat,
                    product_count,
                });
            }
        }

        let active_products = Product::find()
            .filter(product::Column::Active.eq(true))
            .all(db)
            .await?;
        let without_images: Vec<_> = active_products
            .into_iter()
            .filter(|p| p.images_list().is_empty())
            .collect();
        let products_without_images = ProductService::assemble_details(db, without_images).await?;

        let critical_stock = self.critical_stock(db).await?;
        let products_in_uncategorized = self.products.products_without_category().await?;

        Ok(DashboardAlerts {
            inactive_categories_with_products,
            products_without_images,
            critical_stock,
            products_in_uncategorized,
        })
    }

    /// Most recently updated products and categories
    #[instrument(skip(self))]
    pub async fn recent_activity(&self, limit: u64) -> Result<RecentActivity, ServiceError> {
        let db = &*self.db;

        let products = Product::find()
            .order_by_desc(product::Column::UpdatedAt)
            .limit(limit)
            .all(db)
            .await?
            .into_iter()
            .map(|p| RecentEntry {
                id: p.id,
                name: p.name,
                updated_at: p.updated_at,
            })
            .collect();

        let categories = Category::find()
            .order_by_desc(category::Column::UpdatedAt)
            .limit(limit)
            .all(db)
            .await?
            .into_iter()
            .map(|c| RecentEntry {
                id: c.id,
                name: c.name,
                updated_at: c.updated_at,
            })
            .collect();

        Ok(RecentActivity {
            products,
            categories,
        })
    }

    async fn critical_stock(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Vec<CriticalStockAlert>, ServiceError> {
        use crate::entities::{stock_by_store, StockByStore};

        let rows = StockByStore::find()
            .filter(stock_by_store::Column::Quantity.lte(CRITICAL_STOCK_THRESHOLD))
            .all(db)
            .await?;

        let product_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let products: std::collections::HashMap<Uuid, (String, String)> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, (p.name, p.sku)))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                products.get(&row.product_id).map(|(name, sku)| CriticalStockAlert {
                    product_id: row.product_id,
                    product_name: name.clone(),
                    sku: sku.clone(),
                    store_id: row.store_id,
                    quantity: row.quantity,
                })
            })
            .collect())
    }
}
