use crate::{
    entities::{
        category, product, stock_by_store, store, Category, CategoryModel, Product, ProductModel,
        StockByStore, Store, StoreModel, StoreType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::categories::UNCATEGORIZED_SLUG,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Active products must carry between one and this many images.
pub const MAX_PRODUCT_IMAGES: usize = 8;

/// Service for managing products and their per-store stock
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockEntryInput {
    pub store_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub detailed_description: String,
    pub category_id: Uuid,
    pub price: Decimal,
    pub promotional_price: Option<Decimal>,
    pub sku: String,
    pub ean_upc: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub stock: Vec<StockEntryInput>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub detailed_description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    /// `None` leaves the promotional price untouched; `Some(None)` clears it.
    pub promotional_price: Option<Option<Decimal>>,
    pub sku: Option<String>,
    pub ean_upc: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub stock: Option<Vec<StockEntryInput>>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilters {
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
    pub has_stock: Option<bool>,
    pub has_promotional_price: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub id: Uuid,
    pub name: String,
    pub store_type: StoreType,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDetail {
    pub store_id: Uuid,
    pub store: Option<StoreSummary>,
    pub quantity: i32,
}

/// Product together with its category summary, per-store stock and the
/// computed stock total.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithDetails {
    pub product: ProductModel,
    pub category: Option<CategorySummary>,
    pub stocks: Vec<StockDetail>,
    pub total_stock: i64,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new product with its stock rows
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductWithDetails, ServiceError> {
        let db = &*self.db;

        if Product::find()
            .filter(product::Column::Sku.eq(&input.sku))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("SKU already exists".to_string()));
        }

        let category = Category::find_by_id(input.category_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        if !category.active {
            return Err(ServiceError::ValidationError(
                "Cannot associate with an inactive category".to_string(),
            ));
        }

        Self::validate_stocks(db, &input.stock).await?;
        Self::validate_images(input.active, &input.images)?;

        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let product = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            detailed_description: Set(input.detailed_description),
            category_id: Set(input.category_id),
            price: Set(input.price),
            promotional_price: Set(input.promotional_price),
            sku: Set(input.sku),
            ean_upc: Set(input.ean_upc),
            sizes: Set(serde_json::json!(input.sizes)),
            colors: Set(serde_json::json!(input.colors)),
            images: Set(serde_json::json!(input.images)),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = db.begin().await?;
        product.insert(&txn).await?;
        Self::insert_stock_rows(&txn, product_id, &input.stock).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!(product_id = %product_id, "Product created");
        self.find_one(product_id).await
    }

    /// List products with pagination and filters, newest first. The
    /// stock/promotional filters apply to the fetched page.
    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        page: u64,
        limit: u64,
        filters: ProductFilters,
    ) -> Result<(Vec<ProductWithDetails>, u64), ServiceError> {
        let db = &*self.db;

        let mut query = Product::find();
        if let Some(category_id) = filters.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(active) = filters.active {
            query = query.filter(product::Column::Active.eq(active));
        }
        query = query.order_by_desc(product::Column::CreatedAt);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let details = Self::assemble_details(db, products).await?;
        let details = details
            .into_iter()
            .filter(|p| {
                if let Some(has_stock) = filters.has_stock {
                    if has_stock != (p.total_stock > 0) {
                        return false;
                    }
                }
                if let Some(has_promo) = filters.has_promotional_price {
                    if has_promo != p.product.promotional_price.is_some() {
                        return false;
                    }
                }
                true
            })
            .collect();

        Ok((details, total))
    }

    /// Get a product by ID with category and stock details
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<ProductWithDetails, ServiceError> {
        let db = &*self.db;

        let product = Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let mut details = Self::assemble_details(db, vec![product]).await?;
        Ok(details.remove(0))
    }

    /// Update a product; when stock entries are supplied the existing rows
    /// are replaced inside the same transaction as the field update.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductWithDetails, ServiceError> {
        let db = &*self.db;

        let current = Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        if let Some(ref sku) = input.sku {
            if *sku != current.sku
                && Product::find()
                    .filter(product::Column::Sku.eq(sku))
                    .one(db)
                    .await?
                    .is_some()
            {
                return Err(ServiceError::Conflict("SKU already exists".to_string()));
            }
        }

        if let Some(category_id) = input.category_id {
            if category_id != current.category_id {
                let category = Category::find_by_id(category_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

                if !category.active {
                    return Err(ServiceError::ValidationError(
                        "Cannot associate with an inactive category".to_string(),
                    ));
                }
            }
        }

        if let Some(ref stock) = input.stock {
            Self::validate_stocks(db, stock).await?;
        }

        if input.active == Some(true) {
            let images = input
                .images
                .clone()
                .unwrap_or_else(|| current.images_list());
            Self::validate_images(true, &images)?;

            let category_id = input.category_id.unwrap_or(current.category_id);
            let category = Category::find_by_id(category_id).one(db).await?;
            if !matches!(category, Some(ref c) if c.active) {
                return Err(ServiceError::ValidationError(
                    "Cannot activate product with inactive category".to_string(),
                ));
            }
        } else if let Some(ref images) = input.images {
            Self::validate_images(input.active.unwrap_or(current.active), images)?;
        }

        let txn = db.begin().await?;

        if let Some(ref stock) = input.stock {
            StockByStore::delete_many()
                .filter(stock_by_store::Column::ProductId.eq(id))
                .exec(&txn)
                .await?;
            Self::insert_stock_rows(&txn, id, stock).await?;
        }

        let mut active_model: product::ActiveModel = current.into();
        if let Some(name) = input.name {
            active_model.name = Set(name);
        }
        if let Some(detailed_description) = input.detailed_description {
            active_model.detailed_description = Set(detailed_description);
        }
        if let Some(category_id) = input.category_id {
            active_model.category_id = Set(category_id);
        }
        if let Some(price) = input.price {
            active_model.price = Set(price);
        }
        if let Some(promotional_price) = input.promotional_price {
            active_model.promotional_price = Set(promotional_price);
        }
        if let Some(sku) = input.sku {
            active_model.sku = Set(sku);
        }
        if let Some(ean_upc) = input.ean_upc {
            active_model.ean_upc = Set(Some(ean_upc));
        }
        if let Some(sizes) = input.sizes {
            active_model.sizes = Set(serde_json::json!(sizes));
        }
        if let Some(colors) = input.colors {
            active_model.colors = Set(serde_json::json!(colors));
        }
        if let Some(images) = input.images {
            active_model.images = Set(serde_json::json!(images));
        }
        if let Some(active) = input.active {
            active_model.active = Set(active);
        }
        active_model.updated_at = Set(Utc::now());

        active_model.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(id))
            .await;

        info!(product_id = %id, "Product updated");
        self.find_one(id).await
    }

    /// Delete a product and its stock rows
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;

        Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let txn = db.begin().await?;
        StockByStore::delete_many()
            .filter(stock_by_store::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        Product::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Upsert the stock row for a (product, store) pair
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        product_id: Uuid,
        store_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;

        Product::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product with ID {} not found", product_id))
            })?;

        Store::find_by_id(store_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", store_id)))?;

        let txn = db.begin().await?;

        let existing = StockByStore::find()
            .filter(stock_by_store::Column::ProductId.eq(product_id))
            .filter(stock_by_store::Column::StoreId.eq(store_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        match existing {
            Some(row) => {
                let mut row: stock_by_store::ActiveModel = row.into();
                row.quantity = Set(quantity);
                row.updated_at = Set(now);
                row.update(&txn).await?;
            }
            None => {
                let row = stock_by_store::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    store_id: Set(store_id),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                row.insert(&txn).await?;
            }
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::StockUpdated {
                product_id,
                store_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// Active products sitting in the Uncategorized sentinel category,
    /// ordered by name. Empty when the sentinel was never created.
    #[instrument(skip(self))]
    pub async fn products_without_category(
        &self,
    ) -> Result<Vec<ProductWithDetails>, ServiceError> {
        let db = &*self.db;

        let Some(uncategorized) = Category::find()
            .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
            .one(db)
            .await?
        else {
            return Ok(Vec::new());
        };

        let products = Product::find()
            .filter(product::Column::CategoryId.eq(uncategorized.id))
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        Self::assemble_details(db, products).await
    }

    /// Count of active products in the Uncategorized sentinel category
    #[instrument(skip(self))]
    pub async fn products_without_category_count(&self) -> Result<u64, ServiceError> {
        let db = &*self.db;

        let Some(uncategorized) = Category::find()
            .filter(category::Column::Slug.eq(UNCATEGORIZED_SLUG))
            .one(db)
            .await?
        else {
            return Ok(0);
        };

        Product::find()
            .filter(product::Column::CategoryId.eq(uncategorized.id))
            .filter(product::Column::Active.eq(true))
            .count(db)
            .await
            .map_err(Into::into)
    }

    /// Products whose stock rows sum to zero
    #[instrument(skip(self))]
    pub async fn products_without_stock(&self) -> Result<Vec<ProductWithDetails>, ServiceError> {
        let db = &*self.db;

        let products = Product::find()
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        let details = Self::assemble_details(db, products).await?;
        Ok(details
            .into_iter()
            .filter(|p| p.total_stock == 0)
            .collect())
    }

    /// Active products carrying a promotional price
    #[instrument(skip(self))]
    pub async fn products_with_promotional_price(
        &self,
    ) -> Result<Vec<ProductWithDetails>, ServiceError> {
        let db = &*self.db;

        let products = Product::find()
            .filter(product::Column::PromotionalPrice.is_not_null())
            .filter(product::Column::Active.eq(true))
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        Self::assemble_details(db, products).await
    }

    // -- internal helpers

    fn validate_images(active: bool, images: &[String]) -> Result<(), ServiceError> {
        if active && images.is_empty() {
            return Err(ServiceError::ValidationError(
                "Active products must have at least one image".to_string(),
            ));
        }
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(ServiceError::ValidationError(format!(
                "A product can carry at most {} images",
                MAX_PRODUCT_IMAGES
            )));
        }
        Ok(())
    }

    /// Every stock entry must point at an existing, active store.
    async fn validate_stocks<C: ConnectionTrait>(
        db: &C,
        stocks: &[StockEntryInput],
    ) -> Result<(), ServiceError> {
        for entry in stocks {
            if entry.quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock quantity cannot be negative".to_string(),
                ));
            }

            let store = Store::find_by_id(entry.store_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Store with ID {} not found", entry.store_id))
                })?;

            if !store.active {
                return Err(ServiceError::ValidationError(format!(
                    "Cannot add stock to inactive store (ID: {})",
                    entry.store_id
                )));
            }
        }
        Ok(())
    }

    async fn insert_stock_rows<C: ConnectionTrait>(
        db: &C,
        product_id: Uuid,
        stocks: &[StockEntryInput],
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        for entry in stocks {
            let row = stock_by_store::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                store_id: Set(entry.store_id),
                quantity: Set(entry.quantity),
                created_at: Set(now),
                updated_at: Set(now),
            };
            row.insert(db).await?;
        }
        Ok(())
    }

    /// Join products with their category summaries and stock rows in three
    /// batched queries instead of one round-trip per product.
    pub(crate) async fn assemble_details<C: ConnectionTrait>(
        db: &C,
        products: Vec<ProductModel>,
    ) -> Result<Vec<ProductWithDetails>, ServiceError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let category_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let categories: HashMap<Uuid, CategoryModel> = Category::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let stock_rows = StockByStore::find()
            .filter(stock_by_store::Column::ProductId.is_in(product_ids))
            .all(db)
            .await?;

        let store_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = stock_rows.iter().map(|s| s.store_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let stores: HashMap<Uuid, StoreModel> = Store::find()
            .filter(store::Column::Id.is_in(store_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut stocks_by_product: HashMap<Uuid, Vec<StockDetail>> = HashMap::new();
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for row in stock_rows {
            let store = stores.get(&row.store_id).map(|s| StoreSummary {
                id: s.id,
                name: s.name.clone(),
                store_type: s.store_type,
            });
            *totals.entry(row.product_id).or_default() += i64::from(row.quantity);
            stocks_by_product
                .entry(row.product_id)
                .or_default()
                .push(StockDetail {
                    store_id: row.store_id,
                    store,
                    quantity: row.quantity,
                });
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let category = categories.get(&p.category_id).map(|c| CategorySummary {
                    id: c.id,
                    name: c.name.clone(),
                });
                let stocks = stocks_by_product.remove(&p.id).unwrap_or_default();
                let total_stock = totals.get(&p.id).copied().unwrap_or(0);
                ProductWithDetails {
                    product: p,
                    category,
                    stocks,
                    total_stock,
                }
            })
            .collect())
    }
}
