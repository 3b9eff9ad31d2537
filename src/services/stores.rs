use crate::{
    entities::{
        product, stock_by_store, store, Product, StockByStore, StockByStoreModel, Store,
        StoreModel, StoreType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Service for managing stores
#[derive(Clone)]
pub struct StoreService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoreInput {
    pub name: String,
    pub store_type: StoreType,
    pub full_address: Option<String>,
    pub opening_hours: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStoreInput {
    pub name: Option<String>,
    pub store_type: Option<StoreType>,
    pub full_address: Option<String>,
    pub opening_hours: Option<String>,
    pub active: Option<bool>,
}

/// Store together with the number of stock rows it holds
#[derive(Debug, Clone, Serialize)]
pub struct StoreWithStockCount {
    pub store: StoreModel,
    pub stock_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub active: bool,
}

/// Stock row of a store joined with its product summary
#[derive(Debug, Clone, Serialize)]
pub struct StoreStockEntry {
    pub stock: StockByStoreModel,
    pub product: Option<ProductSummary>,
}

impl StoreService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new store
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateStoreInput) -> Result<StoreModel, ServiceError> {
        let db = &*self.db;

        let now = Utc::now();
        let store = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            store_type: Set(input.store_type),
            full_address: Set(input.full_address),
            opening_hours: Set(input.opening_hours),
            active: Set(input.active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let store = store.insert(db).await?;

        self.event_sender
            .send_or_log(Event::StoreCreated(store.id))
            .await;

        info!(store_id = %store.id, "Store created");
        Ok(store)
    }

    /// List stores ordered by name, optionally including inactive ones
    #[instrument(skip(self))]
    pub async fn find_all(&self, include_inactive: bool) -> Result<Vec<StoreModel>, ServiceError> {
        let db = &*self.db;

        let mut query = Store::find();
        if !include_inactive {
            query = query.filter(store::Column::Active.eq(true));
        }

        query
            .order_by_asc(store::Column::Name)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// Get a store by ID with its stock row count
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<StoreWithStockCount, ServiceError> {
        let db = &*self.db;

        let store = Store::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", id)))?;

        let stock_count = StockByStore::find()
            .filter(stock_by_store::Column::StoreId.eq(id))
            .count(db)
            .await?;

        Ok(StoreWithStockCount { store, stock_count })
    }

    /// Update a store
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateStoreInput,
    ) -> Result<StoreModel, ServiceError> {
        let db = &*self.db;

        let current = Store::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", id)))?;

        let mut active_model: store::ActiveModel = current.into();
        if let Some(name) = input.name {
            active_model.name = Set(name);
        }
        if let Some(store_type) = input.store_type {
            active_model.store_type = Set(store_type);
        }
        if let Some(full_address) = input.full_address {
            active_model.full_address = Set(Some(full_address));
        }
        if let Some(opening_hours) = input.opening_hours {
            active_model.opening_hours = Set(Some(opening_hours));
        }
        if let Some(active) = input.active {
            active_model.active = Set(active);
        }
        active_model.updated_at = Set(Utc::now());

        let updated = active_model.update(db).await?;

        self.event_sender
            .send_or_log(Event::StoreUpdated(id))
            .await;

        info!(store_id = %id, "Store updated");
        Ok(updated)
    }

    /// Delete a store and its stock rows in one transaction
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;

        Store::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", id)))?;

        let txn = db.begin().await?;
        StockByStore::delete_many()
            .filter(stock_by_store::Column::StoreId.eq(id))
            .exec(&txn)
            .await?;
        Store::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::StoreDeleted(id))
            .await;

        info!(store_id = %id, "Store deleted");
        Ok(())
    }

    /// Stock rows of a store joined with product summaries
    #[instrument(skip(self))]
    pub async fn stock_by_store(&self, store_id: Uuid) -> Result<Vec<StoreStockEntry>, ServiceError> {
        let db = &*self.db;

        Store::find_by_id(store_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", store_id)))?;

        let rows = StockByStore::find()
            .filter(stock_by_store::Column::StoreId.eq(store_id))
            .all(db)
            .await?;

        let product_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let products: HashMap<Uuid, ProductSummary> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProductSummary {
                        id: p.id,
                        name: p.name,
                        sku: p.sku,
                        active: p.active,
                    },
                )
            })
            .collect();

        Ok(rows
            .into_iter()
            .map(|stock| {
                let product = products.get(&stock.product_id).cloned();
                StoreStockEntry { stock, product }
            })
            .collect())
    }
}
