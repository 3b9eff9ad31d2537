use crate::{
    entities::{audit_log, AuditAction, AuditLog, AuditLogModel, EntityType},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Service recording and querying who-did-what audit entries. Log writes
/// are best-effort from the callers' perspective: handlers report failures
/// but never roll back the audited operation.
#[derive(Clone)]
pub struct AuditService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLogInput {
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilters {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AuditService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record an audit entry
    #[instrument(skip(self))]
    pub async fn create_log(
        &self,
        input: CreateAuditLogInput,
    ) -> Result<AuditLogModel, ServiceError> {
        let db = &*self.db;

        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(input.user_id),
            action: Set(input.action),
            entity_type: Set(input.entity_type),
            entity_id: Set(input.entity_id),
            product_id: Set(input.product_id),
            category_id: Set(input.category_id),
            store_id: Set(input.store_id),
            details: Set(input.details),
            ip_address: Set(input.ip_address),
            user_agent: Set(input.user_agent),
            created_at: Set(Utc::now()),
        };

        let entry = entry.insert(db).await?;

        info!(
            action = ?entry.action,
            entity_type = ?entry.entity_type,
            user_id = ?entry.user_id,
            "Audit log created"
        );

        Ok(entry)
    }

    /// Record a login
    pub async fn log_login(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(), ServiceError> {
        self.create_log(CreateAuditLogInput {
            user_id: Some(user_id),
            action: AuditAction::Login,
            entity_type: EntityType::User,
            entity_id: Some(user_id),
            product_id: None,
            category_id: None,
            store_id: None,
            details: Some(serde_json::json!({ "action": "user_login" })),
            ip_address,
            user_agent,
        })
        .await?;
        Ok(())
    }

    /// Record a logout
    pub async fn log_logout(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(), ServiceError> {
        self.create_log(CreateAuditLogInput {
            user_id: Some(user_id),
            action: AuditAction::Logout,
            entity_type: EntityType::User,
            entity_id: Some(user_id),
            product_id: None,
            category_id: None,
            store_id: None,
            details: Some(serde_json::json!({ "action": "user_logout" })),
            ip_address,
            user_agent,
        })
        .await?;
        Ok(())
    }

    /// Record an action on a product
    pub async fn log_product_action(
        &self,
        user_id: Uuid,
        action: AuditAction,
        product_id: Uuid,
        details: Option<Value>,
    ) -> Result<(), ServiceError> {
        self.create_log(CreateAuditLogInput {
            user_id: Some(user_id),
            action,
            entity_type: EntityType::Product,
            entity_id: Some(product_id),
            product_id: Some(product_id),
            category_id: None,
            store_id: None,
            details,
            ip_address: None,
            user_agent: None,
        })
        .await?;
        Ok(())
    }

    /// Record an action on a category
    pub async fn log_category_action(
        &self,
        user_id: Uuid,
        action: AuditAction,
        category_id: Uuid,
        details: Option<Value>,
    ) -> Result<(), ServiceError> {
        self.create_log(CreateAuditLogInput {
            user_id: Some(user_id),
            action,
            entity_type: EntityType::Category,
            entity_id: Some(category_id),
            product_id: None,
            category_id: Some(category_id),
            store_id: None,
            details,
            ip_address: None,
            user_agent: None,
        })
        .await?;
        Ok(())
    }

    /// Record an action on a store
    pub async fn log_store_action(
        &self,
        user_id: Uuid,
        action: AuditAction,
        store_id: Uuid,
        details: Option<Value>,
    ) -> Result<(), ServiceError> {
        self.create_log(CreateAuditLogInput {
            user_id: Some(user_id),
            action,
            entity_type: EntityType::Store,
            entity_id: Some(store_id),
            product_id: None,
            category_id: None,
            store_id: Some(store_id),
            details,
            ip_address: None,
            user_agent: None,
        })
        .await?;
        Ok(())
    }

    /// List audit entries with filters and pagination, newest first
    #[instrument(skip(self))]
    pub async fn find_all(
        &self,
        page: u64,
        limit: u64,
        filters: AuditLogFilters,
    ) -> Result<(Vec<AuditLogModel>, u64), ServiceError> {
        let db = &*self.db;

        let mut query = AuditLog::find();
        if let Some(user_id) = filters.user_id {
            query = query.filter(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(action) = filters.action {
            query = query.filter(audit_log::Column::Action.eq(action));
        }
        if let Some(entity_type) = filters.entity_type {
            query = query.filter(audit_log::Column::EntityType.eq(entity_type));
        }
        if let Some(entity_id) = filters.entity_id {
            query = query.filter(audit_log::Column::EntityId.eq(entity_id));
        }
        if let Some(product_id) = filters.product_id {
            query = query.filter(audit_log::Column::ProductId.eq(product_id));
        }
        if let Some(category_id) = filters.category_id {
            query = query.filter(audit_log::Column::CategoryId.eq(category_id));
        }
        if let Some(store_id) = filters.store_id {
            query = query.filter(audit_log::Column::StoreId.eq(store_id));
        }
        if let Some(start_date) = filters.start_date {
            query = query.filter(audit_log::Column::CreatedAt.gte(start_date));
        }
        if let Some(end_date) = filters.end_date {
            query = query.filter(audit_log::Column::CreatedAt.lte(end_date));
        }

        let paginator = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let logs = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((logs, total))
    }

    /// Get a single audit entry
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<AuditLogModel, ServiceError> {
        let db = &*self.db;

        AuditLog::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Audit log with ID {} not found", id)))
    }

    /// Latest entries of a single user
    #[instrument(skip(self))]
    pub async fn user_activity(
        &self,
        user_id: Uuid,
        limit: u64,
    ) -> Result<Vec<AuditLogModel>, ServiceError> {
        let db = &*self.db;

        AuditLog::find()
            .filter(audit_log::Column::UserId.eq(user_id))
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// Latest entries across all users
    #[instrument(skip(self))]
    pub async fn recent_activity(&self, limit: u64) -> Result<Vec<AuditLogModel>, ServiceError> {
        let db = &*self.db;

        AuditLog::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
            .map_err(Into::into)
    }
}
