use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::entities::{AuditAction, StoreModel, StoreType};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    IncludeInactiveParams,
};
use crate::services::stores::{CreateStoreInput, StoreWithStockCount, UpdateStoreInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for store endpoints
pub fn stores_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_store))
        .route("/:id", put(update_store))
        .route("/:id", delete(delete_store))
        .with_auth();

    Router::new()
        .route("/", get(list_stores))
        .route("/:id", get(get_store))
        .route("/:id/stock", get(get_store_stock))
        .merge(protected)
}

/// Create a new store
#[utoipa::path(
    post,
    path = "/api/v1/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = StoreResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stores"
)]
pub(crate) async fn create_store(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateStoreInput {
        name: payload.name,
        store_type: payload.store_type,
        full_address: payload.full_address,
        opening_hours: payload.opening_hours,
        active: payload.active.unwrap_or(true),
    };

    let store = state
        .services
        .stores
        .create(input)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_store_action(
            user.user_id,
            AuditAction::Create,
            store.id,
            Some(json!({ "name": store.name })),
        )
        .await
    {
        warn!("Failed to record store audit log: {}", e);
    }

    Ok(created_response(StoreResponse::from(store)))
}

/// List stores
#[utoipa::path(
    get,
    path = "/api/v1/stores",
    params(IncludeInactiveParams),
    responses(
        (status = 200, description = "Stores retrieved", body = Vec<StoreResponse>)
    ),
    tag = "Stores"
)]
pub(crate) async fn list_stores(
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let stores = state
        .services
        .stores
        .find_all(params.include_inactive)
        .await
        .map_err(map_service_error)?;

    let stores: Vec<StoreResponse> = stores.into_iter().map(StoreResponse::from).collect();
    Ok(success_response(stores))
}

/// Get a store by ID
#[utoipa::path(
    get,
    path = "/api/v1/stores/:id",
    params(
        ("id" = Uuid, Path, description = "Store ID")
    ),
    responses(
        (status = 200, description = "Store retrieved", body = StoreResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Stores"
)]
pub(crate) async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let store = state
        .services
        .stores
        .find_one(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(StoreResponse::from(store)))
}

/// Update a store
#[utoipa::path(
    put,
    path = "/api/v1/stores/:id",
    params(
        ("id" = Uuid, Path, description = "Store ID")
    ),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Store updated", body = StoreResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stores"
)]
pub(crate) async fn update_store(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStoreRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateStoreInput {
        name: payload.name,
        store_type: payload.store_type,
        full_address: payload.full_address,
        opening_hours: payload.opening_hours,
        active: payload.active,
    };

    let store = state
        .services
        .stores
        .update(id, input)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_store_action(
            user.user_id,
            AuditAction::Update,
            id,
            Some(json!({ "active": store.active })),
        )
        .await
    {
        warn!("Failed to record store audit log: {}", e);
    }

    Ok(success_response(StoreResponse::from(store)))
}

/// Delete a store and its stock rows
#[utoipa::path(
    delete,
    path = "/api/v1/stores/:id",
    params(
        ("id" = Uuid, Path, description = "Store ID")
    ),
    responses(
        (status = 204, description = "Store deleted"),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Stores"
)]
pub(crate) async fn delete_store(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .stores
        .remove(id)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_store_action(user.user_id, AuditAction::Delete, id, None)
        .await
    {
        warn!("Failed to record store audit log: {}", e);
    }

    Ok(no_content_response())
}

/// Stock rows held by a store
#[utoipa::path(
    get,
    path = "/api/v1/stores/:id/stock",
    params(
        ("id" = Uuid, Path, description = "Store ID")
    ),
    responses(
        (status = 200, description = "Stock retrieved", body = Vec<StoreStockResponse>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Stores"
)]
pub(crate) async fn get_store_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entries = state
        .services
        .stores
        .stock_by_store(id)
        .await
        .map_err(map_service_error)?;

    let entries: Vec<StoreStockResponse> = entries
        .into_iter()
        .map(|entry| StoreStockResponse {
            product_id: entry.stock.product_id,
            product_name: entry.product.as_ref().map(|p| p.name.clone()),
            sku: entry.product.as_ref().map(|p| p.sku.clone()),
            product_active: entry.product.as_ref().map(|p| p.active),
            quantity: entry.stock.quantity,
            updated_at: entry.stock.updated_at,
        })
        .collect();

    Ok(success_response(entries))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Downtown Store",
    "store_type": "physical",
    "full_address": "123 Main Street",
    "opening_hours": "Mon-Fri 09:00-18:00",
    "active": true
}))]
pub struct CreateStoreRequest {
    /// Store display name
    #[validate(length(min = 1))]
    pub name: String,
    /// Physical shop or online storefront
    pub store_type: StoreType,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    /// Defaults to true
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStoreRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub store_type: Option<StoreType>,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreResponse {
    pub id: Uuid,
    pub name: String,
    pub store_type: StoreType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of stock rows held by this store, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_count: Option<u64>,
}

impl From<StoreModel> for StoreResponse {
    fn from(model: StoreModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            store_type: model.store_type,
            full_address: model.full_address,
            opening_hours: model.opening_hours,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            stock_count: None,
        }
    }
}

impl From<StoreWithStockCount> for StoreResponse {
    fn from(value: StoreWithStockCount) -> Self {
        let mut response = Self::from(value.store);
        response.stock_count = Some(value.stock_count);
        response
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreStockResponse {
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_active: Option<bool>,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}
