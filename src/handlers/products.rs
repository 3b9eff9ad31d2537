use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::entities::{AuditAction, StoreType};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::services::products::{
    CreateProductInput, ProductFilters, ProductWithDetails, StockEntryInput, UpdateProductInput,
};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Custom validator for Decimal minimum value
fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .route("/:id/stock/:store_id", put(update_stock))
        .with_auth();

    Router::new()
        .route("/", get(list_products))
        .route("/without-category", get(products_without_category))
        .route(
            "/without-category/count",
            get(products_without_category_count),
        )
        .route("/without-stock", get(products_without_stock))
        .route("/promotional", get(products_with_promotional_price))
        .route("/:id", get(get_product))
        .merge(protected)
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category or store not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn create_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateProductInput {
        name: payload.name,
        detailed_description: payload.detailed_description,
        category_id: payload.category_id,
        price: payload.price,
        promotional_price: payload.promotional_price,
        sku: payload.sku,
        ean_upc: payload.ean_upc,
        sizes: payload.sizes,
        colors: payload.colors,
        images: payload.images,
        stock: payload
            .stock
            .into_iter()
            .map(|s| StockEntryInput {
                store_id: s.store_id,
                quantity: s.quantity,
            })
            .collect(),
        active: payload.active.unwrap_or(true),
    };

    let product = state
        .services
        .products
        .create(input)
        .await
        .map_err(map_service_error)?;

    let details = json!({ "name": product.product.name, "sku": product.product.sku });
    if let Err(e) = state
        .services
        .audit
        .log_product_action(user.user_id, AuditAction::Create, product.product.id, Some(details))
        .await
    {
        warn!("Failed to record product audit log: {}", e);
    }

    Ok(created_response(ProductResponse::from(product)))
}

/// List products with pagination and filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams, ProductFilterParams),
    responses(
        (status = 200, description = "Products retrieved", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub(crate) async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filters): Query<ProductFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.check()?;

    let filters = ProductFilters {
        category_id: filters.category_id,
        active: filters.active,
        has_stock: filters.has_stock,
        has_promotional_price: filters.has_promotional_price,
    };

    let (products, total) = state
        .services
        .products
        .find_all(pagination.page, pagination.per_page, filters)
        .await
        .map_err(map_service_error)?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        products,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub(crate) async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .find_one(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn update_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateProductInput {
        name: payload.name,
        detailed_description: payload.detailed_description,
        category_id: payload.category_id,
        price: payload.price,
        promotional_price: payload.promotional_price,
        sku: payload.sku,
        ean_upc: payload.ean_upc,
        sizes: payload.sizes,
        colors: payload.colors,
        images: payload.images,
        stock: payload.stock.map(|entries| {
            entries
                .into_iter()
                .map(|s| StockEntryInput {
                    store_id: s.store_id,
                    quantity: s.quantity,
                })
                .collect()
        }),
        active: payload.active,
    };

    let product = state
        .services
        .products
        .update(id, input)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_product_action(
            user.user_id,
            AuditAction::Update,
            id,
            Some(json!({ "active": product.product.active })),
        )
        .await
    {
        warn!("Failed to record product audit log: {}", e);
    }

    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/:id",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn delete_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .products
        .remove(id)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_product_action(user.user_id, AuditAction::Delete, id, None)
        .await
    {
        warn!("Failed to record product audit log: {}", e);
    }

    Ok(no_content_response())
}

/// Upsert the stock level of a product in a store
#[utoipa::path(
    put,
    path = "/api/v1/products/:id/stock/:store_id",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("store_id" = Uuid, Path, description = "Store ID")
    ),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = MessageResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or store not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn update_stock(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((id, store_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .products
        .update_stock(id, store_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_product_action(
            user.user_id,
            AuditAction::Update,
            id,
            Some(json!({ "store_id": store_id, "quantity": payload.quantity })),
        )
        .await
    {
        warn!("Failed to record product audit log: {}", e);
    }

    Ok(success_response(MessageResponse {
        message: "Stock updated successfully".to_string(),
    }))
}

/// Active products parked in the Uncategorized sentinel category
#[utoipa::path(
    get,
    path = "/api/v1/products/without-category",
    responses(
        (status = 200, description = "Products retrieved", body = Vec<ProductResponse>)
    ),
    tag = "Products"
)]
pub(crate) async fn products_without_category(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .products_without_category()
        .await
        .map_err(map_service_error)?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(products))
}

/// Count of products in the Uncategorized sentinel category
#[utoipa::path(
    get,
    path = "/api/v1/products/without-category/count",
    responses(
        (status = 200, description = "Count retrieved", body = CountResponse)
    ),
    tag = "Products"
)]
pub(crate) async fn products_without_category_count(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .products
        .products_without_category_count()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CountResponse { count }))
}

/// Products whose stock rows sum to zero
#[utoipa::path(
    get,
    path = "/api/v1/products/without-stock",
    responses(
        (status = 200, description = "Products retrieved", body = Vec<ProductResponse>)
    ),
    tag = "Products"
)]
pub(crate) async fn products_without_stock(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .products_without_stock()
        .await
        .map_err(map_service_error)?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(products))
}

/// Active products carrying a promotional price
#[utoipa::path(
    get,
    path = "/api/v1/products/promotional",
    responses(
        (status = 200, description = "Products retrieved", body = Vec<ProductResponse>)
    ),
    tag = "Products"
)]
pub(crate) async fn products_with_promotional_price(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .products_with_promotional_price()
        .await
        .map_err(map_service_error)?;

    let products: Vec<ProductResponse> =
        products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(products))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockEntryRequest {
    pub store_id: Uuid,
    #[validate(range(min = 0))]
    #[schema(example = 12)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Basic Cotton T-Shirt",
    "detailed_description": "Plain crew-neck t-shirt, 100% combed cotton, pre-shrunk.",
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "price": "49.90",
    "promotional_price": "39.90",
    "sku": "TSH-BAS-WHT",
    "ean_upc": "7891234567895",
    "sizes": ["S", "M", "L", "XL"],
    "colors": ["white", "black"],
    "images": ["https://cdn.example.com/products/tsh-bas-wht.jpg"],
    "stock": [{ "store_id": "660e8400-e29b-41d4-a716-446655440001", "quantity": 25 }],
    "active": true
}))]
pub struct CreateProductRequest {
    /// Product display name
    #[validate(length(min = 1))]
    pub name: String,
    /// Long-form description shown on the product page
    #[validate(length(min = 1))]
    pub detailed_description: String,
    /// Category the product belongs to (must exist and be active)
    pub category_id: Uuid,
    /// Sale price
    #[validate(custom = "validate_decimal_min_zero")]
    pub price: Decimal,
    /// Optional promotional price
    #[serde(default)]
    pub promotional_price: Option<Decimal>,
    /// Stock keeping unit (unique)
    #[validate(length(min = 1))]
    pub sku: String,
    /// Optional EAN/UPC barcode
    #[serde(default)]
    pub ean_upc: Option<String>,
    /// Available sizes
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Available colors
    #[serde(default)]
    pub colors: Vec<String>,
    /// Image URLs; active products need 1-8 entries
    #[validate(length(max = 8))]
    #[serde(default)]
    pub images: Vec<String>,
    /// Per-store stock entries
    #[validate]
    #[serde(default)]
    pub stock: Vec<StockEntryRequest>,
    /// Defaults to true
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub detailed_description: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Omit to keep the promotional price; send `null` to clear it.
    #[serde(default)]
    #[schema(value_type = Option<Decimal>)]
    pub promotional_price: Option<Option<Decimal>>,
    #[validate(length(min = 1))]
    pub sku: Option<String>,
    #[serde(default)]
    pub ean_upc: Option<String>,
    #[serde(default)]
    pub sizes: Option<Vec<String>>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[validate]
    #[serde(default)]
    pub stock: Option<Vec<StockEntryRequest>>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStockRequest {
    #[validate(range(min = 0))]
    #[schema(example = 40)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilterParams {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub has_stock: Option<bool>,
    #[serde(default)]
    pub has_promotional_price: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockItemResponse {
    pub store_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_type: Option<StoreType>,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    /// Product UUID
    pub id: Uuid,
    pub name: String,
    pub detailed_description: String,
    pub category_id: Uuid,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotional_price: Option<Decimal>,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ean_upc: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub images: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    pub stock: Vec<StockItemResponse>,
    pub total_stock: i64,
}

impl From<ProductWithDetails> for ProductResponse {
    fn from(value: ProductWithDetails) -> Self {
        let sizes = value.product.sizes_list();
        let colors = value.product.colors_list();
        let images = value.product.images_list();
        let model = value.product;

        Self {
            id: model.id,
            name: model.name,
            detailed_description: model.detailed_description,
            category_id: model.category_id,
            price: model.price,
            promotional_price: model.promotional_price,
            sku: model.sku,
            ean_upc: model.ean_upc,
            sizes,
            colors,
            images,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            category: value.category.map(|c| CategoryRef {
                id: c.id,
                name: c.name,
            }),
            stock: value
                .stocks
                .into_iter()
                .map(|s| StockItemResponse {
                    store_id: s.store_id,
                    store_name: s.store.as_ref().map(|st| st.name.clone()),
                    store_type: s.store.as_ref().map(|st| st.store_type),
                    quantity: s.quantity,
                })
                .collect(),
            total_stock: value.total_stock,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
