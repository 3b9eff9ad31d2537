use crate::auth::{AuthRouterExt, AuthenticatedUser};
use crate::entities::AuditAction;
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    IncludeInactiveParams,
};
use crate::services::categories::{
    CategoryTreeNode, CategoryWithRelations, CreateCategoryInput, UpdateCategoryInput,
};
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

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
        .with_auth();

    Router::new()
        .route("/", get(list_categories))
        .route("/hierarchy", get(get_hierarchy))
        .route("/:id", get(get_category))
        .merge(protected)
}

/// Create a new category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Parent category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub(crate) async fn create_category(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateCategoryInput {
        name: payload.name,
        description: payload.description,
        slug: payload.slug,
        parent_id: payload.parent_id,
        active: payload.active.unwrap_or(true),
    };

    let category = state
        .services
        .categories
        .create(input)
        .await
        .map_err(map_service_error)?;

    let details = json!({ "name": category.category.name, "slug": category.category.slug });
    if let Err(e) = state
        .services
        .audit
        .log_category_action(user.user_id, AuditAction::Create, category.category.id, Some(details))
        .await
    {
        warn!("Failed to record category audit log: {}", e);
    }

    Ok(created_response(CategoryResponse::from(category)))
}

/// List categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(IncludeInactiveParams),
    responses(
        (status = 200, description = "Categories retrieved", body = Vec<CategoryResponse>)
    ),
    tag = "Categories"
)]
pub(crate) async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<IncludeInactiveParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .find_all(params.include_inactive)
        .await
        .map_err(map_service_error)?;

    let categories: Vec<CategoryResponse> =
        categories.into_iter().map(CategoryResponse::from).collect();

    Ok(success_response(categories))
}

/// Active category tree, roots first
#[utoipa::path(
    get,
    path = "/api/v1/categories/hierarchy",
    responses(
        (status = 200, description = "Hierarchy retrieved", body = Vec<CategoryResponse>)
    ),
    tag = "Categories"
)]
pub(crate) async fn get_hierarchy(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tree = state
        .services
        .categories
        .get_hierarchy()
        .await
        .map_err(map_service_error)?;

    let tree: Vec<CategoryResponse> = tree.into_iter().map(CategoryResponse::from_node).collect();

    Ok(success_response(tree))
}

/// Get a category by ID
#[utoipa::path(
    get,
    path = "/api/v1/categories/:id",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category retrieved", body = CategoryResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Categories"
)]
pub(crate) async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .find_one(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CategoryResponse::from(category)))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/v1/categories/:id",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub(crate) async fn update_category(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateCategoryInput {
        name: payload.name,
        description: payload.description,
        slug: payload.slug,
        parent_id: payload.parent_id,
        active: payload.active,
    };

    let category = state
        .services
        .categories
        .update(id, input)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_category_action(
            user.user_id,
            AuditAction::Update,
            id,
            Some(json!({ "active": category.category.active })),
        )
        .await
    {
        warn!("Failed to record category audit log: {}", e);
    }

    Ok(success_response(CategoryResponse::from(category)))
}

/// Delete a category and its subtree
#[utoipa::path(
    delete,
    path = "/api/v1/categories/:id",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Categories"
)]
pub(crate) async fn delete_category(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .categories
        .remove(id)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state
        .services
        .audit
        .log_category_action(user.user_id, AuditAction::Delete, id, None)
        .await
    {
        warn!("Failed to record category audit log: {}", e);
    }

    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "T-Shirts",
    "description": "Cotton t-shirts in assorted colors and cuts",
    "slug": "t-shirts",
    "parent_id": null,
    "active": true
}))]
pub struct CreateCategoryRequest {
    /// Category display name
    #[validate(length(min = 1))]
    #[schema(example = "T-Shirts")]
    pub name: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// URL-safe unique identifier
    #[validate(length(min = 1))]
    #[schema(example = "t-shirts")]
    pub slug: String,
    /// Optional parent category; at most two nesting levels below roots
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Defaults to true
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub slug: Option<String>,
    /// Omit to keep the current parent; send `null` to detach the category.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    /// Category UUID
    pub id: Uuid,
    /// Category display name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL-safe unique identifier
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Direct parent, when loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub parent: Option<Box<CategoryResponse>>,
    /// Direct (or, for the hierarchy endpoint, recursive) children
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(no_recursion)]
    pub children: Vec<CategoryResponse>,
    /// Number of products directly in this category, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
}

impl CategoryResponse {
    fn from_model(model: crate::entities::CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            slug: model.slug,
            parent_id: model.parent_id,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
            parent: None,
            children: Vec::new(),
            product_count: None,
        }
    }

    fn from_node(node: CategoryTreeNode) -> Self {
        let mut response = Self::from_model(node.category);
        response.children = node
            .children
            .into_iter()
            .map(CategoryResponse::from_node)
            .collect();
        response
    }
}

impl From<CategoryWithRelations> for CategoryResponse {
    fn from(value: CategoryWithRelations) -> Self {
        let mut response = Self::from_model(value.category);
        response.parent = value
            .parent
            .map(|p| Box::new(CategoryResponse::from_model(p)));
        response.children = value
            .children
            .into_iter()
            .map(CategoryResponse::from_model)
            .collect();
        response.product_count = value.product_count;
        response
    }
}
