use crate::auth::AuthRouterExt;
use crate::entities::{AuditAction, AuditLogModel, EntityType};
use crate::handlers::common::{
    map_service_error, success_response, PaginatedResponse, PaginationParams,
};
use crate::services::audit::AuditLogFilters;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const DEFAULT_ACTIVITY_LIMIT: u64 = 20;

/// Creates the router for audit log endpoints; the whole surface requires
/// authentication.
pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/recent", get(recent_activity))
        .route("/user/:user_id", get(user_activity))
        .route("/:id", get(get_audit_log))
        .with_auth()
}

/// List audit entries with filters and pagination
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    params(PaginationParams, AuditFilterParams),
    responses(
        (status = 200, description = "Audit logs retrieved", body = PaginatedResponse<AuditLogResponse>),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Audit"
)]
pub(crate) async fn list_audit_logs(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<AuditFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.check()?;

    let filters = AuditLogFilters {
        user_id: params.user_id,
        action: params.action,
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        product_id: params.product_id,
        category_id: params.category_id,
        store_id: params.store_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };

    let (logs, total) = state
        .services
        .audit
        .find_all(pagination.page, pagination.per_page, filters)
        .await
        .map_err(map_service_error)?;

    let logs: Vec<AuditLogResponse> = logs.into_iter().map(AuditLogResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        logs,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Latest audit entries across all users
#[utoipa::path(
    get,
    path = "/api/v1/audit/recent",
    params(ActivityLimitParams),
    responses(
        (status = 200, description = "Recent entries retrieved", body = Vec<AuditLogResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Audit"
)]
pub(crate) async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityLimitParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let logs = state
        .services
        .audit
        .recent_activity(params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
        .await
        .map_err(map_service_error)?;

    let logs: Vec<AuditLogResponse> = logs.into_iter().map(AuditLogResponse::from).collect();
    Ok(success_response(logs))
}

/// Latest audit entries of one user
#[utoipa::path(
    get,
    path = "/api/v1/audit/user/:user_id",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ActivityLimitParams
    ),
    responses(
        (status = 200, description = "User activity retrieved", body = Vec<AuditLogResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Audit"
)]
pub(crate) async fn user_activity(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ActivityLimitParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let logs = state
        .services
        .audit
        .user_activity(user_id, params.limit.unwrap_or(10))
        .await
        .map_err(map_service_error)?;

    let logs: Vec<AuditLogResponse> = logs.into_iter().map(AuditLogResponse::from).collect();
    Ok(success_response(logs))
}

/// Get a single audit entry
#[utoipa::path(
    get,
    path = "/api/v1/audit/:id",
    params(
        ("id" = Uuid, Path, description = "Audit log ID")
    ),
    responses(
        (status = 200, description = "Audit log retrieved", body = AuditLogResponse),
        (status = 404, description = "Audit log not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Audit"
)]
pub(crate) async fn get_audit_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let log = state
        .services
        .audit
        .find_one(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(AuditLogResponse::from(log)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditFilterParams {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub entity_type: Option<EntityType>,
    #[serde(default)]
    pub entity_id: Option<Uuid>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub store_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityLimitParams {
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogModel> for AuditLogResponse {
    fn from(model: AuditLogModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            product_id: model.product_id,
            category_id: model.category_id,
            store_id: model.store_id,
            details: model.details,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
        }
    }
}
