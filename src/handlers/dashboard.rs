use crate::auth::AuthRouterExt;
use crate::handlers::common::{map_service_error, success_response};
use crate::services::dashboard::{DashboardAlerts, DashboardSummary, RecentActivity};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_RECENT_LIMIT: u64 = 10;

/// Creates the router for dashboard endpoints; all require authentication.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/alerts", get(alerts))
        .route("/recent-activity", get(recent_activity))
        .with_auth()
}

/// Headline counts for the dashboard landing page
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    responses(
        (status = 200, description = "Summary retrieved", body = Object),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub(crate) async fn summary(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary: DashboardSummary = state
        .services
        .dashboard
        .summary()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(summary))
}

/// Data-quality alerts
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/alerts",
    responses(
        (status = 200, description = "Alerts retrieved", body = Object),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub(crate) async fn alerts(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let alerts: DashboardAlerts = state
        .services
        .dashboard
        .alerts()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(alerts))
}

/// Most recently updated products and categories
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/recent-activity",
    params(RecentActivityParams),
    responses(
        (status = 200, description = "Recent activity retrieved", body = Object),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub(crate) async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<RecentActivityParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let activity: RecentActivity = state
        .services
        .dashboard
        .recent_activity(params.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(activity))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentActivityParams {
    #[serde(default)]
    pub limit: Option<u64>,
}
