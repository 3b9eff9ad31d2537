use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// List endpoints never return more than this many items per page.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Reject zero or oversized page parameters before they hit the services.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.page == 0 {
            return Err(ApiError::ValidationError(
                "page must be greater than zero".to_string(),
            ));
        }
        if self.per_page == 0 {
            return Err(ApiError::ValidationError(
                "per_page must be greater than zero".to_string(),
            ));
        }
        if self.per_page > MAX_PAGE_SIZE {
            return Err(ApiError::ValidationError(format!(
                "per_page cannot exceed {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Query flag shared by category and store listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(page, per_page, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_total_pages_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn pagination_params_check_bounds() {
        assert!(PaginationParams {
            page: 0,
            per_page: 20
        }
        .check()
        .is_err());
        assert!(PaginationParams {
            page: 1,
            per_page: 0
        }
        .check()
        .is_err());
        assert!(PaginationParams {
            page: 1,
            per_page: MAX_PAGE_SIZE + 1
        }
        .check()
        .is_err());
        assert!(PaginationParams::default().check().is_ok());
    }
}
