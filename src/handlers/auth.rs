use crate::auth::{AuthRouterExt, AuthenticatedUser, TokenPair};
use crate::entities::UserModel;
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::services::users::{LoginInput, RegisterUserInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for authentication endpoints
pub fn auth_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .with_auth();

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .users
        .register(RegisterUserInput {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(UserResponse::from(user)))
}

/// Verify credentials and issue a token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (tokens, user) = state
        .services
        .users
        .login(
            LoginInput {
                email: payload.email,
                password: payload.password,
            },
            client_ip(&headers),
            user_agent(&headers),
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: tokens.token_type,
        expires_in: tokens.expires_in,
        user: UserResponse::from(user),
    }))
}

/// Exchange a refresh token for a fresh pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenPairResponse),
        (status = 401, description = "Invalid refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub(crate) async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let tokens = state
        .services
        .auth
        .refresh_token(&payload.refresh_token)
        .await
        .map_err(|e| ApiError::ServiceError(crate::errors::ServiceError::AuthError(e.to_string())))?;

    Ok(success_response(TokenPairResponse::from(tokens)))
}

/// Record a logout for the audit trail
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = Object),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub(crate) async fn logout(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .users
        .logout(user.user_id, client_ip(&headers), user_agent(&headers))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        json!({ "message": "Successfully logged out" }),
    ))
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Profile retrieved", body = UserResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub(crate) async fn profile(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .services
        .users
        .find_by_id(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse::from(user)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Jane Admin",
    "email": "jane@example.com",
    "password": "SecurePass123!"
}))]
pub struct RegisterRequest {
    /// User's full name
    #[validate(length(min = 1))]
    pub name: String,
    /// Email address (unique)
    #[validate(email)]
    pub email: String,
    /// Password (minimum 8 characters)
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "jane@example.com",
    "password": "SecurePass123!"
}))]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        // password_hash never leaves the service layer
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            refresh_expires_in: pair.refresh_expires_in,
        }
    }
}
