use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog CMS API",
        version = "1.0.0",
        description = r#"
# Catalog CMS API

Content-management backend for e-commerce catalogs: products, categories,
stores, per-store stock and audit logging.

## Authentication

Mutating endpoints require a JWT bearer token obtained from `/api/v1/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors use a consistent JSON format with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Category with ID ... not found",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` and `per_page` query parameters
(default 1 / 20, `per_page` capped at 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Registration, login and token endpoints"),
        (name = "Categories", description = "Category tree management endpoints"),
        (name = "Products", description = "Product and stock management endpoints"),
        (name = "Stores", description = "Store management endpoints"),
        (name = "Audit", description = "Audit trail endpoints"),
        (name = "Dashboard", description = "Admin dashboard aggregates"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::profile,

        // Categories
        crate::handlers::categories::create_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_hierarchy,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::update_stock,
        crate::handlers::products::products_without_category,
        crate::handlers::products::products_without_category_count,
        crate::handlers::products::products_without_stock,
        crate::handlers::products::products_with_promotional_price,

        // Stores
        crate::handlers::stores::create_store,
        crate::handlers::stores::list_stores,
        crate::handlers::stores::get_store,
        crate::handlers::stores::update_store,
        crate::handlers::stores::delete_store,
        crate::handlers::stores::get_store_stock,

        // Audit
        crate::handlers::audit::list_audit_logs,
        crate::handlers::audit::recent_activity,
        crate::handlers::audit::user_activity,
        crate::handlers::audit::get_audit_log,

        // Dashboard
        crate::handlers::dashboard::summary,
        crate::handlers::dashboard::alerts,
        crate::handlers::dashboard::recent_activity,
    ),
    components(
        schemas(
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::RefreshTokenRequest,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::TokenPairResponse,

            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,
            crate::handlers::categories::CategoryResponse,

            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::UpdateStockRequest,
            crate::handlers::products::StockEntryRequest,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::StockItemResponse,
            crate::handlers::products::CategoryRef,
            crate::handlers::products::CountResponse,
            crate::handlers::products::MessageResponse,

            crate::handlers::stores::CreateStoreRequest,
            crate::handlers::stores::UpdateStoreRequest,
            crate::handlers::stores::StoreResponse,
            crate::handlers::stores::StoreStockResponse,

            crate::handlers::audit::AuditLogResponse,

            crate::handlers::common::PaginatedResponse<crate::handlers::products::ProductResponse>,
            crate::handlers::common::PaginatedResponse<crate::handlers::audit::AuditLogResponse>,
            crate::handlers::common::PaginationMeta,

            crate::entities::StoreType,
            crate::entities::AuditAction,
            crate::entities::EntityType,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Catalog CMS API"));
        assert!(json.contains("/api/v1/categories"));
        assert!(json.contains("Bearer"));
    }
}
