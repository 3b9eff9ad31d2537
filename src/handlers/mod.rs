pub mod audit;
pub mod auth;
pub mod categories;
pub mod common;
pub mod dashboard;
pub mod products;
pub mod stores;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: crate::services::CategoryService,
    pub products: crate::services::ProductService,
    pub stores: crate::services::StoreService,
    pub audit: crate::services::AuditService,
    pub users: crate::services::UserService,
    pub dashboard: crate::services::DashboardService,
    pub auth: Arc<crate::auth::AuthService>,
}

impl AppServices {
    /// Build the full service container shared by the HTTP handlers
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<crate::auth::AuthService>,
    ) -> Self {
        let audit = crate::services::AuditService::new(db_pool.clone());
        let categories =
            crate::services::CategoryService::new(db_pool.clone(), event_sender.clone());
        let products = crate::services::ProductService::new(db_pool.clone(), event_sender.clone());
        let stores = crate::services::StoreService::new(db_pool.clone(), event_sender.clone());
        let users = crate::services::UserService::new(
            db_pool.clone(),
            auth_service.clone(),
            audit.clone(),
            event_sender.clone(),
        );
        let dashboard = crate::services::DashboardService::new(db_pool, products.clone());

        Self {
            categories,
            products,
            stores,
            audit,
            users,
            dashboard,
            auth: auth_service,
        }
    }
}
