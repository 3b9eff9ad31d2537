// Core services
pub mod audit;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod stores;
pub mod users;

pub use audit::AuditService;
pub use categories::CategoryService;
pub use dashboard::DashboardService;
pub use products::ProductService;
pub use stores::StoreService;
pub use users::UserService;
