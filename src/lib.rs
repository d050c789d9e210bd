pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod reports;
pub mod services;

pub use domain::DomainError;
pub use infrastructure::config;
pub use infrastructure::db;
pub use infrastructure::db::Store;
pub use infrastructure::seed;
pub use infrastructure::{AppState, backup, import};
