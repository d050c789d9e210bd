//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection, schema and the store handle (db)
//! - Configuration loading (config)
//! - Repository implementations (repositories)
//! - Application state (state)
//! - Backup, restore and reset of the database file (backup)
//! - Legacy database import (import) and demo data (seed)

pub mod backup;
pub mod config;
pub mod db;
pub mod import;
pub mod repositories;
pub mod seed;
pub mod state;

pub use repositories::*;
pub use state::AppState;
