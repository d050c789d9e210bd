//! Domain layer - Pure business abstractions
//!
//! Trait definitions, input types and the domain error type.
//! SeaORM only appears through the entity models the traits return.

pub mod errors;
pub mod repositories;

pub use errors::DomainError;
pub use repositories::*;
