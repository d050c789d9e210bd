//! Services Layer
//!
//! Business rules that span several tables: stock figures, the loan
//! lifecycle and deletion guards. Plain async functions over a connection,
//! callable from the CLI or from tests.

pub mod availability;
pub mod guards;
pub mod loan_service;

pub use availability::KeyWithAvailability;
pub use guards::{DeleteTarget, DeletionCheck, can_delete, delete_checked};
