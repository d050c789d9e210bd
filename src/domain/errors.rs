//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! Messages are meant to be shown to the user as-is.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before any storage call
    #[error("donnée invalide : {0}")]
    Validation(String),
    /// Row does not exist
    #[error("introuvable : {0}")]
    NotFound(String),
    /// Key has no copy left to lend
    #[error("la clé {0} n'est pas disponible")]
    Unavailable(i32),
    /// Delete refused because dependent rows exist
    #[error("suppression impossible : {0}")]
    Integrity(String),
    /// Store used outside its Open/Closed lifecycle
    #[error("état invalide : {0}")]
    InvalidState(String),
    /// Database/persistence error
    #[error("erreur de base de données : {0}")]
    Database(String),
    /// Filesystem error during backup, restore or reset
    #[error("erreur de fichier : {0}")]
    Io(String),
}

impl DomainError {
    pub fn io(context: &str, e: std::io::Error) -> Self {
        DomainError::Io(format!("{context}: {e}"))
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_message_names_the_key() {
        assert_eq!(
            DomainError::Unavailable(7).to_string(),
            "la clé 7 n'est pas disponible"
        );
    }

    #[test]
    fn io_error_keeps_context() {
        let err = DomainError::io(
            "copie",
            std::io::Error::new(std::io::ErrorKind::NotFound, "absent"),
        );
        assert_eq!(err, DomainError::Io("copie: absent".to_string()));
    }
}
