//! Availability accounting
//!
//! `available = quantity_total - quantity_reserve - active loans`, computed
//! on every call from committed rows. Nothing is cached, so a reading is
//! always as fresh as the connection (or transaction) it runs on.

use std::collections::BTreeMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::Key;
use crate::models::borrower::{self, Entity as Borrower};
use crate::models::key::{self, Entity as KeyEntity};
use crate::models::loan::{self, Entity as Loan};

/// A key with its live stock figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyWithAvailability {
    #[serde(flatten)]
    pub key: Key,
    pub loaned_count: i64,
    pub available_count: i64,
    /// Holders of the active loans, oldest loan first
    pub borrower_names: Vec<String>,
}

impl KeyWithAvailability {
    pub fn is_borrowable(&self) -> bool {
        self.available_count > 0
    }
}

/// Number of unreturned loans for a key
pub async fn active_loan_count<C: ConnectionTrait>(db: &C, key_id: i32) -> Result<i64, DomainError> {
    let count = Loan::find()
        .filter(loan::Column::KeyId.eq(key_id))
        .filter(loan::Column::ReturnDate.is_null())
        .count(db)
        .await?;
    Ok(count as i64)
}

/// Copies of the key that can be lent right now. Negative when the key
/// is over-lent (reserve raised after loans were made).
pub async fn available_count<C: ConnectionTrait>(db: &C, key_id: i32) -> Result<i64, DomainError> {
    let key = KeyEntity::find_by_id(key_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("clé {key_id}")))?;

    Ok(key.usable() - active_loan_count(db, key_id).await?)
}

pub async fn is_borrowable<C: ConnectionTrait>(db: &C, key_id: i32) -> Result<bool, DomainError> {
    Ok(available_count(db, key_id).await? > 0)
}

/// Every key, ordered by number, with loaned/available counts and borrower names
pub async fn keys_with_availability<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<KeyWithAvailability>, DomainError> {
    let keys = KeyEntity::find()
        .order_by_asc(key::Column::Number)
        .all(db)
        .await?;

    let active_loans = Loan::find()
        .filter(loan::Column::ReturnDate.is_null())
        .order_by_asc(loan::Column::LoanDate)
        .order_by_asc(loan::Column::Id)
        .find_also_related(Borrower)
        .all(db)
        .await?;

    let mut holders: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for (loan, borrower) in active_loans {
        let name = borrower
            .map(|b: borrower::Model| b.name)
            .unwrap_or_else(|| "Inconnu".to_string());
        holders.entry(loan.key_id).or_default().push(name);
    }

    Ok(keys
        .into_iter()
        .map(|key| {
            let borrower_names = holders.remove(&key.id).unwrap_or_default();
            let loaned_count = borrower_names.len() as i64;
            KeyWithAvailability {
                available_count: key.usable() - loaned_count,
                loaned_count,
                borrower_names,
                key,
            }
        })
        .collect())
}

/// Keys that can be lent, ordered by number
pub async fn available_keys<C: ConnectionTrait>(db: &C) -> Result<Vec<Key>, DomainError> {
    Ok(keys_with_availability(db)
        .await?
        .into_iter()
        .filter(KeyWithAvailability::is_borrowable)
        .map(|k| k.key)
        .collect())
}
