//! Loan Service - lending and returning keys

use chrono::Local;
use sea_orm::*;

use crate::domain::DomainError;
use crate::models::LoanWithDetails;
use crate::models::borrower;
use crate::models::key;
use crate::models::loan::{self, Entity as Loan};
use crate::services::availability;

/// Timestamp format stored in `loan_date` / `return_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Loans joined with key number/description and borrower name/email
fn details_query() -> Select<Loan> {
    Loan::find()
        .select_only()
        .column(loan::Column::Id)
        .column(loan::Column::KeyId)
        .column(loan::Column::BorrowerId)
        .column(loan::Column::LoanDate)
        .column(loan::Column::ReturnDate)
        .column_as(key::Column::Number, "key_number")
        .column_as(key::Column::Description, "key_description")
        .column_as(borrower::Column::Name, "borrower_name")
        .column_as(borrower::Column::Email, "borrower_email")
        .join(JoinType::InnerJoin, loan::Relation::Key.def())
        .join(JoinType::InnerJoin, loan::Relation::Borrower.def())
}

/// Lend one key. No availability check: callers only offer borrowable keys.
pub async fn create_loan(
    db: &DatabaseConnection,
    key_id: i32,
    borrower_id: i32,
) -> Result<loan::Model, DomainError> {
    let new_loan = loan::ActiveModel {
        key_id: Set(key_id),
        borrower_id: Set(borrower_id),
        loan_date: Set(now()),
        return_date: Set(None),
        ..Default::default()
    };

    let saved = new_loan.insert(db).await?;
    tracing::info!(
        "Emprunt #{} créé: clé {} -> emprunteur {}",
        saved.id,
        key_id,
        borrower_id
    );
    Ok(saved)
}

/// Lend several keys to one borrower, all or nothing.
///
/// Availability is re-read inside the transaction before each insert, so
/// a key listed twice only gets two loans if two copies are free. The
/// first unavailable key aborts the batch and nothing is committed.
pub async fn create_multiple_loans(
    db: &DatabaseConnection,
    key_ids: &[i32],
    borrower_id: i32,
) -> Result<Vec<loan::Model>, DomainError> {
    if key_ids.is_empty() {
        return Err(DomainError::Validation(
            "sélectionnez au moins une clé".to_string(),
        ));
    }

    // Dropping the transaction on error rolls it back
    let txn = db.begin().await?;
    let loan_date = now();
    let mut created = Vec::with_capacity(key_ids.len());

    for &key_id in key_ids {
        if !availability::is_borrowable(&txn, key_id).await? {
            tracing::warn!("Emprunt groupé annulé: clé {} indisponible", key_id);
            return Err(DomainError::Unavailable(key_id));
        }

        let saved = loan::ActiveModel {
            key_id: Set(key_id),
            borrower_id: Set(borrower_id),
            loan_date: Set(loan_date.clone()),
            return_date: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(saved);
    }

    txn.commit().await?;
    tracing::info!(
        "{} emprunt(s) créé(s) pour l'emprunteur {}",
        created.len(),
        borrower_id
    );
    Ok(created)
}

/// Mark a loan as returned now.
///
/// Returning an already returned loan overwrites its return date.
pub async fn return_loan(db: &DatabaseConnection, loan_id: i32) -> Result<loan::Model, DomainError> {
    let existing = Loan::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("emprunt {loan_id}")))?;

    if !existing.is_active() {
        tracing::warn!(
            "Emprunt #{} déjà retourné le {:?}, date de retour écrasée",
            loan_id,
            existing.return_date
        );
    }

    let mut active: loan::ActiveModel = existing.into();
    active.return_date = Set(Some(now()));

    let updated = active.update(db).await?;
    tracing::info!("Emprunt #{} retourné", loan_id);
    Ok(updated)
}

/// All active loans, ordered by borrower name then loan date
pub async fn list_active_loans(db: &DatabaseConnection) -> Result<Vec<LoanWithDetails>, DomainError> {
    Ok(details_query()
        .filter(loan::Column::ReturnDate.is_null())
        .order_by_asc(borrower::Column::Name)
        .order_by_asc(loan::Column::LoanDate)
        .order_by_asc(loan::Column::Id)
        .into_model::<LoanWithDetails>()
        .all(db)
        .await?)
}

/// Active loans of one key, oldest first
pub async fn active_loans_for_key(
    db: &DatabaseConnection,
    key_id: i32,
) -> Result<Vec<LoanWithDetails>, DomainError> {
    Ok(details_query()
        .filter(loan::Column::KeyId.eq(key_id))
        .filter(loan::Column::ReturnDate.is_null())
        .order_by_asc(loan::Column::LoanDate)
        .order_by_asc(loan::Column::Id)
        .into_model::<LoanWithDetails>()
        .all(db)
        .await?)
}

/// Active loans of one borrower, oldest first
pub async fn active_loans_for_borrower(
    db: &DatabaseConnection,
    borrower_id: i32,
) -> Result<Vec<LoanWithDetails>, DomainError> {
    Ok(details_query()
        .filter(loan::Column::BorrowerId.eq(borrower_id))
        .filter(loan::Column::ReturnDate.is_null())
        .order_by_asc(loan::Column::LoanDate)
        .order_by_asc(loan::Column::Id)
        .into_model::<LoanWithDetails>()
        .all(db)
        .await?)
}

/// Every loan ever made, newest first
pub async fn list_all_loans(db: &DatabaseConnection) -> Result<Vec<LoanWithDetails>, DomainError> {
    Ok(details_query()
        .order_by_desc(loan::Column::LoanDate)
        .order_by_desc(loan::Column::Id)
        .into_model::<LoanWithDetails>()
        .all(db)
        .await?)
}

/// One loan with key and borrower details
pub async fn get_loan(db: &DatabaseConnection, loan_id: i32) -> Result<LoanWithDetails, DomainError> {
    details_query()
        .filter(loan::Column::Id.eq(loan_id))
        .into_model::<LoanWithDetails>()
        .one(db)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("emprunt {loan_id}")))
}

pub async fn count_active_loans_for_key(
    db: &DatabaseConnection,
    key_id: i32,
) -> Result<i64, DomainError> {
    availability::active_loan_count(db, key_id).await
}

pub async fn count_active_loans_for_borrower(
    db: &DatabaseConnection,
    borrower_id: i32,
) -> Result<i64, DomainError> {
    let count = Loan::find()
        .filter(loan::Column::BorrowerId.eq(borrower_id))
        .filter(loan::Column::ReturnDate.is_null())
        .count(db)
        .await?;
    Ok(count as i64)
}

/// Count every active loan
pub async fn count_active_loans(db: &DatabaseConnection) -> Result<i64, DomainError> {
    let count = Loan::find()
        .filter(loan::Column::ReturnDate.is_null())
        .count(db)
        .await?;
    Ok(count as i64)
}
