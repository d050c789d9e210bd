//! Deletion guards
//!
//! The schema cascades on delete, so removing a building would silently
//! take its rooms, their key links and so on. These checks run before a
//! delete is offered; `delete_checked` refuses to proceed when one fails.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::key_room::{self, Entity as KeyRoom};
use crate::models::room::{self, Entity as Room};
use crate::services::loan_service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DeleteTarget {
    Building(i32),
    Room(i32),
    Key(i32),
    Borrower(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl DeletionCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn blocked(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
        }
    }
}

pub async fn can_delete(
    db: &DatabaseConnection,
    target: DeleteTarget,
) -> Result<DeletionCheck, DomainError> {
    let check = match target {
        DeleteTarget::Building(id) => {
            let rooms = Room::find()
                .filter(room::Column::BuildingId.eq(id))
                .count(db)
                .await?;
            if rooms > 0 {
                DeletionCheck::blocked("Ce bâtiment contient des salles.")
            } else {
                DeletionCheck::allowed()
            }
        }
        DeleteTarget::Room(id) => {
            let links = KeyRoom::find()
                .filter(key_room::Column::RoomId.eq(id))
                .count(db)
                .await?;
            if links > 0 {
                DeletionCheck::blocked("Cette salle est associée à des clés.")
            } else {
                DeletionCheck::allowed()
            }
        }
        DeleteTarget::Key(id) => {
            if loan_service::count_active_loans_for_key(db, id).await? > 0 {
                DeletionCheck::blocked("Cette clé a des emprunts actifs.")
            } else {
                DeletionCheck::allowed()
            }
        }
        DeleteTarget::Borrower(id) => {
            if loan_service::count_active_loans_for_borrower(db, id).await? > 0 {
                DeletionCheck::blocked("Cet emprunteur a des emprunts actifs.")
            } else {
                DeletionCheck::allowed()
            }
        }
    };
    Ok(check)
}

/// Run the guard, then delete through the matching repository.
pub async fn delete_checked(state: &AppState, target: DeleteTarget) -> Result<(), DomainError> {
    let check = can_delete(state.db(), target).await?;
    if !check.allowed {
        let reason = check.reason.unwrap_or_default();
        tracing::warn!("Suppression refusée pour {:?}: {}", target, reason);
        return Err(DomainError::Integrity(reason));
    }

    match target {
        DeleteTarget::Building(id) => state.building_repo.delete(id).await,
        DeleteTarget::Room(id) => state.room_repo.delete(id).await,
        DeleteTarget::Key(id) => state.key_repo.delete(id).await,
        DeleteTarget::Borrower(id) => state.borrower_repo.delete(id).await,
    }
}
