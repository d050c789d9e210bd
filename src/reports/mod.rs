//! Printable documents
//!
//! Data is first projected into ordered structures (`key_plan`,
//! `loans_by_borrower`), then rendered to standalone HTML by [`html`] and
//! written under the documents directory by [`documents`].

pub mod documents;
pub mod html;

use std::collections::BTreeMap;

use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::key::Entity as KeyEntity;
use crate::models::key_room::Entity as KeyRoom;
use crate::models::{Building, Key, LoanWithDetails, Room, building, room};
use crate::services::{KeyWithAvailability, availability, loan_service};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomPlan {
    pub room: Room,
    /// Keys opening this room, by number
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingPlan {
    pub building: Building,
    pub rooms: Vec<RoomPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowerLoans {
    pub borrower_id: i32,
    pub borrower_name: String,
    pub loans: Vec<LoanWithDetails>,
}

/// Which keys open which rooms, building by building.
///
/// Buildings and rooms are sorted by name, keys by number. Buildings without
/// rooms and rooms without keys are kept.
pub async fn key_plan(db: &DatabaseConnection) -> Result<Vec<BuildingPlan>, DomainError> {
    let buildings = building::Entity::find()
        .order_by_asc(building::Column::Name)
        .all(db)
        .await?;
    let rooms = room::Entity::find()
        .order_by_asc(room::Column::Name)
        .order_by_asc(room::Column::Id)
        .all(db)
        .await?;
    let links = KeyRoom::find().find_also_related(KeyEntity).all(db).await?;

    let mut keys_by_room: BTreeMap<i32, Vec<Key>> = BTreeMap::new();
    for (link, key) in links {
        if let Some(key) = key {
            keys_by_room.entry(link.room_id).or_default().push(key);
        }
    }
    for keys in keys_by_room.values_mut() {
        keys.sort_by(|a, b| a.number.cmp(&b.number));
    }

    let mut rooms_by_building: BTreeMap<i32, Vec<RoomPlan>> = BTreeMap::new();
    for room in rooms {
        let keys = keys_by_room.remove(&room.id).unwrap_or_default();
        rooms_by_building
            .entry(room.building_id)
            .or_default()
            .push(RoomPlan { room, keys });
    }

    Ok(buildings
        .into_iter()
        .map(|building| BuildingPlan {
            rooms: rooms_by_building.remove(&building.id).unwrap_or_default(),
            building,
        })
        .collect())
}

/// Active loans grouped per borrower, borrowers by name
pub async fn loans_by_borrower(db: &DatabaseConnection) -> Result<Vec<BorrowerLoans>, DomainError> {
    let loans = loan_service::list_active_loans(db).await?;
    Ok(group_by_borrower(loans))
}

fn group_by_borrower(loans: Vec<LoanWithDetails>) -> Vec<BorrowerLoans> {
    let mut groups: Vec<BorrowerLoans> = Vec::new();
    for loan in loans {
        match groups.iter_mut().find(|g| g.borrower_id == loan.borrower_id) {
            Some(group) => group.loans.push(loan),
            None => groups.push(BorrowerLoans {
                borrower_id: loan.borrower_id,
                borrower_name: loan.borrower_name.clone(),
                loans: vec![loan],
            }),
        }
    }
    groups
}

pub async fn stock_report(db: &DatabaseConnection) -> Result<Vec<KeyWithAvailability>, DomainError> {
    availability::keys_with_availability(db).await
}
