//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.
//!
//! Deletes never look at dependent rows: the guards in
//! `services::guards` own that check.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::DomainError;
use crate::models::{Borrower, Building, Key, Room};

fn required(value: &str, message: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(message.to_string()));
    }
    Ok(())
}

/// Input for creating or updating a building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingInput {
    pub name: String,
}

impl BuildingInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        required(&self.name, "le nom du bâtiment est requis")
    }
}

/// Input for creating or updating a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInput {
    pub name: String,
    pub room_type: Option<String>,
    pub building_id: i32,
}

impl RoomInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        required(&self.name, "le nom de la salle est requis")?;
        if self.building_id <= 0 {
            return Err(DomainError::Validation(
                "veuillez sélectionner un bâtiment".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input for creating or updating a key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInput {
    pub number: String,
    pub description: Option<String>,
    pub quantity_total: i32,
    pub quantity_reserve: i32,
    pub storage_location: Option<String>,
}

impl KeyInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        required(&self.number, "le numéro de la clé est requis")?;
        if self.quantity_total < 1 {
            return Err(DomainError::Validation(
                "la quantité totale doit être un nombre positif".to_string(),
            ));
        }
        if self.quantity_reserve < 0 {
            return Err(DomainError::Validation(
                "la quantité en réserve doit être un nombre positif ou zéro".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input for creating or updating a borrower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowerInput {
    pub name: String,
    pub email: Option<String>,
}

impl BorrowerInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        required(&self.name, "le nom est requis")
    }
}

/// Repository trait for Building entity
#[async_trait]
pub trait BuildingRepository: Send + Sync {
    /// All buildings ordered by name
    async fn find_all(&self) -> Result<Vec<Building>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Building>, DomainError>;

    async fn create(&self, input: BuildingInput) -> Result<Building, DomainError>;

    async fn update(&self, id: i32, input: BuildingInput) -> Result<Building, DomainError>;

    /// Delete a building; its rooms and their associations cascade
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Repository trait for Room entity
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// All rooms ordered by name
    async fn find_all(&self) -> Result<Vec<Room>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Room>, DomainError>;

    /// Rooms of one building ordered by name
    async fn find_by_building(&self, building_id: i32) -> Result<Vec<Room>, DomainError>;

    /// Keys that open the room, ordered by number
    async fn keys_for_room(&self, room_id: i32) -> Result<Vec<Key>, DomainError>;

    async fn create(&self, input: RoomInput) -> Result<Room, DomainError>;

    async fn update(&self, id: i32, input: RoomInput) -> Result<Room, DomainError>;

    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Repository trait for Key entity
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// All keys ordered by number
    async fn find_all(&self) -> Result<Vec<Key>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Key>, DomainError>;

    /// Rooms opened by the key, ordered by name
    async fn rooms_for_key(&self, key_id: i32) -> Result<Vec<Room>, DomainError>;

    /// Insert the key and its room associations in one transaction
    async fn create(&self, input: KeyInput, room_ids: Vec<i32>) -> Result<Key, DomainError>;

    /// Update every field and replace the room associations in one transaction
    async fn update(
        &self,
        id: i32,
        input: KeyInput,
        room_ids: Vec<i32>,
    ) -> Result<Key, DomainError>;

    /// Delete a key; associations and loans cascade
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Repository trait for Borrower entity
#[async_trait]
pub trait BorrowerRepository: Send + Sync {
    /// All borrowers ordered by name
    async fn find_all(&self) -> Result<Vec<Borrower>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Borrower>, DomainError>;

    async fn create(&self, input: BorrowerInput) -> Result<Borrower, DomainError>;

    async fn update(&self, id: i32, input: BorrowerInput) -> Result<Borrower, DomainError>;

    /// Delete a borrower; loans cascade
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_input(total: i32, reserve: i32) -> KeyInput {
        KeyInput {
            number: "K001".to_string(),
            description: None,
            quantity_total: total,
            quantity_reserve: reserve,
            storage_location: None,
        }
    }

    #[test]
    fn key_quantities_are_checked() {
        assert!(key_input(1, 0).validate().is_ok());
        assert!(matches!(
            key_input(0, 0).validate(),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            key_input(2, -1).validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn blank_names_are_rejected() {
        let building = BuildingInput {
            name: "   ".to_string(),
        };
        assert!(building.validate().is_err());

        let room = RoomInput {
            name: "Salle 101".to_string(),
            room_type: None,
            building_id: 0,
        };
        assert!(room.validate().is_err());

        let borrower = BorrowerInput {
            name: String::new(),
            email: Some("a@b.c".to_string()),
        };
        assert!(borrower.validate().is_err());
    }
}
