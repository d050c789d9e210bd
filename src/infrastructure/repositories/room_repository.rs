//! SeaORM implementation of RoomRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{DomainError, RoomInput, RoomRepository};
use crate::models::key::{self, Entity as KeyEntity};
use crate::models::room::{ActiveModel, Column, Entity as RoomEntity};
use crate::models::{Key, Room};

/// SeaORM-based implementation of RoomRepository
pub struct SeaOrmRoomRepository {
    db: DatabaseConnection,
}

impl SeaOrmRoomRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoomRepository for SeaOrmRoomRepository {
    async fn find_all(&self) -> Result<Vec<Room>, DomainError> {
        Ok(RoomEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Room>, DomainError> {
        Ok(RoomEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn find_by_building(&self, building_id: i32) -> Result<Vec<Room>, DomainError> {
        Ok(RoomEntity::find()
            .filter(Column::BuildingId.eq(building_id))
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn keys_for_room(&self, room_id: i32) -> Result<Vec<Key>, DomainError> {
        let room = RoomEntity::find_by_id(room_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("salle {room_id}")))?;

        Ok(room
            .find_related(KeyEntity)
            .order_by_asc(key::Column::Number)
            .all(&self.db)
            .await?)
    }

    async fn create(&self, input: RoomInput) -> Result<Room, DomainError> {
        input.validate()?;

        let new_room = ActiveModel {
            name: Set(input.name),
            r#type: Set(input.room_type),
            building_id: Set(input.building_id),
            ..Default::default()
        };

        Ok(new_room.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: RoomInput) -> Result<Room, DomainError> {
        input.validate()?;

        let existing = RoomEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("salle {id}")))?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.r#type = Set(input.room_type);
        active.building_id = Set(input.building_id);

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = RoomEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("salle {id}")));
        }

        Ok(())
    }
}
