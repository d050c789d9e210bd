//! SeaORM implementation of KeyRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{DomainError, KeyInput, KeyRepository};
use crate::models::key::{ActiveModel, Column, Entity as KeyEntity};
use crate::models::key_room::{self, Entity as KeyRoomEntity};
use crate::models::room::{self, Entity as RoomEntity};
use crate::models::{Key, Room};

/// SeaORM-based implementation of KeyRepository
pub struct SeaOrmKeyRepository {
    db: DatabaseConnection,
}

impl SeaOrmKeyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Drop every association of the key, then link it to `room_ids`.
async fn replace_rooms(
    txn: &DatabaseTransaction,
    key_id: i32,
    room_ids: &[i32],
) -> Result<(), DomainError> {
    KeyRoomEntity::delete_many()
        .filter(key_room::Column::KeyId.eq(key_id))
        .exec(txn)
        .await?;

    for room_id in room_ids {
        key_room::ActiveModel {
            key_id: Set(key_id),
            room_id: Set(*room_id),
        }
        .insert(txn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl KeyRepository for SeaOrmKeyRepository {
    async fn find_all(&self) -> Result<Vec<Key>, DomainError> {
        Ok(KeyEntity::find()
            .order_by_asc(Column::Number)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Key>, DomainError> {
        Ok(KeyEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn rooms_for_key(&self, key_id: i32) -> Result<Vec<Room>, DomainError> {
        let key = KeyEntity::find_by_id(key_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("clé {key_id}")))?;

        Ok(key
            .find_related(RoomEntity)
            .order_by_asc(room::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn create(&self, input: KeyInput, room_ids: Vec<i32>) -> Result<Key, DomainError> {
        input.validate()?;

        // Dropping the transaction on error rolls it back
        let txn = self.db.begin().await?;

        let key = ActiveModel {
            number: Set(input.number),
            description: Set(input.description),
            quantity_total: Set(input.quantity_total),
            quantity_reserve: Set(input.quantity_reserve),
            storage_location: Set(input.storage_location),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        replace_rooms(&txn, key.id, &room_ids).await?;

        txn.commit().await?;
        tracing::debug!("Clé {} créée avec {} salle(s)", key.number, room_ids.len());
        Ok(key)
    }

    async fn update(
        &self,
        id: i32,
        input: KeyInput,
        room_ids: Vec<i32>,
    ) -> Result<Key, DomainError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let existing = KeyEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("clé {id}")))?;

        let mut active: ActiveModel = existing.into();
        active.number = Set(input.number);
        active.description = Set(input.description);
        active.quantity_total = Set(input.quantity_total);
        active.quantity_reserve = Set(input.quantity_reserve);
        active.storage_location = Set(input.storage_location);
        let key = active.update(&txn).await?;

        replace_rooms(&txn, id, &room_ids).await?;

        txn.commit().await?;
        Ok(key)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = KeyEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("clé {id}")));
        }

        Ok(())
    }
}
