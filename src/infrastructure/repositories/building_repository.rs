//! SeaORM implementation of BuildingRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::domain::{BuildingInput, BuildingRepository, DomainError};
use crate::models::Building;
use crate::models::building::{ActiveModel, Column, Entity as BuildingEntity};

/// SeaORM-based implementation of BuildingRepository
pub struct SeaOrmBuildingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBuildingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BuildingRepository for SeaOrmBuildingRepository {
    async fn find_all(&self) -> Result<Vec<Building>, DomainError> {
        Ok(BuildingEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Building>, DomainError> {
        Ok(BuildingEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: BuildingInput) -> Result<Building, DomainError> {
        input.validate()?;

        let new_building = ActiveModel {
            name: Set(input.name),
            ..Default::default()
        };

        Ok(new_building.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: BuildingInput) -> Result<Building, DomainError> {
        input.validate()?;

        let existing = BuildingEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("bâtiment {id}")))?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = BuildingEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("bâtiment {id}")));
        }

        Ok(())
    }
}
