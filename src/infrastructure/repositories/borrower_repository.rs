//! SeaORM implementation of BorrowerRepository

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::domain::{BorrowerInput, BorrowerRepository, DomainError};
use crate::models::Borrower;
use crate::models::borrower::{ActiveModel, Column, Entity as BorrowerEntity};

/// SeaORM-based implementation of BorrowerRepository
pub struct SeaOrmBorrowerRepository {
    db: DatabaseConnection,
}

impl SeaOrmBorrowerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Empty strings are stored as NULL
fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

#[async_trait]
impl BorrowerRepository for SeaOrmBorrowerRepository {
    async fn find_all(&self) -> Result<Vec<Borrower>, DomainError> {
        Ok(BorrowerEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Borrower>, DomainError> {
        Ok(BorrowerEntity::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, input: BorrowerInput) -> Result<Borrower, DomainError> {
        input.validate()?;

        let new_borrower = ActiveModel {
            name: Set(input.name),
            email: Set(normalize_email(input.email)),
            ..Default::default()
        };

        Ok(new_borrower.insert(&self.db).await?)
    }

    async fn update(&self, id: i32, input: BorrowerInput) -> Result<Borrower, DomainError> {
        input.validate()?;

        let existing = BorrowerEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("emprunteur {id}")))?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.email = Set(normalize_email(input.email));

        Ok(active.update(&self.db).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = BorrowerEntity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("emprunteur {id}")));
        }

        Ok(())
    }
}
