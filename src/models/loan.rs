use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub key_id: i32,
    pub borrower_id: i32,
    pub loan_date: String,
    /// NULL while the key is still out.
    pub return_date: Option<String>,
}

impl Model {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::key::Entity",
        from = "Column::KeyId",
        to = "super::key::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Key,
    #[sea_orm(
        belongs_to = "super::borrower::Entity",
        from = "Column::BorrowerId",
        to = "super::borrower::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Borrower,
}

impl Related<super::key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Key.def()
    }
}

impl Related<super::borrower::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrower.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Loan joined with the key and borrower it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sea_orm::FromQueryResult)]
pub struct LoanWithDetails {
    pub id: i32,
    pub key_id: i32,
    pub borrower_id: i32,
    pub loan_date: String,
    pub return_date: Option<String>,
    pub key_number: String,
    pub key_description: Option<String>,
    pub borrower_name: String,
    pub borrower_email: Option<String>,
}

impl LoanWithDetails {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}
