use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub number: String,
    pub description: Option<String>,
    /// Physical copies of this key, always >= 1.
    pub quantity_total: i32,
    /// Copies kept back from lending, always >= 0.
    pub quantity_reserve: i32,
    pub storage_location: Option<String>,
}

impl Model {
    /// Copies that may be lent out, before active loans are subtracted.
    pub fn usable(&self) -> i64 {
        i64::from(self.quantity_total) - i64::from(self.quantity_reserve)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan::Entity")]
    Loan,
    #[sea_orm(has_many = "super::key_room::Entity")]
    KeyRoom,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        super::key_room::Relation::Room.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::key_room::Relation::Key.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub type Key = Model;
