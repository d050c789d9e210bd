use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Free text: "Bureau", "Laboratoire", "Amphithéâtre"...
    pub r#type: Option<String>,
    pub building_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::building::Entity",
        from = "Column::BuildingId",
        to = "super::building::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Building,
    #[sea_orm(has_many = "super::key_room::Entity")]
    KeyRoom,
}

impl Related<super::building::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Building.def()
    }
}

impl Related<super::key::Entity> for Entity {
    fn to() -> RelationDef {
        super::key_room::Relation::Key.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::key_room::Relation::Room.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub type Room = Model;
