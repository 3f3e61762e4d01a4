//! `SeaORM` Entity for eav_entity_type table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eav_entity_type")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub entity_type_id: i32,
    pub entity_type_code: String,
    pub entity_table: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
