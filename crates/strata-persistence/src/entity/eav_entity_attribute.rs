//! `SeaORM` Entity for eav_entity_attribute table (attribute set membership)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eav_entity_attribute")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub entity_attribute_id: i32,
    pub entity_type_id: i32,
    pub attribute_set_id: i32,
    pub attribute_group_id: i32,
    pub attribute_id: i32,
    pub sort_order: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
