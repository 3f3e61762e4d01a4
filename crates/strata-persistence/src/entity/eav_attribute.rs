//! `SeaORM` Entity for eav_attribute table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "eav_attribute")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub attribute_id: i32,
    pub entity_type_id: i32,
    pub attribute_code: String,
    pub backend_type: String,
    pub frontend_input: Option<String>,
    pub is_required: i16,
    pub is_user_defined: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::catalog_eav_attribute::Entity")]
    CatalogEavAttribute,
}

impl Related<super::catalog_eav_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogEavAttribute.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
