//! `SeaORM` Entity for catalog_eav_attribute table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_eav_attribute")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub attribute_id: i32,
    /// 0 = store view, 1 = global, 2 = website
    pub is_global: i16,
    pub is_searchable: i16,
    pub is_filterable: i16,
    pub used_in_product_listing: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::eav_attribute::Entity",
        from = "Column::AttributeId",
        to = "super::eav_attribute::Column::AttributeId"
    )]
    EavAttribute,
}

impl Related<super::eav_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EavAttribute.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
