//! `SeaORM` Entity for catalog_product_entity table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_product_entity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub entity_id: i64,
    pub entity_type_id: i32,
    pub attribute_set_id: i32,
    pub type_id: String,
    pub sku: Option<String>,
    pub has_options: i16,
    pub required_options: i16,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::media_gallery::Entity")]
    MediaGallery,
}

impl Related<super::media_gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaGallery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
