//! `SeaORM` Entity for catalog_product_entity_media_gallery table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_product_entity_media_gallery")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub value_id: i64,
    pub attribute_id: i32,
    pub entity_id: i64,
    pub value: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog_product_entity::Entity",
        from = "Column::EntityId",
        to = "super::catalog_product_entity::Column::EntityId"
    )]
    CatalogProductEntity,
    #[sea_orm(has_many = "super::media_gallery_value::Entity")]
    MediaGalleryValue,
}

impl Related<super::catalog_product_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogProductEntity.def()
    }
}

impl Related<super::media_gallery_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaGalleryValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
