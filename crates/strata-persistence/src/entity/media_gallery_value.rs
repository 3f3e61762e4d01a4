//! `SeaORM` Entity for catalog_product_entity_media_gallery_value table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_product_entity_media_gallery_value")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub value_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub store_id: i32,
    pub label: Option<String>,
    pub position: Option<i32>,
    pub disabled: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::media_gallery::Entity",
        from = "Column::ValueId",
        to = "super::media_gallery::Column::ValueId"
    )]
    MediaGallery,
}

impl Related<super::media_gallery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaGallery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
