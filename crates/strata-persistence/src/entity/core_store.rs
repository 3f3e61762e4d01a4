//! `SeaORM` Entity for core_store table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "core_store")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub store_id: i32,
    pub code: String,
    pub website_id: i32,
    pub group_id: i32,
    pub name: String,
    pub sort_order: i16,
    pub is_active: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
