//! SeaORM entities for the catalog tables the relational side keeps
//!
//! The per-backend-type EAV value tables (`catalog_product_entity_int`, ...)
//! share one shape and are addressed with raw statements instead of entities.

pub mod catalog_eav_attribute;
pub mod catalog_product_entity;
pub mod core_store;
pub mod eav_attribute;
pub mod eav_entity_attribute;
pub mod eav_entity_type;
pub mod media_gallery;
pub mod media_gallery_value;

pub mod prelude {
    pub use super::catalog_eav_attribute::Entity as CatalogEavAttribute;
    pub use super::catalog_product_entity::Entity as CatalogProductEntity;
    pub use super::core_store::Entity as CoreStore;
    pub use super::eav_attribute::Entity as EavAttribute;
    pub use super::eav_entity_attribute::Entity as EavEntityAttribute;
    pub use super::eav_entity_type::Entity as EavEntityType;
    pub use super::media_gallery::Entity as MediaGallery;
    pub use super::media_gallery_value::Entity as MediaGalleryValue;
}
