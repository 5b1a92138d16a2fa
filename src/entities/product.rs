//! Product entity - Represents an item that is bought through imports and sold through sales.
//!
//! Stock quantity is not stored here; it is derived from the import and sale line items
//! that still reference the product.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Steel Rod", "Wool Roll"), unique within a profile
    #[sea_orm(unique)]
    pub name: String,
    /// Purchase cost per unit
    pub unit_price: f64,
    /// Selling price per unit
    pub sale_price: f64,
    /// Free-form category used for grouping
    pub category: String,
    /// Longer description
    pub description: String,
    /// Path of the preview image, relative to the profile `images/` folder
    pub preview_image: Option<String>,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears in many sale line items
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
    /// One product appears in many import line items
    #[sea_orm(has_many = "super::import_item::Entity")]
    ImportItems,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl Related<super::import_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
