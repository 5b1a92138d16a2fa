//! Import item entity - One product line of an import.
//!
//! Line items are owned by their import and removed with it. The product reference is
//! nullable so history survives product deletion through the `product_name` snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Import line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning import
    pub import_id: i64,
    /// Product received; `None` once the product is deleted
    pub product_id: Option<i64>,
    /// Product name captured when the line was created, never rewritten
    pub product_name: String,
    /// Units received
    pub quantity: i64,
    /// Cost per unit at the time of import
    pub unit_price: f64,
}

impl Model {
    /// `quantity * unit_price` for this line
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Defines relationships between `ImportItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one import
    #[sea_orm(
        belongs_to = "super::import::Entity",
        from = "Column::ImportId",
        to = "super::import::Column::Id",
        on_delete = "Cascade"
    )]
    Import,
    /// Each line item optionally references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "SetNull"
    )]
    Product,
}

impl Related<super::import::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Import.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
