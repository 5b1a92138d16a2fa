//! Sale item entity - One product line of a sale.
//!
//! Line items are owned by their sale and removed with it. The product reference is
//! nullable so history survives product deletion through the `product_name` snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sale_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning sale
    pub sale_id: i64,
    /// Product sold; `None` once the product is deleted
    pub product_id: Option<i64>,
    /// Product name captured when the line was created, never rewritten
    pub product_name: String,
    /// Units sold
    pub quantity: i64,
    /// Price per unit at the time of sale
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

/// Defines relationships between `SaleItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one sale
    #[sea_orm(
        belongs_to = "super::sale::Entity",
        from = "Column::SaleId",
        to = "super::sale::Column::Id",
        on_delete = "Cascade"
    )]
    Sale,
    /// Each line item optionally references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "SetNull"
    )]
    Product,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
