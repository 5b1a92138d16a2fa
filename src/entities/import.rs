//! Import entity - Header of a purchase (stock import) operation.
//!
//! The supplier reference is nullable: deleting the supplier detaches the import instead of
//! deleting it, and `supplier_name` keeps the name captured when the import was recorded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Import database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "imports")]
pub struct Model {
    /// Unique identifier for the import
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Supplier the goods came from; `None` once the supplier is deleted
    pub supplier_id: Option<i64>,
    /// Supplier name captured when the import was recorded
    pub supplier_name: String,
    /// Business date of the import
    pub date: Date,
    /// VAT percentage applied on top of the line item subtotal
    pub tva: f64,
    /// Free-form notes
    pub notes: String,
    /// When the import was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Import and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each import optionally belongs to one supplier
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "SetNull"
    )]
    Supplier,
    /// One import owns many line items
    #[sea_orm(has_many = "super::import_item::Entity")]
    Items,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::import_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
