//! Sale entity - Header of a sales operation.
//!
//! The client reference is nullable: deleting the client detaches the sale instead of
//! deleting it, and `client_name` keeps the name captured when the sale was recorded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Client the sale was made to; `None` once the client is deleted
    pub client_id: Option<i64>,
    /// Client name captured when the sale was recorded
    pub client_name: String,
    /// Business date of the sale
    pub date: Date,
    /// VAT percentage applied on top of the line item subtotal
    pub tva: f64,
    /// Free-form notes
    pub notes: String,
    /// When the sale was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Sale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sale optionally belongs to one client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "SetNull"
    )]
    Client,
    /// One sale owns many line items
    #[sea_orm(has_many = "super::sale_item::Entity")]
    Items,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
