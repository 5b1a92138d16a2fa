//! Supplier entity - A vendor that imports are received from.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    /// Unique identifier for the supplier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Supplier name, unique within a profile
    #[sea_orm(unique)]
    pub name: String,
    /// Name shown on documents, may differ from `name`
    pub display_name: String,
    /// Postal address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Free-form notes
    pub notes: String,
    /// Path of the logo/preview image, relative to the profile `images/` folder
    pub preview_image: Option<String>,
    /// When the supplier was created
    pub created_at: DateTime,
    /// When the supplier was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Supplier and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One supplier has many imports
    #[sea_orm(has_many = "super::import::Entity")]
    Imports,
}

impl Related<super::import::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Imports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
