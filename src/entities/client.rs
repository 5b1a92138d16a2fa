//! Client entity - A customer that sales are made to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    /// Unique identifier for the client
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Client name, unique within a profile
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
    /// When the client was created
    pub created_at: DateTime,
    /// When the client was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Client and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One client has many sales
    #[sea_orm(has_many = "super::sale::Entity")]
    Sales,
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
