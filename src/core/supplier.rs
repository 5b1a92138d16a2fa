//! Supplier business logic - Handles all supplier-related operations.
//!
//! Suppliers are the counterparties of imports. An import copies the supplier name when it
//! is recorded, so deleting a supplier detaches its imports without rewriting them.

use crate::{
    core::{
        catalog::{self, CatalogKind, DetachReport},
        contact::{self, ContactInput, ContactQuery, ContactTable},
    },
    entities::{Supplier, supplier},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// The `suppliers` table as a contact kind.
pub(crate) struct SupplierTable;

impl ContactTable for SupplierTable {
    type Entity = Supplier;
    type Model = supplier::Model;
    type ActiveModel = supplier::ActiveModel;
    type Column = supplier::Column;

    const KIND: CatalogKind = CatalogKind::Supplier;
    const LABEL: &'static str = "Supplier";

    const ID: supplier::Column = supplier::Column::Id;
    const NAME: supplier::Column = supplier::Column::Name;
    const DISPLAY_NAME: supplier::Column = supplier::Column::DisplayName;
    const ADDRESS: supplier::Column = supplier::Column::Address;
    const EMAIL: supplier::Column = supplier::Column::Email;
    const PHONE: supplier::Column = supplier::Column::Phone;
    const NOTES: supplier::Column = supplier::Column::Notes;
    const PREVIEW_IMAGE: supplier::Column = supplier::Column::PreviewImage;
    const CREATED_AT: supplier::Column = supplier::Column::CreatedAt;
    const UPDATED_AT: supplier::Column = supplier::Column::UpdatedAt;
}

/// Retrieves all suppliers, ordered alphabetically by name.
pub async fn get_all_suppliers(db: &DatabaseConnection) -> Result<Vec<supplier::Model>> {
    contact::all_contacts::<SupplierTable>(db).await
}

/// Retrieves a specific supplier by its unique ID.
pub async fn get_supplier_by_id(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<Option<supplier::Model>> {
    contact::get_contact::<SupplierTable>(db, supplier_id).await
}

/// Searches suppliers by name or display name with the requested ordering.
pub async fn query_suppliers(
    db: &DatabaseConnection,
    query: &ContactQuery,
) -> Result<Vec<supplier::Model>> {
    contact::query_contacts::<SupplierTable>(db, query).await
}

/// Creates a new supplier.
///
/// # Errors
/// Returns an error if the name is blank, already used by another supplier, or the insert
/// fails.
pub async fn create_supplier(
    db: &DatabaseConnection,
    input: &ContactInput,
) -> Result<supplier::Model> {
    contact::create_contact::<SupplierTable>(db, input).await
}

/// Replaces the editable fields of an existing supplier.
///
/// # Errors
/// Returns an error if the input is invalid, the supplier does not exist, or the new name is
/// used by another supplier.
pub async fn update_supplier(
    db: &DatabaseConnection,
    supplier_id: i64,
    input: &ContactInput,
) -> Result<supplier::Model> {
    contact::update_contact::<SupplierTable>(db, supplier_id, input).await
}

/// Deletes a supplier, detaching its imports first.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the supplier does not exist.
pub async fn delete_supplier(db: &DatabaseConnection, supplier_id: i64) -> Result<DetachReport> {
    catalog::delete_entity(db, CatalogKind::Supplier, supplier_id).await
}
