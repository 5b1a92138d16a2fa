//! Import business logic - Stock received from suppliers.
//!
//! An import copies the supplier name when it is recorded and each line copies the product
//! name when it is added. Deleting an import removes its lines; totals are recomputed from
//! the lines on every call.

use crate::{
    core::{
        catalog::CatalogKind,
        operation::{self, HeaderFields, OperationQuery, OperationSummary, OperationTables},
    },
    entities::{Import, ImportItem, import, import_item},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Editable header fields of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportInput {
    /// Supplier the import is received from, if any
    pub supplier_id: Option<i64>,
    /// Business date
    pub date: NaiveDate,
    /// VAT percentage, 0 to 100
    pub tva: f64,
    /// Free-form notes
    pub notes: String,
}

impl ImportInput {
    /// Input without VAT or notes.
    #[must_use]
    pub const fn new(supplier_id: Option<i64>, date: NaiveDate) -> Self {
        Self {
            supplier_id,
            date,
            tva: 0.0,
            notes: String::new(),
        }
    }

    fn fields(&self) -> HeaderFields<'_> {
        HeaderFields {
            counterparty_id: self.supplier_id,
            date: self.date,
            tva: self.tva,
            notes: &self.notes,
        }
    }
}

/// The `imports` and `import_items` tables.
pub(crate) struct ImportTables;

impl OperationTables for ImportTables {
    type Header = Import;
    type HeaderModel = import::Model;
    type HeaderActive = import::ActiveModel;
    type HeaderColumn = import::Column;
    type Item = ImportItem;
    type ItemModel = import_item::Model;
    type ItemActive = import_item::ActiveModel;
    type ItemColumn = import_item::Column;

    const HEADER: &'static str = "import";
    const ITEM: &'static str = "import item";
    const COUNTERPARTY: CatalogKind = CatalogKind::Supplier;

    const ID: import::Column = import::Column::Id;
    const COUNTERPARTY_ID: import::Column = import::Column::SupplierId;
    const COUNTERPARTY_NAME: import::Column = import::Column::SupplierName;
    const DATE: import::Column = import::Column::Date;
    const TVA: import::Column = import::Column::Tva;
    const NOTES: import::Column = import::Column::Notes;
    const CREATED_AT: import::Column = import::Column::CreatedAt;

    const ITEM_ID: import_item::Column = import_item::Column::Id;
    const ITEM_PARENT: import_item::Column = import_item::Column::ImportId;
    const ITEM_PRODUCT_ID: import_item::Column = import_item::Column::ProductId;
    const ITEM_PRODUCT_NAME: import_item::Column = import_item::Column::ProductName;
    const ITEM_QUANTITY: import_item::Column = import_item::Column::Quantity;
    const ITEM_UNIT_PRICE: import_item::Column = import_item::Column::UnitPrice;

    fn header_id(header: &import::Model) -> i64 {
        header.id
    }

    fn counterparty_id(header: &import::Model) -> Option<i64> {
        header.supplier_id
    }

    fn date(header: &import::Model) -> NaiveDate {
        header.date
    }

    fn tva(header: &import::Model) -> f64 {
        header.tva
    }
}

/// Records a new import, copying the supplier's current name.
///
/// # Errors
/// Returns an error if the VAT rate is out of range or the supplier does not exist.
pub async fn create_import(db: &DatabaseConnection, input: &ImportInput) -> Result<import::Model> {
    operation::create_header::<ImportTables>(db, &input.fields()).await
}

/// Retrieves a specific import by its unique ID.
pub async fn get_import_by_id(
    db: &DatabaseConnection,
    import_id: i64,
) -> Result<Option<import::Model>> {
    operation::get_header::<ImportTables, _>(db, import_id).await
}

/// Updates an import header, re-capturing the supplier name only when the supplier changes.
///
/// # Errors
/// Returns an error if the import or the new supplier does not exist, or the VAT rate is
/// out of range.
pub async fn update_import(
    db: &DatabaseConnection,
    import_id: i64,
    input: &ImportInput,
) -> Result<import::Model> {
    operation::update_header::<ImportTables>(db, import_id, &input.fields()).await
}

/// Deletes an import and its lines, returning how many lines were removed.
#[instrument(skip(db))]
pub async fn delete_import(db: &DatabaseConnection, import_id: i64) -> Result<u64> {
    operation::delete_operation::<ImportTables>(db, import_id).await
}

/// Adds a product line to an import, copying the product's current name.
///
/// # Errors
/// Returns an error if the quantity or price is invalid, or the import or the product does
/// not exist.
pub async fn add_import_item(
    db: &DatabaseConnection,
    import_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<import_item::Model> {
    operation::add_item::<ImportTables>(db, import_id, product_id, quantity, unit_price).await
}

/// Changes the quantity and price of a line.
pub async fn update_import_item(
    db: &DatabaseConnection,
    item_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<import_item::Model> {
    operation::update_item::<ImportTables>(db, item_id, quantity, unit_price).await
}

/// Removes one line from its import.
pub async fn remove_import_item(db: &DatabaseConnection, item_id: i64) -> Result<()> {
    operation::remove_item::<ImportTables>(db, item_id).await
}

/// Retrieves the lines of an import in insertion order.
pub async fn get_import_items(
    db: &DatabaseConnection,
    import_id: i64,
) -> Result<Vec<import_item::Model>> {
    operation::list_items::<ImportTables>(db, import_id).await
}

/// Sum of `quantity * unit_price` over the import's current lines.
pub async fn compute_total(db: &DatabaseConnection, import_id: i64) -> Result<f64> {
    operation::compute_total::<ImportTables>(db, import_id).await
}

/// Subtotal, VAT and total of an import.
pub async fn compute_summary(
    db: &DatabaseConnection,
    import_id: i64,
) -> Result<OperationSummary> {
    operation::compute_summary::<ImportTables>(db, import_id).await
}

/// Searches imports by supplier name, supplier and date range.
pub async fn query_imports(
    db: &DatabaseConnection,
    query: &OperationQuery,
) -> Result<Vec<import::Model>> {
    operation::query_operations::<ImportTables>(db, query).await
}
