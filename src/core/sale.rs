//! Sale business logic - Headers, line items and totals.
//!
//! A sale copies the client name when it is recorded and each line copies the product
//! name when it is added. Deleting a sale removes its lines; totals are recomputed from
//! the lines on every call.

use crate::{
    core::{
        catalog::CatalogKind,
        operation::{self, HeaderFields, OperationQuery, OperationSummary, OperationTables},
    },
    entities::{Sale, SaleItem, sale, sale_item},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Editable header fields of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleInput {
    /// Client the sale is made to, if any
    pub client_id: Option<i64>,
    /// Business date
    pub date: NaiveDate,
    /// VAT percentage, 0 to 100
    pub tva: f64,
    /// Free-form notes
    pub notes: String,
}

impl SaleInput {
    /// Input without VAT or notes.
    #[must_use]
    pub const fn new(client_id: Option<i64>, date: NaiveDate) -> Self {
        Self {
            client_id,
            date,
            tva: 0.0,
            notes: String::new(),
        }
    }

    fn fields(&self) -> HeaderFields<'_> {
        HeaderFields {
            counterparty_id: self.client_id,
            date: self.date,
            tva: self.tva,
            notes: &self.notes,
        }
    }
}

/// The `sales` and `sale_items` tables.
pub(crate) struct SaleTables;

impl OperationTables for SaleTables {
    type Header = Sale;
    type HeaderModel = sale::Model;
    type HeaderActive = sale::ActiveModel;
    type HeaderColumn = sale::Column;
    type Item = SaleItem;
    type ItemModel = sale_item::Model;
    type ItemActive = sale_item::ActiveModel;
    type ItemColumn = sale_item::Column;

    const HEADER: &'static str = "sale";
    const ITEM: &'static str = "sale item";
    const COUNTERPARTY: CatalogKind = CatalogKind::Client;

    const ID: sale::Column = sale::Column::Id;
    const COUNTERPARTY_ID: sale::Column = sale::Column::ClientId;
    const COUNTERPARTY_NAME: sale::Column = sale::Column::ClientName;
    const DATE: sale::Column = sale::Column::Date;
    const TVA: sale::Column = sale::Column::Tva;
    const NOTES: sale::Column = sale::Column::Notes;
    const CREATED_AT: sale::Column = sale::Column::CreatedAt;

    const ITEM_ID: sale_item::Column = sale_item::Column::Id;
    const ITEM_PARENT: sale_item::Column = sale_item::Column::SaleId;
    const ITEM_PRODUCT_ID: sale_item::Column = sale_item::Column::ProductId;
    const ITEM_PRODUCT_NAME: sale_item::Column = sale_item::Column::ProductName;
    const ITEM_QUANTITY: sale_item::Column = sale_item::Column::Quantity;
    const ITEM_UNIT_PRICE: sale_item::Column = sale_item::Column::UnitPrice;

    fn header_id(header: &sale::Model) -> i64 {
        header.id
    }

    fn counterparty_id(header: &sale::Model) -> Option<i64> {
        header.client_id
    }

    fn date(header: &sale::Model) -> NaiveDate {
        header.date
    }

    fn tva(header: &sale::Model) -> f64 {
        header.tva
    }
}

/// Records a new sale, copying the client's current name.
///
/// # Errors
/// Returns an error if the VAT rate is out of range or the client does not exist.
pub async fn create_sale(db: &DatabaseConnection, input: &SaleInput) -> Result<sale::Model> {
    operation::create_header::<SaleTables>(db, &input.fields()).await
}

/// Retrieves a specific sale by its unique ID.
pub async fn get_sale_by_id(db: &DatabaseConnection, sale_id: i64) -> Result<Option<sale::Model>> {
    operation::get_header::<SaleTables, _>(db, sale_id).await
}

/// Updates a sale header.
///
/// The client name is only captured again when the sale is pointed at a different client;
/// clearing the client keeps the recorded name.
///
/// # Errors
/// Returns an error if the sale or the new client does not exist, or the VAT rate is out
/// of range.
pub async fn update_sale(
    db: &DatabaseConnection,
    sale_id: i64,
    input: &SaleInput,
) -> Result<sale::Model> {
    operation::update_header::<SaleTables>(db, sale_id, &input.fields()).await
}

/// Deletes a sale and all of its line items, returning how many lines were removed.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the sale does not exist.
#[instrument(skip(db))]
pub async fn delete_sale(db: &DatabaseConnection, sale_id: i64) -> Result<u64> {
    operation::delete_operation::<SaleTables>(db, sale_id).await
}

/// Adds a product line to a sale, copying the product's current name.
///
/// # Errors
/// Returns an error if:
/// - The quantity is outside 1 to [`crate::core::validation::MAX_QUANTITY`] or the price
///   is negative or not finite
/// - The sale or the product does not exist
pub async fn add_sale_item(
    db: &DatabaseConnection,
    sale_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<sale_item::Model> {
    operation::add_item::<SaleTables>(db, sale_id, product_id, quantity, unit_price).await
}

/// Changes the quantity and price of a line. The product name snapshot is left as is.
///
/// # Errors
/// Returns an error if the values are invalid or the line does not exist.
pub async fn update_sale_item(
    db: &DatabaseConnection,
    item_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<sale_item::Model> {
    operation::update_item::<SaleTables>(db, item_id, quantity, unit_price).await
}

/// Removes one line from its sale.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the line does not exist.
pub async fn remove_sale_item(db: &DatabaseConnection, item_id: i64) -> Result<()> {
    operation::remove_item::<SaleTables>(db, item_id).await
}

/// Retrieves the lines of a sale in insertion order.
pub async fn get_sale_items(
    db: &DatabaseConnection,
    sale_id: i64,
) -> Result<Vec<sale_item::Model>> {
    operation::list_items::<SaleTables>(db, sale_id).await
}

/// Sum of `quantity * unit_price` over the sale's current lines.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the sale does not exist.
pub async fn compute_total(db: &DatabaseConnection, sale_id: i64) -> Result<f64> {
    operation::compute_total::<SaleTables>(db, sale_id).await
}

/// Subtotal, VAT and total of a sale.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the sale does not exist.
pub async fn compute_summary(db: &DatabaseConnection, sale_id: i64) -> Result<OperationSummary> {
    operation::compute_summary::<SaleTables>(db, sale_id).await
}

/// Searches sales by client name, client and date range.
pub async fn query_sales(
    db: &DatabaseConnection,
    query: &OperationQuery,
) -> Result<Vec<sale::Model>> {
    operation::query_operations::<SaleTables>(db, query).await
}
