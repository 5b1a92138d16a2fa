//! Report generation business logic.
//!
//! This module provides inventory, product movement and counterparty reports. All
//! functions return structured data that a presentation layer (or the admin binary)
//! formats for display.

use crate::{
    core::{
        catalog::{self, CatalogKind, CatalogRecord},
        import::ImportTables,
        operation::{self, OperationSummary, OperationTables},
        sale::SaleTables,
        stock,
        validation::sum_units,
    },
    entities::{
        Import, ImportItem, Product, Sale, SaleItem, import as import_entity, import_item,
        product, sale as sale_entity, sale_item,
    },
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, QueryOrder, prelude::*};
use serde::Serialize;

/// One product row of the inventory report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryLine {
    /// Product id
    pub product_id: i64,
    /// Current product name
    pub name: String,
    /// Product category
    pub category: String,
    /// Units in stock (negative when more was sold than imported)
    pub quantity: i64,
    /// Purchase price
    pub unit_price: f64,
    /// Selling price
    pub sale_price: f64,
    /// `quantity * unit_price`, counting only positive stock
    pub stock_value: f64,
    /// Markup in percent
    pub margin_percent: f64,
    /// Stock at or below the low-stock threshold
    pub low_stock: bool,
}

/// Stock levels for every product plus grand totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    /// One line per product, ordered by name
    pub lines: Vec<InventoryLine>,
    /// Sum of all quantities
    pub total_units: i64,
    /// Sum of all stock values
    pub total_value: f64,
    /// Number of products flagged as low stock
    pub low_stock_count: usize,
}

/// Builds the inventory report.
///
/// # Arguments
/// * `db` - Database connection
/// * `low_stock_threshold` - Quantity at or below which a product is flagged
pub async fn inventory_summary(
    db: &DatabaseConnection,
    low_stock_threshold: i64,
) -> Result<InventorySummary> {
    let products = Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await?;
    let quantities = stock::quantities_by_product(db).await?;

    let mut summary = InventorySummary::default();
    for product in products {
        let quantity = quantities.get(&product.id).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let stock_value = quantity.max(0) as f64 * product.unit_price;
        let low_stock = stock::is_low_stock(quantity, low_stock_threshold);

        summary.total_units = sum_units([summary.total_units, quantity])?;
        summary.total_value += stock_value;
        if low_stock {
            summary.low_stock_count += 1;
        }
        summary.lines.push(InventoryLine {
            product_id: product.id,
            margin_percent: stock::profit_margin(&product),
            name: product.name,
            category: product.category,
            quantity,
            unit_price: product.unit_price,
            sale_price: product.sale_price,
            stock_value,
            low_stock,
        });
    }
    Ok(summary)
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received from a supplier
    Import,
    /// Stock sold to a client
    Sale,
}

/// One line item touching a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    /// Import or sale
    pub kind: MovementKind,
    /// Id of the import or sale
    pub operation_id: i64,
    /// Business date of the operation
    pub date: NaiveDate,
    /// Supplier or client name recorded on the operation
    pub counterparty_name: String,
    /// Units moved, always positive
    pub quantity: i64,
    /// Price per unit on that line
    pub unit_price: f64,
}

impl Movement {
    /// Quantity with a sign: positive for imports, negative for sales.
    #[must_use]
    pub const fn signed_quantity(&self) -> i64 {
        match self.kind {
            MovementKind::Import => self.quantity,
            MovementKind::Sale => -self.quantity,
        }
    }
}

/// Lists every import and sale line of a product in chronological order.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the product does not exist.
pub async fn product_movements(db: &DatabaseConnection, product_id: i64) -> Result<Vec<Movement>> {
    catalog::fetch_name(db, CatalogKind::Product, product_id).await?;

    let imported = ImportItem::find()
        .filter(import_item::Column::ProductId.eq(product_id))
        .find_also_related(Import)
        .all(db)
        .await?;
    let sold = SaleItem::find()
        .filter(sale_item::Column::ProductId.eq(product_id))
        .find_also_related(Sale)
        .all(db)
        .await?;

    let mut movements: Vec<Movement> = imported
        .into_iter()
        .filter_map(|(item, header)| {
            header.map(|header: import_entity::Model| Movement {
                kind: MovementKind::Import,
                operation_id: header.id,
                date: header.date,
                counterparty_name: header.supplier_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
        })
        .chain(sold.into_iter().filter_map(|(item, header)| {
            header.map(|header: sale_entity::Model| Movement {
                kind: MovementKind::Sale,
                operation_id: header.id,
                date: header.date,
                counterparty_name: header.client_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
        }))
        .collect();

    movements.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.kind.cmp(&b.kind))
            .then(a.operation_id.cmp(&b.operation_id))
    });
    Ok(movements)
}

/// One operation in a counterparty report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationLine {
    /// Id of the sale or import
    pub operation_id: i64,
    /// Business date
    pub date: NaiveDate,
    /// Totals of the operation
    pub summary: OperationSummary,
}

/// Operations recorded against one client or supplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterpartyReport {
    /// The client or supplier
    pub counterparty: CatalogRecord,
    /// Operations in date order
    pub operations: Vec<OperationLine>,
    /// Sum of operation totals, VAT included
    pub grand_total: f64,
}

impl CounterpartyReport {
    fn new(counterparty: CatalogRecord, operations: Vec<OperationLine>) -> Self {
        let grand_total = operations.iter().map(|op| op.summary.total).sum();
        Self {
            counterparty,
            operations,
            grand_total,
        }
    }
}

async fn counterparty_report<T: OperationTables>(
    db: &DatabaseConnection,
    counterparty_id: i64,
) -> Result<CounterpartyReport> {
    let name = catalog::fetch_name(db, T::COUNTERPARTY, counterparty_id).await?;
    let headers = T::Header::find()
        .filter(T::COUNTERPARTY_ID.eq(counterparty_id))
        .order_by_asc(T::DATE)
        .order_by_asc(T::ID)
        .all(db)
        .await?;

    let mut operations = Vec::with_capacity(headers.len());
    for header in headers {
        let operation_id = T::header_id(&header);
        operations.push(OperationLine {
            operation_id,
            date: T::date(&header),
            summary: operation::compute_summary::<T>(db, operation_id).await?,
        });
    }

    let counterparty = CatalogRecord {
        kind: T::COUNTERPARTY,
        id: counterparty_id,
        name,
    };
    Ok(CounterpartyReport::new(counterparty, operations))
}

/// Sales made to a client.
///
/// Sales detached from a deleted client are not included.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the client does not exist.
pub async fn client_report(db: &DatabaseConnection, client_id: i64) -> Result<CounterpartyReport> {
    counterparty_report::<SaleTables>(db, client_id).await
}

/// Imports received from a supplier.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the supplier does not exist.
pub async fn supplier_report(
    db: &DatabaseConnection,
    supplier_id: i64,
) -> Result<CounterpartyReport> {
    counterparty_report::<ImportTables>(db, supplier_id).await
}

/// Formats an amount with two decimals, e.g. `"1234.50"` or `"-3.00"`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Formats a stock movement quantity with its sign, e.g. `"+10"` or `"-4"`.
#[must_use]
pub fn format_quantity_change(quantity: i64) -> String {
    if quantity >= 0 {
        format!("+{quantity}")
    } else {
        quantity.to_string()
    }
}

/// Generates a one-line summary of a movement.
#[must_use]
pub fn format_movement_summary(movement: &Movement) -> String {
    let change = format_quantity_change(movement.signed_quantity());
    let price = format_amount(movement.unit_price);
    let who = if movement.counterparty_name.is_empty() {
        "-"
    } else {
        &movement.counterparty_name
    };

    format!("{} | {change} @ {price} | {who}", movement.date)
}
