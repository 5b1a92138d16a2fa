//! Stock levels and margins derived from recorded operations.
//!
//! Quantities are never stored: a product's stock is everything imported minus everything
//! sold, counted over the line items that still reference it.

use crate::{
    core::{
        catalog::{self, CatalogKind},
        validation::{subtract_units, sum_units},
    },
    entities::{ImportItem, SaleItem, import_item, product, sale_item},
    errors::Result,
};
use sea_orm::{ConnectionTrait, QuerySelect, prelude::*};
use std::collections::HashMap;

/// Units of a product currently in stock.
///
/// # Errors
/// Returns [`crate::errors::Error::NotFound`] if the product does not exist.
pub async fn product_quantity<C>(db: &C, product_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    catalog::fetch_name(db, CatalogKind::Product, product_id).await?;

    let imported: Vec<i64> = ImportItem::find()
        .select_only()
        .column(import_item::Column::Quantity)
        .filter(import_item::Column::ProductId.eq(product_id))
        .into_tuple()
        .all(db)
        .await?;
    let sold: Vec<i64> = SaleItem::find()
        .select_only()
        .column(sale_item::Column::Quantity)
        .filter(sale_item::Column::ProductId.eq(product_id))
        .into_tuple()
        .all(db)
        .await?;

    subtract_units(sum_units(imported)?, sum_units(sold)?)
}

/// Stock of every product that has at least one movement, keyed by product id.
pub async fn quantities_by_product<C>(db: &C) -> Result<HashMap<i64, i64>>
where
    C: ConnectionTrait,
{
    let imported: Vec<(Option<i64>, i64)> = ImportItem::find()
        .select_only()
        .column(import_item::Column::ProductId)
        .column(import_item::Column::Quantity)
        .into_tuple()
        .all(db)
        .await?;
    let sold: Vec<(Option<i64>, i64)> = SaleItem::find()
        .select_only()
        .column(sale_item::Column::ProductId)
        .column(sale_item::Column::Quantity)
        .into_tuple()
        .all(db)
        .await?;

    let mut quantities: HashMap<i64, i64> = HashMap::new();
    for (product_id, quantity) in imported {
        if let Some(id) = product_id {
            let entry = quantities.entry(id).or_insert(0);
            *entry = sum_units([*entry, quantity])?;
        }
    }
    for (product_id, quantity) in sold {
        if let Some(id) = product_id {
            let entry = quantities.entry(id).or_insert(0);
            *entry = subtract_units(*entry, quantity)?;
        }
    }
    Ok(quantities)
}

/// Markup of the sale price over the unit price, in percent. 0 when the unit price is 0.
#[must_use]
pub fn profit_margin(product: &product::Model) -> f64 {
    if product.unit_price.abs() < f64::EPSILON {
        return 0.0;
    }
    (product.sale_price - product.unit_price) / product.unit_price * 100.0
}

/// Whether `quantity` is at or below the low-stock `threshold`.
#[must_use]
pub const fn is_low_stock(quantity: i64, threshold: i64) -> bool {
    quantity <= threshold
}
