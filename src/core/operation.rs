//! Shared shapes and storage logic for sales and imports.
//!
//! Both operation kinds are a header with a counterparty snapshot and a list of line items.
//! Totals are always computed from the current line items and never stored. The `sale` and
//! `import` modules describe their tables through `OperationTables` and delegate here.

use crate::{
    core::{
        catalog::{self, CatalogKind},
        query::{SortDirection, contains_pattern, search_term},
        validation::{require_price, require_quantity, require_tva, sum_units},
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, Order, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Totals of one operation, derived from its line items and VAT rate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    /// Number of line items
    pub item_count: usize,
    /// Total units across all line items
    pub units: i64,
    /// Sum of `quantity * unit_price`
    pub subtotal: f64,
    /// VAT on top of the subtotal
    pub tva_amount: f64,
    /// `subtotal + tva_amount`
    pub total: f64,
}

impl OperationSummary {
    /// Builds the summary from `(quantity, unit_price)` pairs and a VAT percentage.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Validation`] if the unit count does not fit an `i64`.
    pub fn from_lines(lines: &[(i64, f64)], tva: f64) -> Result<Self> {
        let subtotal = lines_total(lines);
        let tva_amount = subtotal * tva / 100.0;
        Ok(Self {
            item_count: lines.len(),
            units: sum_units(lines.iter().map(|(quantity, _)| *quantity))?,
            subtotal,
            tva_amount,
            total: subtotal + tva_amount,
        })
    }
}

/// Sum of `quantity * unit_price`; 0 for no lines.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn lines_total(lines: &[(i64, f64)]) -> f64 {
    lines
        .iter()
        .map(|(quantity, unit_price)| *quantity as f64 * unit_price)
        .sum()
}

/// Field an operation query is ordered by.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOrder {
    /// Business date, ties broken by id
    #[default]
    Date,
    /// Recording order
    Id,
    /// Counterparty name snapshot
    CounterpartyName,
}

/// Filter and ordering for sale and import queries.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationQuery {
    /// Substring the counterparty name snapshot must contain
    pub search: Option<String>,
    /// Only operations still attached to this client or supplier
    pub counterparty_id: Option<i64>,
    /// Inclusive lower bound on the business date
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the business date
    pub date_to: Option<NaiveDate>,
    /// Ordering field
    pub order_by: OperationOrder,
    /// Ordering direction
    pub direction: SortDirection,
}

/// Header and line item tables of one operation kind.
pub(crate) trait OperationTables {
    type Header: EntityTrait<Model = Self::HeaderModel, Column = Self::HeaderColumn>;
    type HeaderModel: IntoActiveModel<Self::HeaderActive> + Send + Sync;
    type HeaderActive: ActiveModelTrait<Entity = Self::Header>
        + ActiveModelBehavior
        + Send
        + Sync;
    type HeaderColumn: ColumnTrait;

    type Item: EntityTrait<Model = Self::ItemModel, Column = Self::ItemColumn>;
    type ItemModel: IntoActiveModel<Self::ItemActive> + Send + Sync;
    type ItemActive: ActiveModelTrait<Entity = Self::Item> + ActiveModelBehavior + Send + Sync;
    type ItemColumn: ColumnTrait;

    /// Entity name of a header in errors and logs
    const HEADER: &'static str;
    /// Entity name of a line item in errors and logs
    const ITEM: &'static str;
    /// Catalog kind the header points at
    const COUNTERPARTY: CatalogKind;

    const ID: Self::HeaderColumn;
    const COUNTERPARTY_ID: Self::HeaderColumn;
    const COUNTERPARTY_NAME: Self::HeaderColumn;
    const DATE: Self::HeaderColumn;
    const TVA: Self::HeaderColumn;
    const NOTES: Self::HeaderColumn;
    const CREATED_AT: Self::HeaderColumn;

    const ITEM_ID: Self::ItemColumn;
    const ITEM_PARENT: Self::ItemColumn;
    const ITEM_PRODUCT_ID: Self::ItemColumn;
    const ITEM_PRODUCT_NAME: Self::ItemColumn;
    const ITEM_QUANTITY: Self::ItemColumn;
    const ITEM_UNIT_PRICE: Self::ItemColumn;

    fn header_id(header: &Self::HeaderModel) -> i64;
    fn counterparty_id(header: &Self::HeaderModel) -> Option<i64>;
    fn date(header: &Self::HeaderModel) -> NaiveDate;
    fn tva(header: &Self::HeaderModel) -> f64;
}

/// Editable header fields, whichever kind of counterparty they point at.
pub(crate) struct HeaderFields<'a> {
    pub counterparty_id: Option<i64>,
    pub date: NaiveDate,
    pub tva: f64,
    pub notes: &'a str,
}

fn header_not_found<T: OperationTables>(id: i64) -> Error {
    Error::NotFound {
        entity: T::HEADER,
        key: id.to_string(),
    }
}

fn item_not_found<T: OperationTables>(id: i64) -> Error {
    Error::NotFound {
        entity: T::ITEM,
        key: id.to_string(),
    }
}

pub(crate) async fn get_header<T, C>(db: &C, id: i64) -> Result<Option<T::HeaderModel>>
where
    T: OperationTables,
    C: ConnectionTrait,
{
    T::Header::find()
        .filter(T::ID.eq(id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn find_header<T, C>(db: &C, id: i64) -> Result<T::HeaderModel>
where
    T: OperationTables,
    C: ConnectionTrait,
{
    get_header::<T, C>(db, id)
        .await?
        .ok_or_else(|| header_not_found::<T>(id))
}

async fn counterparty_snapshot<T, C>(db: &C, counterparty_id: Option<i64>) -> Result<String>
where
    T: OperationTables,
    C: ConnectionTrait,
{
    match counterparty_id {
        Some(id) => catalog::fetch_name(db, T::COUNTERPARTY, id).await,
        None => Ok(String::new()),
    }
}

fn write_header<T: OperationTables>(
    header: &mut T::HeaderActive,
    fields: &HeaderFields<'_>,
    tva: f64,
) {
    header.set(T::COUNTERPARTY_ID, fields.counterparty_id.into());
    header.set(T::DATE, fields.date.into());
    header.set(T::TVA, tva.into());
    header.set(T::NOTES, fields.notes.to_string().into());
}

/// Inserts a header, copying the counterparty's current name.
pub(crate) async fn create_header<T: OperationTables>(
    db: &DatabaseConnection,
    fields: &HeaderFields<'_>,
) -> Result<T::HeaderModel> {
    let tva = require_tva(fields.tva)?;
    let name = counterparty_snapshot::<T, _>(db, fields.counterparty_id).await?;

    let mut header = <T::HeaderActive as ActiveModelTrait>::default();
    write_header::<T>(&mut header, fields, tva);
    header.set(T::COUNTERPARTY_NAME, name.into());
    header.set(T::CREATED_AT, Utc::now().into());
    header.insert(db).await.map_err(Into::into)
}

/// Rewrites a header. The name is captured again only when the header is pointed at a
/// different counterparty; clearing the counterparty keeps the recorded name.
pub(crate) async fn update_header<T: OperationTables>(
    db: &DatabaseConnection,
    id: i64,
    fields: &HeaderFields<'_>,
) -> Result<T::HeaderModel> {
    let tva = require_tva(fields.tva)?;
    let existing = find_header::<T, _>(db, id).await?;
    let repointed = fields.counterparty_id.is_some()
        && fields.counterparty_id != T::counterparty_id(&existing);
    let name = if repointed {
        Some(counterparty_snapshot::<T, _>(db, fields.counterparty_id).await?)
    } else {
        None
    };

    let mut header = existing.into_active_model();
    write_header::<T>(&mut header, fields, tva);
    if let Some(name) = name {
        header.set(T::COUNTERPARTY_NAME, name.into());
    }
    header.update(db).await.map_err(Into::into)
}

/// Deletes a header and its lines in one transaction, returning how many lines went.
#[instrument(skip(db), fields(entity = T::HEADER))]
pub(crate) async fn delete_operation<T: OperationTables>(
    db: &DatabaseConnection,
    id: i64,
) -> Result<u64> {
    let txn = db.begin().await?;
    find_header::<T, _>(&txn, id).await?;

    let removed = T::Item::delete_many()
        .filter(T::ITEM_PARENT.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;
    T::Header::delete_many()
        .filter(T::ID.eq(id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(id, removed, "Deleted {}", T::HEADER);
    Ok(removed)
}

/// Adds a line, copying the product's current name.
pub(crate) async fn add_item<T: OperationTables>(
    db: &DatabaseConnection,
    parent_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<T::ItemModel> {
    let quantity = require_quantity(quantity)?;
    let unit_price = require_price(unit_price)?;

    let txn = db.begin().await?;
    find_header::<T, _>(&txn, parent_id).await?;
    let product_name = catalog::fetch_name(&txn, CatalogKind::Product, product_id).await?;

    let mut item = <T::ItemActive as ActiveModelTrait>::default();
    item.set(T::ITEM_PARENT, parent_id.into());
    item.set(T::ITEM_PRODUCT_ID, Some(product_id).into());
    item.set(T::ITEM_PRODUCT_NAME, product_name.into());
    item.set(T::ITEM_QUANTITY, quantity.into());
    item.set(T::ITEM_UNIT_PRICE, unit_price.into());
    let item = item.insert(&txn).await?;
    txn.commit().await?;

    Ok(item)
}

/// Changes quantity and price of a line, leaving its product snapshot alone.
pub(crate) async fn update_item<T: OperationTables>(
    db: &DatabaseConnection,
    item_id: i64,
    quantity: i64,
    unit_price: f64,
) -> Result<T::ItemModel> {
    let quantity = require_quantity(quantity)?;
    let unit_price = require_price(unit_price)?;

    let mut item = T::Item::find()
        .filter(T::ITEM_ID.eq(item_id))
        .one(db)
        .await?
        .ok_or_else(|| item_not_found::<T>(item_id))?
        .into_active_model();
    item.set(T::ITEM_QUANTITY, quantity.into());
    item.set(T::ITEM_UNIT_PRICE, unit_price.into());

    item.update(db).await.map_err(Into::into)
}

pub(crate) async fn remove_item<T: OperationTables>(
    db: &DatabaseConnection,
    item_id: i64,
) -> Result<()> {
    let result = T::Item::delete_many()
        .filter(T::ITEM_ID.eq(item_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(item_not_found::<T>(item_id));
    }
    Ok(())
}

pub(crate) async fn list_items<T: OperationTables>(
    db: &DatabaseConnection,
    parent_id: i64,
) -> Result<Vec<T::ItemModel>> {
    T::Item::find()
        .filter(T::ITEM_PARENT.eq(parent_id))
        .order_by_asc(T::ITEM_ID)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn line_values<T, C>(db: &C, parent_id: i64) -> Result<Vec<(i64, f64)>>
where
    T: OperationTables,
    C: ConnectionTrait,
{
    T::Item::find()
        .select_only()
        .column(T::ITEM_QUANTITY)
        .column(T::ITEM_UNIT_PRICE)
        .filter(T::ITEM_PARENT.eq(parent_id))
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn compute_total<T: OperationTables>(
    db: &DatabaseConnection,
    id: i64,
) -> Result<f64> {
    find_header::<T, _>(db, id).await?;
    Ok(lines_total(&line_values::<T, _>(db, id).await?))
}

pub(crate) async fn compute_summary<T: OperationTables>(
    db: &DatabaseConnection,
    id: i64,
) -> Result<OperationSummary> {
    let header = find_header::<T, _>(db, id).await?;
    let lines = line_values::<T, _>(db, id).await?;
    OperationSummary::from_lines(&lines, T::tva(&header))
}

pub(crate) async fn query_operations<T: OperationTables>(
    db: &DatabaseConnection,
    query: &OperationQuery,
) -> Result<Vec<T::HeaderModel>> {
    let mut select = T::Header::find();

    if let Some(term) = search_term(query.search.as_deref()) {
        select = select.filter(T::COUNTERPARTY_NAME.like(contains_pattern(term)));
    }
    if let Some(counterparty_id) = query.counterparty_id {
        select = select.filter(T::COUNTERPARTY_ID.eq(counterparty_id));
    }
    if let Some(from) = query.date_from {
        select = select.filter(T::DATE.gte(from));
    }
    if let Some(to) = query.date_to {
        select = select.filter(T::DATE.lte(to));
    }

    let order = Order::from(query.direction);
    select = match query.order_by {
        OperationOrder::Date => select.order_by(T::DATE, order.clone()),
        OperationOrder::Id => select.order_by(T::ID, order.clone()),
        OperationOrder::CounterpartyName => {
            select.order_by(T::COUNTERPARTY_NAME, order.clone())
        }
    };

    select
        .order_by(T::ID, order)
        .all(db)
        .await
        .map_err(Into::into)
}
