//! Catalog entities and the snapshot policy.
//!
//! Products, clients and suppliers form a closed set of catalog kinds sharing one record
//! shape (id + name). Operations copy the referenced name when they are recorded, so when a
//! catalog entity is deleted every reference to it is set to NULL first and the row is
//! deleted afterwards, inside one transaction. History stays readable through the copied
//! names.

use crate::{
    entities::{
        Client, Import, ImportItem, Product, Sale, SaleItem, Supplier, client, import,
        import_item, product, sale, sale_item, supplier,
    },
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, TransactionTrait, Value, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// The kinds of entity that operations can reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Referenced by sale and import line items
    Product,
    /// Referenced by sale headers
    Client,
    /// Referenced by import headers
    Supplier,
}

impl CatalogKind {
    /// Every catalog kind, in table creation order
    pub const ALL: [Self; 3] = [Self::Product, Self::Client, Self::Supplier];

    /// Lowercase entity name used in error messages
    #[must_use]
    pub const fn entity_name(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Client => "client",
            Self::Supplier => "supplier",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

/// The record shape shared by all catalog kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Which table the record lives in
    pub kind: CatalogKind,
    /// Row id, stable for the life of the record
    pub id: i64,
    /// Current name
    pub name: String,
}

/// Outcome of deleting a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachReport {
    /// Kind of the deleted entity
    pub kind: CatalogKind,
    /// Id of the deleted entity
    pub id: i64,
    /// Number of line items or headers whose reference was set to NULL
    pub detached_references: u64,
}

fn not_found(kind: CatalogKind, id: i64) -> Error {
    Error::NotFound {
        entity: kind.entity_name(),
        key: id.to_string(),
    }
}

/// Reads the current name of a catalog entity.
///
/// # Errors
/// Returns [`Error::NotFound`] when the id does not resolve.
pub async fn fetch_name<C>(db: &C, kind: CatalogKind, id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    let name = match kind {
        CatalogKind::Product => {
            Product::find_by_id(id)
                .select_only()
                .column(product::Column::Name)
                .into_tuple::<String>()
                .one(db)
                .await?
        }
        CatalogKind::Client => {
            Client::find_by_id(id)
                .select_only()
                .column(client::Column::Name)
                .into_tuple::<String>()
                .one(db)
                .await?
        }
        CatalogKind::Supplier => {
            Supplier::find_by_id(id)
                .select_only()
                .column(supplier::Column::Name)
                .into_tuple::<String>()
                .one(db)
                .await?
        }
    };

    name.ok_or_else(|| not_found(kind, id))
}

/// Lists every record of a kind, ordered by name.
pub async fn list_records<C>(db: &C, kind: CatalogKind) -> Result<Vec<CatalogRecord>>
where
    C: ConnectionTrait,
{
    let rows: Vec<(i64, String)> = match kind {
        CatalogKind::Product => {
            Product::find()
                .select_only()
                .columns([product::Column::Id, product::Column::Name])
                .order_by_asc(product::Column::Name)
                .into_tuple()
                .all(db)
                .await?
        }
        CatalogKind::Client => {
            Client::find()
                .select_only()
                .columns([client::Column::Id, client::Column::Name])
                .order_by_asc(client::Column::Name)
                .into_tuple()
                .all(db)
                .await?
        }
        CatalogKind::Supplier => {
            Supplier::find()
                .select_only()
                .columns([supplier::Column::Id, supplier::Column::Name])
                .order_by_asc(supplier::Column::Name)
                .into_tuple()
                .all(db)
                .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|(id, name)| CatalogRecord { kind, id, name })
        .collect())
}

/// Checks whether `name` is used by another record of the same kind.
pub async fn name_taken<C>(
    db: &C,
    kind: CatalogKind,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = match kind {
        CatalogKind::Product => {
            Product::find()
                .select_only()
                .column(product::Column::Id)
                .filter(product::Column::Name.eq(name))
                .into_tuple()
                .all(db)
                .await?
        }
        CatalogKind::Client => {
            Client::find()
                .select_only()
                .column(client::Column::Id)
                .filter(client::Column::Name.eq(name))
                .into_tuple()
                .all(db)
                .await?
        }
        CatalogKind::Supplier => {
            Supplier::find()
                .select_only()
                .column(supplier::Column::Id)
                .filter(supplier::Column::Name.eq(name))
                .into_tuple()
                .all(db)
                .await?
        }
    };

    Ok(ids.into_iter().any(|id| Some(id) != exclude_id))
}

/// Fails with [`Error::Conflict`] when `name` is already used by another record.
pub async fn ensure_name_available<C>(
    db: &C,
    kind: CatalogKind,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if name_taken(db, kind, name, exclude_id).await? {
        return Err(Error::Conflict {
            entity: kind.entity_name(),
            key: name.to_string(),
        });
    }
    Ok(())
}

/// Deletes a catalog entity after detaching every reference to it.
///
/// Products are referenced by sale and import line items, clients by sales and suppliers by
/// imports. Those foreign keys are set to NULL before the row is removed; the copied names
/// in the referencing rows are left as they are.
///
/// # Errors
/// Returns [`Error::NotFound`] when the entity does not exist.
#[instrument(skip(db))]
pub async fn delete_entity(
    db: &DatabaseConnection,
    kind: CatalogKind,
    id: i64,
) -> Result<DetachReport> {
    let txn = db.begin().await?;

    fetch_name(&txn, kind, id).await?;

    let detached_references = match kind {
        CatalogKind::Product => {
            let sales = SaleItem::update_many()
                .col_expr(sale_item::Column::ProductId, Expr::value(Value::BigInt(None)))
                .filter(sale_item::Column::ProductId.eq(id))
                .exec(&txn)
                .await?
                .rows_affected;
            let imports = ImportItem::update_many()
                .col_expr(import_item::Column::ProductId, Expr::value(Value::BigInt(None)))
                .filter(import_item::Column::ProductId.eq(id))
                .exec(&txn)
                .await?
                .rows_affected;
            Product::delete_by_id(id).exec(&txn).await?;
            sales + imports
        }
        CatalogKind::Client => {
            let sales = Sale::update_many()
                .col_expr(sale::Column::ClientId, Expr::value(Value::BigInt(None)))
                .filter(sale::Column::ClientId.eq(id))
                .exec(&txn)
                .await?
                .rows_affected;
            Client::delete_by_id(id).exec(&txn).await?;
            sales
        }
        CatalogKind::Supplier => {
            let imports = Import::update_many()
                .col_expr(import::Column::SupplierId, Expr::value(Value::BigInt(None)))
                .filter(import::Column::SupplierId.eq(id))
                .exec(&txn)
                .await?
                .rows_affected;
            Supplier::delete_by_id(id).exec(&txn).await?;
            imports
        }
    };

    txn.commit().await?;

    info!(%kind, id, detached_references, "Deleted catalog entity");
    Ok(DetachReport {
        kind,
        id,
        detached_references,
    })
}
