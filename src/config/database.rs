//! Database configuration module for profile databases.
//!
//! Every profile owns one `SQLite` file. This module opens that file through `SeaORM`,
//! creates the tables from the entity definitions with `Schema::create_table_from_entity`
//! (so foreign-key actions declared on the entities land in the schema), and then applies
//! the numbered migrations that have not been recorded in `system_state` yet.

use crate::entities::{
    Client, Import, ImportItem, Product, Sale, SaleItem, Supplier, SystemState, system_state,
};
use crate::errors::{Error, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
    TransactionTrait, prelude::*,
};
use std::path::Path;
use tracing::{debug, info, instrument};

/// `system_state` key holding the applied schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Version of a database whose tables were just created from the entities.
const BASELINE_VERSION: i64 = 1;

/// A forward-only schema change applied once per database.
struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 2,
    statements: &[
        "CREATE INDEX IF NOT EXISTS idx_sale_items_sale_id ON sale_items(sale_id)",
        "CREATE INDEX IF NOT EXISTS idx_sale_items_product_id ON sale_items(product_id)",
        "CREATE INDEX IF NOT EXISTS idx_import_items_import_id ON import_items(import_id)",
        "CREATE INDEX IF NOT EXISTS idx_import_items_product_id ON import_items(product_id)",
        "CREATE INDEX IF NOT EXISTS idx_sales_client_id ON sales(client_id)",
        "CREATE INDEX IF NOT EXISTS idx_imports_supplier_id ON imports(supplier_id)",
    ],
}];

/// Schema version a fully migrated database reports.
#[must_use]
pub fn latest_schema_version() -> i64 {
    MIGRATIONS
        .last()
        .map_or(BASELINE_VERSION, |migration| migration.version)
}

/// Builds the `SQLite` connection URL for a database file, creating it if missing.
#[must_use]
pub fn database_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// Opens (or creates) the database file at `path` and brings its schema up to date.
///
/// The pool holds a single connection: a profile database is used by one session at a time
/// and every write goes through the same handle.
#[instrument]
pub async fn open_database(path: &Path) -> Result<DatabaseConnection> {
    debug!("Opening profile database");
    let mut options = ConnectOptions::new(database_url(path));
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    run_migrations(&db).await?;
    info!("Profile database ready");
    Ok(db)
}

/// Creates all tables that do not exist yet, parents before children.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Client),
        schema.create_table_from_entity(Supplier),
        schema.create_table_from_entity(Sale),
        schema.create_table_from_entity(Import),
        schema.create_table_from_entity(SaleItem),
        schema.create_table_from_entity(ImportItem),
        schema.create_table_from_entity(SystemState),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    Ok(())
}

/// Reads the recorded schema version, `None` for a database that predates versioning.
pub async fn get_schema_version<C>(db: &C) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(SCHEMA_VERSION_KEY))
        .one(db)
        .await?;

    state
        .map(|s| {
            s.value.parse::<i64>().map_err(|e| Error::Config {
                message: format!("Invalid schema version '{}': {e}", s.value),
            })
        })
        .transpose()
}

async fn set_schema_version<C>(db: &C, version: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(SCHEMA_VERSION_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(version.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(SCHEMA_VERSION_KEY.to_string()),
            value: Set(version.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Creates missing tables and applies every migration newer than the recorded version.
///
/// Each migration runs in its own transaction together with the version bump, so a failed
/// migration leaves the database at the previous version.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<i64> {
    create_tables(db).await?;

    let start = match get_schema_version(db).await? {
        Some(version) => version,
        None => {
            set_schema_version(db, BASELINE_VERSION).await?;
            BASELINE_VERSION
        }
    };

    let mut version = start;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        debug!(version = migration.version, "Applying schema migration");
        let txn = db.begin().await?;
        for statement in migration.statements {
            txn.execute_unprepared(statement).await?;
        }
        set_schema_version(&txn, migration.version).await?;
        txn.commit().await?;
        version = migration.version;
    }

    Ok(version)
}
