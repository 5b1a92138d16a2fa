//! Shared test utilities for `stockbook`.
//!
//! This module provides common helper functions for setting up test databases,
//! temporary profile folders and test entities with sensible defaults.

use crate::{
    core::{
        client,
        contact::ContactInput,
        import::{self, ImportInput},
        password::KdfParams,
        product::{self, ProductInput},
        profile::ProfileManager,
        sale::{self, SaleInput},
        session::Session,
        supplier,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;

/// Cheap Argon2 parameters so password tests stay fast.
pub const FAST_KDF: KdfParams = KdfParams {
    memory_kib: 256,
    time_cost: 1,
    parallelism: 1,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Business date used by test operations.
#[allow(clippy::unwrap_used)]
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Creates a test product with sensible defaults.
///
/// # Defaults
/// * `unit_price`: 4.0
/// * `sale_price`: 6.0
/// * `category`: `"general"`
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::product::Model> {
    let input = ProductInput {
        category: "general".to_string(),
        ..ProductInput::new(name, 4.0, 6.0)
    };
    product::create_product(db, &input).await
}

/// Creates a test client with only a name.
pub async fn create_test_client(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::client::Model> {
    client::create_client(db, &ContactInput::named(name)).await
}

/// Creates a test supplier with only a name.
pub async fn create_test_supplier(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::supplier::Model> {
    supplier::create_supplier(db, &ContactInput::named(name)).await
}

/// Creates a sale dated [`test_date`] without VAT.
pub async fn create_test_sale(
    db: &DatabaseConnection,
    client_id: Option<i64>,
) -> Result<entities::sale::Model> {
    sale::create_sale(db, &SaleInput::new(client_id, test_date())).await
}

/// Creates an import dated [`test_date`] without VAT.
pub async fn create_test_import(
    db: &DatabaseConnection,
    supplier_id: Option<i64>,
) -> Result<entities::import::Model> {
    import::create_import(db, &ImportInput::new(supplier_id, test_date())).await
}

/// Sets up a test environment with a client and a product.
/// Returns (db, client, product) for sale-related tests.
pub async fn setup_with_client_and_product() -> Result<(
    DatabaseConnection,
    entities::client::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let client = create_test_client(&db, "Test Client").await?;
    let product = create_test_product(&db, "Test Product").await?;
    Ok((db, client, product))
}

/// Sets up a test environment with a supplier and a product.
/// Returns (db, supplier, product) for import-related tests.
pub async fn setup_with_supplier_and_product() -> Result<(
    DatabaseConnection,
    entities::supplier::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let supplier = create_test_supplier(&db, "Test Supplier").await?;
    let product = create_test_product(&db, "Test Product").await?;
    Ok((db, supplier, product))
}

/// A profile manager rooted in a fresh temporary folder.
/// Keep the returned `TempDir` alive for the duration of the test.
#[allow(clippy::unwrap_used)]
pub fn temp_profiles() -> (TempDir, ProfileManager) {
    let tmp = tempfile::tempdir().unwrap();
    let manager = ProfileManager::new(tmp.path().join("profiles"));
    (tmp, manager)
}

/// A session over [`temp_profiles`] using [`FAST_KDF`].
pub fn temp_session() -> (TempDir, Session) {
    let (tmp, profiles) = temp_profiles();
    (tmp, Session::with_kdf_params(profiles, FAST_KDF))
}
