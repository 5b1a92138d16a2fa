//! Entity module - Contains all SeaORM entity definitions for a profile database.
//! Catalog tables (products, clients, suppliers) are referenced by operation headers
//! (sales, imports) and their line items; see each entity for its delete behaviour.

pub mod client;
pub mod import;
pub mod import_item;
pub mod product;
pub mod sale;
pub mod sale_item;
pub mod supplier;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use client::{Column as ClientColumn, Entity as Client, Model as ClientModel};
pub use import::{Column as ImportColumn, Entity as Import, Model as ImportModel};
pub use import_item::{Column as ImportItemColumn, Entity as ImportItem, Model as ImportItemModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use sale::{Column as SaleColumn, Entity as Sale, Model as SaleModel};
pub use sale_item::{Column as SaleItemColumn, Entity as SaleItem, Model as SaleItemModel};
pub use supplier::{Column as SupplierColumn, Entity as Supplier, Model as SupplierModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
