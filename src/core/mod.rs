//! Core business logic - framework-agnostic operations over a profile database and the
//! profile folder that holds it.

/// Backup creation, listing and restore for a profile folder
pub mod backup;
/// Shared catalog record shape and the nullify-then-delete snapshot policy
pub mod catalog;
/// Client management
pub mod client;
/// Contact fields shared by clients and suppliers
pub mod contact;
/// Import (purchase) operations and their line items
pub mod import;
/// Totals and queries shared by sales and imports
pub mod operation;
/// Password gate: key derivation and validation phrase encryption
pub mod password;
/// Product management
pub mod product;
/// Profile folder lifecycle
pub mod profile;
/// Sort direction shared by all queries
pub mod query;
/// Reports over stock and operations
pub mod report;
/// Sale operations and their line items
pub mod sale;
/// Session object owning the open profile and its lock state
pub mod session;
/// Stock quantity and pricing helpers
pub mod stock;
/// Supplier management
pub mod supplier;
/// Input validation shared by the managers
pub mod validation;

pub(crate) mod folder;
