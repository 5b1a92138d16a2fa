//! Product business logic - Handles all product-related operations.
//!
//! This module provides functions for creating, retrieving, updating, searching and
//! deleting products. Product names are unique within a profile. Deleting a product keeps
//! the sale and import history readable: line items lose their product reference but keep
//! the product name they were recorded with.

use crate::{
    core::{
        catalog::{self, CatalogKind, DetachReport},
        query::{SortDirection, contains_pattern, search_term},
        validation::{require_name, require_price},
    },
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{Order, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Editable product fields, used for both creation and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    /// Product name, trimmed and required
    pub name: String,
    /// Purchase cost per unit
    pub unit_price: f64,
    /// Selling price per unit
    pub sale_price: f64,
    /// Free-form category
    pub category: String,
    /// Longer description
    pub description: String,
    /// Preview image path relative to the profile `images/` folder
    pub preview_image: Option<String>,
}

impl ProductInput {
    /// Input with just a name and prices; other fields empty.
    #[must_use]
    pub fn new(name: impl Into<String>, unit_price: f64, sale_price: f64) -> Self {
        Self {
            name: name.into(),
            unit_price,
            sale_price,
            ..Self::default()
        }
    }

    fn validated(&self) -> Result<(String, f64, f64)> {
        let name = require_name(&self.name, "Product")?;
        let unit_price = require_price(self.unit_price)?;
        let sale_price = require_price(self.sale_price)?;
        Ok((name, unit_price, sale_price))
    }
}

/// Field a product query is ordered by.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductOrder {
    /// Alphabetical by name
    #[default]
    Name,
    /// By purchase cost
    UnitPrice,
    /// By selling price
    SalePrice,
    /// By category, then name
    Category,
    /// By creation order
    Id,
}

/// Filter and ordering for [`query_products`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    /// Substring the name must contain
    pub search: Option<String>,
    /// Exact category to match
    pub category: Option<String>,
    /// Ordering field
    pub order_by: ProductOrder,
    /// Ordering direction
    pub direction: SortDirection,
}

/// Retrieves all products, ordered alphabetically by name.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its exact name.
pub async fn get_product_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Searches products by name/category with the requested ordering.
pub async fn query_products(
    db: &DatabaseConnection,
    query: &ProductQuery,
) -> Result<Vec<product::Model>> {
    let mut select = Product::find();

    if let Some(term) = search_term(query.search.as_deref()) {
        select = select.filter(product::Column::Name.like(contains_pattern(term)));
    }
    if let Some(category) = search_term(query.category.as_deref()) {
        select = select.filter(product::Column::Category.eq(category));
    }

    let order = Order::from(query.direction);
    select = match query.order_by {
        ProductOrder::Name => select.order_by(product::Column::Name, order),
        ProductOrder::UnitPrice => select.order_by(product::Column::UnitPrice, order),
        ProductOrder::SalePrice => select.order_by(product::Column::SalePrice, order),
        ProductOrder::Category => select
            .order_by(product::Column::Category, order)
            .order_by_asc(product::Column::Name),
        ProductOrder::Id => select.order_by(product::Column::Id, order),
    };

    select
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - A price is negative or not finite (NaN, infinity)
/// - Another product already uses the name
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    input: &ProductInput,
) -> Result<product::Model> {
    let (name, unit_price, sale_price) = input.validated()?;
    catalog::ensure_name_available(db, CatalogKind::Product, &name, None).await?;

    let now = chrono::Utc::now().naive_utc();

    let product = product::ActiveModel {
        name: Set(name),
        unit_price: Set(unit_price),
        sale_price: Set(sale_price),
        category: Set(input.category.trim().to_string()),
        description: Set(input.description.clone()),
        preview_image: Set(input.preview_image.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Replaces the editable fields of an existing product.
///
/// Renaming a product does not touch the names already copied into sale and import lines.
///
/// # Errors
/// Returns an error if:
/// - The input fails validation
/// - The product does not exist
/// - Another product already uses the new name
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    input: &ProductInput,
) -> Result<product::Model> {
    let (name, unit_price, sale_price) = input.validated()?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "product",
            key: product_id.to_string(),
        })?
        .into();

    catalog::ensure_name_available(db, CatalogKind::Product, &name, Some(product_id)).await?;

    product.name = Set(name);
    product.unit_price = Set(unit_price);
    product.sale_price = Set(sale_price);
    product.category = Set(input.category.trim().to_string());
    product.description = Set(input.description.clone());
    product.preview_image = Set(input.preview_image.clone());
    product.updated_at = Set(chrono::Utc::now().naive_utc());

    product.update(db).await.map_err(Into::into)
}

/// Deletes a product, detaching it from every sale and import line first.
///
/// # Errors
/// Returns [`Error::NotFound`] if the product does not exist.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<DetachReport> {
    catalog::delete_entity(db, CatalogKind::Product, product_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Test empty name validation
        let result = create_product(&db, &ProductInput::new("", 1.0, 2.0)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Test whitespace-only name validation
        let result = create_product(&db, &ProductInput::new("   ", 1.0, 2.0)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Test negative price validation
        let result = create_product(&db, &ProductInput::new("Iron", -10.0, 2.0)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        // Test NaN price validation
        let result = create_product(&db, &ProductInput::new("Iron", 1.0, f64::NAN)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let input = ProductInput {
            category: "Raw Materials".to_string(),
            description: "Cold rolled".to_string(),
            ..ProductInput::new("  Steel  ", 12.0, 18.5)
        };
        let product = create_product(&db, &input).await?;

        assert_eq!(product.name, "Steel");
        assert_eq!(product.unit_price, 12.0);
        assert_eq!(product.sale_price, 18.5);
        assert_eq!(product.category, "Raw Materials");
        assert_eq!(product.created_at, product.updated_at);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_duplicate_name_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_product(&db, "Iron").await?;

        let result = create_product(&db, &ProductInput::new("Iron", 1.0, 2.0)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Conflict {
                entity: "product",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_by_name_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_test_product(&db, "Iron").await?;

        let found = get_product_by_name(&db, "Iron").await?;
        assert_eq!(found.unwrap().id, created.id);

        let not_found = get_product_by_name(&db, "Non-existent").await?;
        assert!(not_found.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Original Name").await?;

        let updated =
            update_product(&db, product.id, &ProductInput::new("Updated Name", 3.0, 4.0)).await?;
        assert_eq!(updated.name, "Updated Name");
        assert_eq!(updated.sale_price, 4.0);
        assert_eq!(updated.id, product.id);

        // Verify the update persisted
        let retrieved = get_product_by_id(&db, product.id).await?.unwrap();
        assert_eq!(retrieved.name, "Updated Name");
        assert_eq!(retrieved.unit_price, 3.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_keeps_own_name() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Iron").await?;

        let updated = update_product(&db, product.id, &ProductInput::new("Iron", 9.0, 9.5)).await?;
        assert_eq!(updated.unit_price, 9.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_product(&db, 999, &ProductInput::new("Ghost", 1.0, 1.0)).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_query_products_search_and_order() -> Result<()> {
        let db = setup_test_db().await?;
        create_product(&db, &ProductInput::new("Steel Rod", 10.0, 30.0)).await?;
        create_product(&db, &ProductInput::new("Steel Sheet", 10.0, 20.0)).await?;
        create_product(&db, &ProductInput::new("Wool", 1.0, 2.0)).await?;

        let query = ProductQuery {
            search: Some("steel".to_string()),
            order_by: ProductOrder::SalePrice,
            direction: SortDirection::Descending,
            ..ProductQuery::default()
        };
        let found = query_products(&db, &query).await?;
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Steel Rod", "Steel Sheet"]);

        let everything = query_products(&db, &ProductQuery::default()).await?;
        assert_eq!(everything.len(), 3);
        assert_eq!(everything[0].name, "Steel Rod");

        Ok(())
    }

    #[tokio::test]
    async fn test_query_products_treats_wildcards_literally() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_product(&db, "Bolts 50% off").await?;
        create_test_product(&db, "M6_bolt").await?;
        create_test_product(&db, "M6xbolt").await?;

        let search = |term: &str| ProductQuery {
            search: Some(term.to_string()),
            ..ProductQuery::default()
        };
        let names = |found: Vec<product::Model>| {
            found.into_iter().map(|p| p.name).collect::<Vec<_>>()
        };

        assert_eq!(names(query_products(&db, &search("%")).await?), vec!["Bolts 50% off"]);
        assert_eq!(names(query_products(&db, &search("6_b")).await?), vec!["M6_bolt"]);
        assert!(query_products(&db, &search("\\")).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_query_products_by_category() -> Result<()> {
        let db = setup_test_db().await?;
        let tools = ProductInput {
            category: "Tools".to_string(),
            ..ProductInput::new("Hammer", 5.0, 8.0)
        };
        create_product(&db, &tools).await?;
        create_test_product(&db, "Iron").await?;

        let query = ProductQuery {
            category: Some("Tools".to_string()),
            ..ProductQuery::default()
        };
        let found = query_products(&db, &query).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hammer");

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Iron").await?;

        let report = delete_product(&db, product.id).await?;
        assert_eq!(report.id, product.id);
        assert_eq!(report.detached_references, 0);

        assert!(get_all_products(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = delete_product(&db, 999).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }
}
