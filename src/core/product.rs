//! Product business logic - Handles the product catalog.
//!
//! This module creates, retrieves and updates products. It never writes the cached
//! `quantity` after creation: stock only changes through the inventory service and
//! its ledger. All functions are async and return Result types for proper error
//! handling throughout the system.

use crate::{
    entities::{Product, product},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Input for [`create_product`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Display name, must not be blank
    pub name: String,
    /// Category, also selects the VAT rate
    pub category: String,
    /// Unit of measure
    pub unit: String,
    /// Stock on hand at creation
    pub initial_stock: f64,
    /// Reorder threshold
    pub min_stock: f64,
    /// Purchase price per unit
    pub purchase_price: f64,
    /// Selling price per unit, excluding VAT
    pub selling_price: f64,
}

/// Catalog fields that can change after creation. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    /// New name
    pub name: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New unit of measure
    pub unit: Option<String>,
    /// New reorder threshold
    pub min_stock: Option<f64>,
    /// New purchase price
    pub purchase_price: Option<f64>,
    /// New selling price
    pub selling_price: Option<f64>,
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("Product {field} cannot be empty")));
    }
    Ok(())
}

fn validate_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "Product {field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Retrieves all active products, ordered alphabetically by name.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every product, active or not, ordered by id.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by name, returning None if not found.
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

/// Active products whose quantity is at or below their reorder threshold.
pub async fn get_low_stock_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Ok(get_all_active_products(db)
        .await?
        .into_iter()
        .filter(product::Model::is_low_stock)
        .collect())
}

/// Creates a new product whose cached quantity starts at `initial_stock`.
///
/// # Errors
/// Returns [`Error::Validation`] if the name or category is blank, or if any
/// amount is negative or not finite.
pub async fn create_product(
    db: &DatabaseConnection,
    new_product: NewProduct,
    now: DateTime<Utc>,
) -> Result<product::Model> {
    validate_name("name", &new_product.name)?;
    validate_name("category", &new_product.category)?;
    validate_amount("initial stock", new_product.initial_stock)?;
    validate_amount("minimum stock", new_product.min_stock)?;
    validate_amount("purchase price", new_product.purchase_price)?;
    validate_amount("selling price", new_product.selling_price)?;

    let unit = match new_product.unit.trim() {
        "" => "unit".to_string(),
        unit => unit.to_string(),
    };

    let product = product::ActiveModel {
        name: Set(new_product.name.trim().to_string()),
        category: Set(new_product.category.trim().to_lowercase()),
        unit: Set(unit),
        initial_stock: Set(new_product.initial_stock),
        quantity: Set(new_product.initial_stock),
        min_stock: Set(new_product.min_stock),
        purchase_price: Set(new_product.purchase_price),
        selling_price: Set(new_product.selling_price),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Updates a product's catalog fields. Stock quantity is not reachable from here.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] for an unknown id and [`Error::Validation`]
/// for blank names or invalid amounts.
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
    now: DateTime<Utc>,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    if let Some(name) = update.name {
        validate_name("name", &name)?;
        product.name = Set(name.trim().to_string());
    }
    if let Some(category) = update.category {
        validate_name("category", &category)?;
        product.category = Set(category.trim().to_lowercase());
    }
    if let Some(unit) = update.unit {
        validate_name("unit", &unit)?;
        product.unit = Set(unit.trim().to_string());
    }
    if let Some(min_stock) = update.min_stock {
        validate_amount("minimum stock", min_stock)?;
        product.min_stock = Set(min_stock);
    }
    if let Some(purchase_price) = update.purchase_price {
        validate_amount("purchase price", purchase_price)?;
        product.purchase_price = Set(purchase_price);
    }
    if let Some(selling_price) = update.selling_price {
        validate_amount("selling price", selling_price)?;
        product.selling_price = Set(selling_price);
    }
    product.updated_at = Set(now);

    product.update(db).await.map_err(Into::into)
}

/// Marks a product inactive. Its ledger and existing order items are preserved.
pub async fn deactivate_product(
    db: &DatabaseConnection,
    product_id: i64,
    now: DateTime<Utc>,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    product.is_active = Set(false);
    product.updated_at = Set(now);

    product.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Blank name
        let result = create_product(&db, NewProduct {
            name: "   ".to_string(),
            ..test_product("x")
        }, Utc::now())
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // Negative selling price
        let result = create_product(&db, NewProduct {
            selling_price: -1.0,
            ..test_product("Soup")
        }, Utc::now())
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        // NaN initial stock
        let result = create_product(&db, NewProduct {
            initial_stock: f64::NAN,
            ..test_product("Soup")
        }, Utc::now())
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let product = create_product(&db, NewProduct {
            name: "  Espresso ".to_string(),
            category: "Drinks".to_string(),
            unit: String::new(),
            ..test_product("ignored")
        }, Utc::now())
        .await?;

        assert_eq!(product.name, "Espresso");
        assert_eq!(product.category, "drinks");
        assert_eq!(product.unit, "unit");
        assert_eq!(product.quantity, product.initial_stock);
        assert!(product.is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_leaves_quantity_alone() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let updated = update_product(&db, product.id, ProductUpdate {
            selling_price: Some(4.5),
            min_stock: Some(5.0),
            ..Default::default()
        }, Utc::now())
        .await?;

        assert_eq!(updated.selling_price, 4.5);
        assert_eq!(updated.min_stock, 5.0);
        assert_eq!(updated.quantity, product.quantity);
        assert_eq!(updated.name, product.name);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = update_product(&db, 999, ProductUpdate::default(), Utc::now()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_product_hides_it() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let deactivated = deactivate_product(&db, product.id, Utc::now()).await?;
        assert!(!deactivated.is_active);

        assert!(get_all_active_products(&db).await?.is_empty());
        assert_eq!(get_all_products(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_low_stock_products() -> Result<()> {
        let db = setup_test_db().await?;
        create_product(&db, NewProduct {
            initial_stock: 1.0,
            min_stock: 2.0,
            ..test_product("Basil")
        }, Utc::now())
        .await?;
        create_product(&db, test_product("Rice"), Utc::now()).await?;

        let low = get_low_stock_products(&db).await?;
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Basil");

        Ok(())
    }

    #[tokio::test]
    async fn test_timestamps_come_from_the_caller() -> Result<()> {
        let db = setup_test_db().await?;
        let opened = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let closed = Utc.with_ymd_and_hms(2026, 9, 30, 23, 0, 0).unwrap();

        let product = create_product(&db, test_product("Truffle"), opened).await?;
        assert_eq!(product.created_at, opened);
        assert_eq!(product.updated_at, opened);

        let retired = deactivate_product(&db, product.id, closed).await?;
        assert_eq!(retired.created_at, opened);
        assert_eq!(retired.updated_at, closed);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_by_name() -> Result<()> {
        let (db, product) = setup_with_product().await?;

        let found = get_product_by_name(&db, &product.name).await?;
        assert_eq!(found.unwrap().id, product.id);
        assert!(get_product_by_name(&db, "Nothing").await?.is_none());

        Ok(())
    }
}
