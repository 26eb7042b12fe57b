//! Shared test utilities.
//!
//! Helpers for setting up in-memory databases and engines with sensible defaults.

use crate::{
    core::{
        clock::FixedClock,
        pricing::TaxRates,
        product::{self, NewProduct},
    },
    engine::Engine,
    entities::product as product_entity,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A product definition with sensible defaults.
///
/// # Defaults
/// * `category`: "food"
/// * `unit`: "unit"
/// * `initial_stock`: 10.0
/// * `min_stock`: 2.0
/// * `purchase_price`: 1.0
/// * `selling_price`: 5.0
pub fn test_product(name: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: "food".to_string(),
        unit: "unit".to_string(),
        initial_stock: 10.0,
        min_stock: 2.0,
        purchase_price: 1.0,
        selling_price: 5.0,
    }
}

/// Sets up a test database with a single default product named "Test Product".
pub async fn setup_with_product() -> Result<(DatabaseConnection, product_entity::Model)> {
    let db = setup_test_db().await?;
    let product = product::create_product(&db, test_product("Test Product"), Utc::now()).await?;
    Ok((db, product))
}

/// An engine over a fresh in-memory database, 20% standard VAT, 10% on food.
pub async fn setup_engine() -> Result<Engine> {
    let db = setup_test_db().await?;
    Ok(Engine::new(db, test_tax_rates()))
}

/// Like [`setup_engine`] with the clock frozen at `now`.
pub async fn setup_engine_at(now: DateTime<Utc>) -> Result<Engine> {
    let db = setup_test_db().await?;
    Ok(Engine::with_clock(
        db,
        test_tax_rates(),
        Arc::new(FixedClock(now)),
    ))
}

/// An engine plus one default product (quantity 10, minimum 2).
pub async fn setup_engine_with_product() -> Result<(Engine, product_entity::Model)> {
    let engine = setup_engine().await?;
    let product = create_product_with(&engine, test_product("Test Product")).await?;
    Ok((engine, product))
}

/// Creates a product through the engine's connection.
pub async fn create_product_with(
    engine: &Engine,
    new_product: NewProduct,
) -> Result<product_entity::Model> {
    product::create_product(engine.db(), new_product, engine.now()).await
}

/// Reads a product back from the database.
pub async fn reload_product(engine: &Engine, product_id: i64) -> Result<product_entity::Model> {
    product::get_product_by_id(engine.db(), product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

fn test_tax_rates() -> TaxRates {
    TaxRates::new(0.2).with_category("food", 0.1)
}
