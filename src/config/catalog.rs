//! Catalog configuration loading from config.toml
//!
//! The configuration file declares the VAT table and the products and dining
//! tables used to seed an empty database. Seeding is idempotent, so the same
//! file can be applied on every start.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// VAT rates
    #[serde(default)]
    pub tax: TaxConfig,
    /// Products to seed
    #[serde(default)]
    pub products: Vec<ProductConfig>,
    /// Dining tables to seed
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

/// VAT rates, as fractions (0.1 for 10%)
#[derive(Debug, Deserialize, Clone)]
pub struct TaxConfig {
    /// Rate used when a category has no rate of its own
    pub standard_rate: f64,
    /// Per-category rates, keyed by product category
    #[serde(default)]
    pub categories: HashMap<String, f64>,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            standard_rate: 0.20,
            categories: HashMap::new(),
        }
    }
}

/// Configuration for a single seeded product
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Name of the product, used to detect already seeded entries
    pub name: String,
    /// Category, also selects the VAT rate
    pub category: String,
    /// Unit of measure
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Stock the product starts with
    #[serde(default)]
    pub initial_stock: f64,
    /// Reorder threshold
    #[serde(default)]
    pub min_stock: f64,
    /// Purchase price per unit
    #[serde(default)]
    pub purchase_price: f64,
    /// Selling price per unit, excluding VAT
    pub selling_price: f64,
}

fn default_unit() -> String {
    "unit".to_string()
}

/// Configuration for a single seeded dining table
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TableConfig {
    /// Table number
    pub number: i32,
    /// Seats
    pub capacity: i32,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read config file {}: {e}",
            path.as_ref().display()
        ),
    })?;

    parse_config(&contents)
}

/// Parses catalog configuration from TOML text, validating the tax table.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    validate_rate("standard_rate", config.tax.standard_rate)?;
    for (category, rate) in &config.tax.categories {
        validate_rate(category, *rate)?;
    }

    Ok(config)
}

fn validate_rate(name: &str, rate: f64) -> Result<()> {
    if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
        return Err(Error::Config {
            message: format!("VAT rate for {name} must be a fraction in [0, 1), got {rate}"),
        });
    }
    Ok(())
}
