//! Catalog seeding from the configuration file.
//!
//! Seeding is idempotent: products are matched by name and tables by number, and
//! anything already present is left untouched.

use crate::{
    config::catalog::Config,
    core::product::{self, NewProduct},
    engine::Engine,
    errors::Result,
};
use tracing::{debug, info};

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Products inserted
    pub products_created: usize,
    /// Tables inserted
    pub tables_created: usize,
}

/// Inserts the configured products and tables that do not exist yet.
pub async fn seed_catalog(engine: &Engine, config: &Config) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for entry in &config.products {
        if product::get_product_by_name(engine.db(), &entry.name)
            .await?
            .is_some()
        {
            debug!(name = %entry.name, "Product already seeded");
            continue;
        }

        product::create_product(
            engine.db(),
            NewProduct {
                name: entry.name.clone(),
                category: entry.category.clone(),
                unit: entry.unit.clone(),
                initial_stock: entry.initial_stock,
                min_stock: entry.min_stock,
                purchase_price: entry.purchase_price,
                selling_price: entry.selling_price,
            },
            engine.now(),
        )
        .await?;
        summary.products_created += 1;
    }

    for table in &config.tables {
        if engine
            .tables
            .get_table_by_number(table.number)
            .await?
            .is_some()
        {
            debug!(number = table.number, "Table already seeded");
            continue;
        }

        engine
            .tables
            .create_table(table.number, table.capacity)
            .await?;
        summary.tables_created += 1;
    }

    info!(
        products = summary.products_created,
        tables = summary.tables_created,
        "Catalog seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{config::catalog::parse_config, test_utils::*};

    const CATALOG: &str = r#"
[tax]
standard_rate = 0.2

[[products]]
name = "Espresso"
category = "Drinks"
initial_stock = 200
min_stock = 20
purchase_price = 0.3
selling_price = 2.0

[[products]]
name = "Croissant"
category = "food"
unit = "piece"
initial_stock = 30
min_stock = 5
purchase_price = 0.4
selling_price = 1.5

[[tables]]
number = 1
capacity = 2

[[tables]]
number = 2
capacity = 4
"#;

    #[tokio::test]
    async fn test_seed_catalog() -> Result<()> {
        let engine = setup_engine().await?;
        let config = parse_config(CATALOG)?;

        let summary = seed_catalog(&engine, &config).await?;
        assert_eq!(
            summary,
            SeedSummary {
                products_created: 2,
                tables_created: 2
            }
        );

        let espresso = product::get_product_by_name(engine.db(), "Espresso")
            .await?
            .unwrap();
        assert_eq!(espresso.category, "drinks");
        assert_eq!(espresso.unit, "unit");
        assert_eq!(espresso.quantity, 200.0);
        assert_eq!(espresso.initial_stock, 200.0);

        assert_eq!(engine.tables.get_all_tables().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() -> Result<()> {
        let engine = setup_engine().await?;
        let config = parse_config(CATALOG)?;

        seed_catalog(&engine, &config).await?;
        let second = seed_catalog(&engine, &config).await?;

        assert_eq!(second, SeedSummary::default());
        assert_eq!(product::get_all_products(engine.db()).await?.len(), 2);
        assert_eq!(engine.tables.get_all_tables().await?.len(), 2);
        Ok(())
    }
}
