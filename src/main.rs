use bistro::{
    config::{
        catalog::{self, Config},
        database,
    },
    core::{pricing::TaxRates, seed},
    engine::Engine,
    errors::Result,
};
use dotenvy::dotenv;
use std::{env, path::Path};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the catalog configuration
    let config = load_configuration()?;

    // 4. Connect and make sure the schema exists
    ensure_data_dir(&database::get_database_url())?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    let engine = Engine::new(db, TaxRates::from(&config.tax));

    // 5. Seed products and tables that are not there yet
    seed::seed_catalog(&engine, &config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Bring cached state back in line with the source of truth
    let tables = engine.tables.refresh_all_tables().await?;
    let mut repaired = 0;
    for check in engine.inventory.verify_ledger().await? {
        if !check.is_consistent() {
            warn!(
                product_id = check.product_id,
                cached = check.cached,
                derived = check.derived,
                "Stock drift detected, repairing from ledger"
            );
            engine.inventory.recompute_from_ledger(check.product_id).await?;
            repaired += 1;
        }
    }

    let low_stock = engine.inventory.get_low_stock_products().await?;
    for product in &low_stock {
        warn!(
            product = %product.name,
            quantity = product.quantity,
            min_stock = product.min_stock,
            "Low stock"
        );
    }

    info!(
        tables = tables.len(),
        repaired,
        low_stock = low_stock.len(),
        "Engine ready"
    );
    Ok(())
}

fn load_configuration() -> Result<Config> {
    let path = env::var("BISTRO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        warn!("No configuration at {}, using an empty catalog", path);
        return catalog::parse_config("");
    }

    let config = catalog::load_config(&path)
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        path = %path,
        products = config.products.len(),
        tables = config.tables.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Creates the directory holding a file-backed `SQLite` database.
fn ensure_data_dir(database_url: &str) -> Result<()> {
    let Some(file) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = file.split('?').next().unwrap_or(file);
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
