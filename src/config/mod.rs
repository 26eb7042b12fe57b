/// Database configuration and connection management
pub mod database;

/// Tax table and seed catalog loading from config.toml
pub mod catalog;
