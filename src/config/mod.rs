/// Database connection and table creation
pub mod database;

/// Application settings and default catalogs loaded from config.toml
pub mod settings;
