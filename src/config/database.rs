//! Database configuration module for `ExpenseBuddy`.
//!
//! This module handles the `SQLite` connection and creation of the key-value table using
//! `SeaORM`. The table is generated from the entity definition with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust model.

use crate::entities::StorageEntry;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Default `SQLite` location when `DATABASE_URL` is not set. `mode=rwc` creates the file.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://expense_buddy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or the default path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the key-value table if it does not exist yet.
///
/// Safe to call on every start-up: existing data is left alone.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut storage_table = schema.create_table_from_entity(StorageEntry);
    storage_table.if_not_exists();

    db.execute(builder.build(&storage_table)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StorageEntryModel;
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<StorageEntryModel> = StorageEntry::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_twice_is_harmless() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;

        let rows: Vec<StorageEntryModel> = StorageEntry::find().all(&db).await?;
        assert!(rows.is_empty());
        Ok(())
    }
}
