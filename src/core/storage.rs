//! Key-value persistence for whole collections.
//!
//! Each collection lives in the `storage_entries` table under a fixed key as a JSON array.
//! Reads that fail for any reason (missing key, database error, malformed JSON) report
//! `None` so start-up can fall back to defaults instead of failing. Malformed records
//! inside a readable array are skipped individually.

use crate::{
    entities::{StorageEntry, storage_entry},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use serde::{Serialize, de::DeserializeOwned};

/// Reads the raw value stored under `key`.
pub async fn read_entry<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let entry = StorageEntry::find_by_id(key.to_string()).one(db).await?;
    Ok(entry.map(|e| e.value))
}

/// Writes `value` under `key`, replacing any previous value.
pub async fn write_entry<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = StorageEntry::find_by_id(key.to_string()).one(db).await?;

    if let Some(entry) = existing {
        let mut active_model: storage_entry::ActiveModel = entry.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_entry = storage_entry::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(now),
        };
        new_entry.insert(db).await?;
    }

    Ok(())
}

/// Loads the collection stored under `key`.
///
/// Returns `None` when the key is absent or its value is not a JSON array; the cause is
/// logged, never surfaced. Array elements that do not parse as `T` are dropped one by one
/// so a single bad record never hides the rest. Whenever something is dropped, the raw
/// value is first copied under [`unreadable_key`] since the next save replaces it.
pub async fn load_collection<T, C>(db: &C, key: &str) -> Option<Vec<T>>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    let raw = match read_entry(db, key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::debug!("No stored value for '{key}'");
            return None;
        }
        Err(e) => {
            tracing::warn!("Failed to read stored '{key}': {e}");
            return None;
        }
    };

    let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Stored '{key}' is unreadable, falling back to defaults: {e}");
            preserve_unreadable(db, key, raw).await;
            return None;
        }
    };

    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            serde_json::from_value(value)
                .inspect_err(|e| tracing::warn!("Dropping unreadable '{key}' record #{index}: {e}"))
                .ok()
        })
        .collect();

    if items.len() < total {
        preserve_unreadable(db, key, raw).await;
    }
    Some(items)
}

/// Key holding the last raw value of `key` that could not be fully read.
#[must_use]
pub fn unreadable_key(key: &str) -> String {
    format!("{key}.unreadable")
}

async fn preserve_unreadable<C>(db: &C, key: &str, raw: String)
where
    C: ConnectionTrait,
{
    let backup = unreadable_key(key);
    match write_entry(db, &backup, raw).await {
        Ok(()) => tracing::warn!("Raw value of '{key}' kept under '{backup}'"),
        Err(e) => tracing::warn!("Failed to keep raw value of '{key}': {e}"),
    }
}

/// Serializes `items` and stores them under `key`.
pub async fn save_collection<T, C>(db: &C, key: &str, items: &[T]) -> Result<()>
where
    T: Serialize,
    C: ConnectionTrait,
{
    let value = serde_json::to_string(items)?;
    write_entry(db, key, value).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::models::ExpenseType;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_write_then_read_entry() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(read_entry(&db, "expenses").await?, None);

        write_entry(&db, "expenses", "[]".to_string()).await?;
        assert_eq!(read_entry(&db, "expenses").await?.as_deref(), Some("[]"));

        write_entry(&db, "expenses", "[1]".to_string()).await?;
        assert_eq!(read_entry(&db, "expenses").await?.as_deref(), Some("[1]"));

        Ok(())
    }

    #[tokio::test]
    async fn test_collection_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let types = vec![
            ExpenseType {
                id: "a".to_string(),
                name: "Comidas".to_string(),
            },
            ExpenseType {
                id: "b".to_string(),
                name: "Peajes".to_string(),
            },
        ];

        save_collection(&db, "expenseTypes", &types).await?;
        let loaded: Option<Vec<ExpenseType>> = load_collection(&db, "expenseTypes").await;

        assert_eq!(loaded, Some(types));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_collection_loads_as_none() -> Result<()> {
        let db = setup_test_db().await?;
        write_entry(&db, "expenseTypes", "{not json".to_string()).await?;

        let loaded: Option<Vec<ExpenseType>> = load_collection(&db, "expenseTypes").await;
        assert!(loaded.is_none());
        assert_eq!(
            read_entry(&db, &unreadable_key("expenseTypes")).await?.as_deref(),
            Some("{not json")
        );

        let missing: Option<Vec<ExpenseType>> = load_collection(&db, "commercials").await;
        assert!(missing.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_record_is_dropped_alone() -> Result<()> {
        let db = setup_test_db().await?;
        let raw = r#"[{"id":"a","name":"Comidas"},{"id":7},{"id":"b","name":"Peajes"}]"#;
        write_entry(&db, "expenseTypes", raw.to_string()).await?;

        let loaded: Vec<ExpenseType> = load_collection(&db, "expenseTypes").await.unwrap();

        let ids: Vec<&str> = loaded.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(
            read_entry(&db, &unreadable_key("expenseTypes")).await?.as_deref(),
            Some(raw)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_collection_leaves_no_backup() -> Result<()> {
        let db = setup_test_db().await?;
        write_entry(&db, "expenseTypes", "[]".to_string()).await?;

        let loaded: Option<Vec<ExpenseType>> = load_collection(&db, "expenseTypes").await;

        assert_eq!(loaded, Some(Vec::new()));
        assert_eq!(read_entry(&db, &unreadable_key("expenseTypes")).await?, None);
        Ok(())
    }
}
