//! Storage entry entity - the persistent key-value table.
//!
//! Each row holds one whole collection serialized as JSON under a fixed key, the same way a
//! browser's local storage would. Rows are read once at start-up and rewritten after every
//! mutation of their collection.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Storage entry database model - one serialized collection per key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_entries")]
pub struct Model {
    /// Collection key (e.g. `"expenses"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Serialized collection
    #[sea_orm(column_type = "Text")]
    pub value: String,
    /// When this key was last written
    pub updated_at: DateTime,
}

/// `StorageEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
