//! Entity module - SeaORM entity definitions for the database.
//! The application keeps its collections as serialized values in a single key-value table.

pub mod storage_entry;

pub use storage_entry::{
    Column as StorageEntryColumn, Entity as StorageEntry, Model as StorageEntryModel,
};
