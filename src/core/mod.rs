//! Core business logic, independent of the Discord layer.

/// Capture workflow: upload, extraction prefill, validation and commit
pub mod capture;
/// Receipt edit adapter contract
pub mod editing;
/// Receipt extraction adapter contract and answer normalisation
pub mod extraction;
/// Gemini REST client implementing both adapters
pub mod gemini;
/// Filtering, name resolution, CSV export and receipt edits over the history
pub mod history;
/// The domain store owning every persisted collection
pub mod ledger;
/// Record types and input parsing
pub mod models;
/// Receipt images as data URIs
pub mod receipt;
/// Commercial and expense-type catalog helpers
pub mod reference;
/// Key-value persistence of whole collections
pub mod storage;
