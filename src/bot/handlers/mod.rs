//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! button clicks, and other non-command interactions.

/// Autocomplete handlers for commercials, categories, years and expenses
pub mod autocomplete;
/// Two-button confirmation before destructive actions
pub mod confirm;
