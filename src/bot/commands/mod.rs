//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Commercial and category management commands
pub mod catalog;

/// Expense history commands
pub mod expenses;

/// General utility commands
pub mod general;

/// Receipt capture commands
pub mod receipt;

// Export commands
pub use catalog::*;
pub use expenses::*;
pub use general::*;
pub use receipt::*;
