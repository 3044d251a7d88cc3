//! Unified error type for the crate.
//!
//! Every fallible operation returns [`Result`]. The variants follow the failure kinds the
//! application recovers from: adapter failures fall back to manual entry or leave the record
//! untouched, validation failures block a commit, and the rest are plumbing errors.

use crate::core::capture::RequiredField;
use thiserror::Error;

/// All errors produced by `ExpenseBuddy`.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file or environment could not be used
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Storage backend failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A collection could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The receipt extraction call failed; the user has to fill the form by hand
    #[error("Receipt extraction failed: {message}")]
    Extraction {
        /// Transport, parsing or model error
        message: String,
    },

    /// The receipt edit call failed; the stored image is left as it was
    #[error("Receipt edit failed: {message}")]
    Edit {
        /// Transport, parsing or missing-image error
        message: String,
    },

    /// A capture was submitted with required fields missing
    #[error("Missing required fields: {}", RequiredField::join(.fields))]
    MissingFields {
        /// Every required field that was missing, in form order
        fields: Vec<RequiredField>,
    },

    /// A new image was selected while the previous one was still being read
    #[error("A receipt is still being analyzed")]
    ExtractionInProgress,

    /// Amount is not a finite, non-negative number
    #[error("Invalid amount: {value}")]
    InvalidAmount {
        /// The rejected input
        value: String,
    },

    /// Date is not a `YYYY-MM-DD` calendar date
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input
        value: String,
    },

    /// Uploaded file cannot be used as a receipt image
    #[error("Invalid receipt image: {reason}")]
    InvalidImage {
        /// Why it was rejected
        reason: String,
    },

    /// Any other rejected user input
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with it
        message: String,
    },

    /// No record with this id in the collection
    #[error("{kind} '{id}' not found")]
    RecordNotFound {
        /// Record kind, e.g. "Expense"
        kind: &'static str,
        /// The id that was looked up
        id: String,
    },

    /// A record with this id already exists
    #[error("{kind} '{id}' already exists")]
    DuplicateRecord {
        /// Record kind, e.g. "Expense"
        kind: &'static str,
        /// The clashing id
        id: String,
    },

    /// CSV export failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatting into a response buffer failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Required environment variable missing
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error
    #[error("Discord framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
