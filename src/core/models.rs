//! Domain records kept by the ledger.
//!
//! Field names serialize in camelCase (`commercialId`, `receiptImage`) so the stored JSON
//! matches what the collections have always looked like in storage.

use crate::{
    core::receipt::ReceiptImage,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Textual layout of every stored expense date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A salesperson who incurs expenses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commercial {
    /// Stable unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Contact phone
    #[serde(default)]
    pub phone: String,
}

/// A spending category such as travel or meals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseType {
    /// Stable unique identifier
    pub id: String,
    /// Category name, matched case-insensitively against extraction suggestions
    pub name: String,
}

/// One reimbursable transaction with its receipt.
///
/// `commercial_id` and `type_id` are not checked against the catalogs; a dangling reference
/// is rendered as unknown rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Generated at creation, never changed or reused
    pub id: String,
    /// Transaction date, stored as `YYYY-MM-DD`
    pub date: NaiveDate,
    /// Merchant or supplier
    pub creditor: String,
    /// Non-negative amount, currency-agnostic
    pub amount: f64,
    /// Salesperson who incurred the expense
    pub commercial_id: String,
    /// Expense category
    pub type_id: String,
    /// Free-text notes
    #[serde(default)]
    pub observations: String,
    /// Receipt image as a data URI; the image of record
    pub receipt_image: ReceiptImage,
}

/// Generates a fresh record identifier.
#[must_use]
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parses a `YYYY-MM-DD` date, rejecting anything that would not round-trip to exactly
/// ten characters in that layout.
pub fn parse_expense_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(Error::InvalidDate {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| Error::InvalidDate {
        value: value.to_string(),
    })
}

/// Parses an amount typed by a user, accepting a comma as decimal separator.
pub fn parse_amount(value: &str) -> Result<f64> {
    let normalized = value.trim().replace(',', ".");
    let amount: f64 = normalized.parse().map_err(|_| Error::InvalidAmount {
        value: value.to_string(),
    })?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount {
            value: value.to_string(),
        });
    }
    Ok(amount)
}
