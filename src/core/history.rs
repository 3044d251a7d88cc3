//! Expense history: filtering, name resolution, CSV export and receipt edits.

use crate::{
    core::{
        ledger::Ledger,
        models::{Commercial, DATE_FORMAT, Expense, ExpenseType},
        receipt::ReceiptImage,
    },
    errors::{Error, Result},
};
use chrono::Datelike;

/// Rendered in place of a commercial or category that no longer exists.
pub const UNKNOWN_LABEL: &str = "Desconocido";

/// File name of the CSV export.
pub const EXPORT_FILE_NAME: &str = "gastos.csv";

const EXPORT_HEADER: [&str; 6] = [
    "Fecha",
    "Acreedor",
    "Comercial",
    "Tipo",
    "Importe",
    "Observaciones",
];

/// Equality filters over the expense history. `None` means no constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Exact commercial id
    pub commercial_id: Option<String>,
    /// Exact expense type id
    pub type_id: Option<String>,
    /// Calendar year of the expense date
    pub year: Option<i32>,
    /// Calendar month of the expense date, 1 to 12
    pub month: Option<u32>,
}

impl ExpenseFilter {
    /// Whether no field constrains anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.commercial_id.is_none()
            && self.type_id.is_none()
            && self.year.is_none()
            && self.month.is_none()
    }

    /// Whether `expense` satisfies every set field.
    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        self.commercial_id
            .as_deref()
            .is_none_or(|id| expense.commercial_id == id)
            && self
                .type_id
                .as_deref()
                .is_none_or(|id| expense.type_id == id)
            && self.year.is_none_or(|year| expense.date.year() == year)
            && self.month.is_none_or(|month| expense.date.month() == month)
    }
}

/// Parses a four-digit year filter. Blank input means no constraint.
pub fn parse_year(value: &str) -> Result<Option<i32>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() != 4 {
        return Err(invalid_filter("year", value));
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| invalid_filter("year", value))
}

/// Parses a month filter (`03` or `3`). Blank input means no constraint.
pub fn parse_month(value: &str) -> Result<Option<u32>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) && trimmed.len() <= 2 => Ok(Some(month)),
        _ => Err(invalid_filter("month", value)),
    }
}

fn invalid_filter(field: &str, value: &str) -> Error {
    Error::InvalidInput {
        message: format!("'{value}' is not a valid {field}"),
    }
}

/// Expenses passing `filter`, in their stored order.
#[must_use]
pub fn filter_expenses<'a>(expenses: &'a [Expense], filter: &ExpenseFilter) -> Vec<&'a Expense> {
    expenses
        .iter()
        .filter(|expense| filter.matches(expense))
        .collect()
}

/// Distinct years present in the history, most recent first.
#[must_use]
pub fn available_years(expenses: &[Expense]) -> Vec<i32> {
    let mut years: Vec<i32> = expenses.iter().map(|e| e.date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Sum of the listed amounts.
#[must_use]
pub fn total_amount(expenses: &[&Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// An expense with its references resolved to display names.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseRow<'a> {
    /// The underlying record
    pub expense: &'a Expense,
    /// Commercial name, or [`UNKNOWN_LABEL`]
    pub commercial: &'a str,
    /// Category name, or [`UNKNOWN_LABEL`]
    pub expense_type: &'a str,
}

/// Resolves the commercial and category names of each expense.
#[must_use]
pub fn resolve_rows<'a>(
    expenses: &[&'a Expense],
    commercials: &'a [Commercial],
    expense_types: &'a [ExpenseType],
) -> Vec<ExpenseRow<'a>> {
    expenses
        .iter()
        .map(|expense| ExpenseRow {
            expense,
            commercial: commercials
                .iter()
                .find(|c| c.id == expense.commercial_id)
                .map_or(UNKNOWN_LABEL, |c| c.name.as_str()),
            expense_type: expense_types
                .iter()
                .find(|t| t.id == expense.type_id)
                .map_or(UNKNOWN_LABEL, |t| t.name.as_str()),
        })
        .collect()
}

/// Renders rows as UTF-8 CSV with a header line.
pub fn export_csv(rows: &[ExpenseRow<'_>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for row in rows {
        let date = row.expense.date.format(DATE_FORMAT).to_string();
        let amount = format!("{:.2}", row.expense.amount);
        writer.write_record([
            date.as_str(),
            row.expense.creditor.as_str(),
            row.commercial,
            row.expense_type,
            amount.as_str(),
            row.expense.observations.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Replaces the receipt image of an expense, leaving every other field as it was.
///
/// Fails with [`Error::RecordNotFound`] if the expense was deleted while the edit ran.
pub async fn apply_receipt_edit(
    ledger: &mut Ledger,
    expense_id: &str,
    image: ReceiptImage,
) -> Result<Expense> {
    let current: &Expense = ledger.get(expense_id).ok_or_else(|| Error::RecordNotFound {
        kind: "Expense",
        id: expense_id.to_string(),
    })?;
    let updated = Expense {
        receipt_image: image,
        ..current.clone()
    };

    if !ledger.update(updated.clone()).await? {
        return Err(Error::RecordNotFound {
            kind: "Expense",
            id: expense_id.to_string(),
        });
    }
    tracing::info!("Receipt image of expense '{expense_id}' replaced");
    Ok(updated)
}
