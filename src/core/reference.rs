//! Reference data: the commercial and expense-type catalogs.
//!
//! Records are created here and then stored, edited and deleted through the
//! [`Ledger`](crate::core::ledger::Ledger). Deleting a catalog record never touches the
//! expenses that point at it.

use crate::{
    core::models::{Commercial, ExpenseType, new_record_id},
    errors::{Error, Result},
};

fn required_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput {
            message: format!("{what} name cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

/// Builds a new commercial with a fresh id.
pub fn new_commercial(name: &str, email: &str, phone: &str) -> Result<Commercial> {
    Ok(Commercial {
        id: new_record_id(),
        name: required_name(name, "Commercial")?,
        email: email.trim().to_string(),
        phone: phone.trim().to_string(),
    })
}

/// Builds a new expense type with a fresh id.
pub fn new_expense_type(name: &str) -> Result<ExpenseType> {
    Ok(ExpenseType {
        id: new_record_id(),
        name: required_name(name, "Expense type")?,
    })
}

/// Copy of `commercial` with the given fields changed. `None` keeps the current value.
pub fn edited_commercial(
    commercial: &Commercial,
    name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Commercial> {
    Ok(Commercial {
        id: commercial.id.clone(),
        name: match name {
            Some(name) => required_name(name, "Commercial")?,
            None => commercial.name.clone(),
        },
        email: email.map_or_else(|| commercial.email.clone(), |e| e.trim().to_string()),
        phone: phone.map_or_else(|| commercial.phone.clone(), |p| p.trim().to_string()),
    })
}

/// Copy of `expense_type` under a new name.
pub fn renamed_expense_type(expense_type: &ExpenseType, name: &str) -> Result<ExpenseType> {
    Ok(ExpenseType {
        id: expense_type.id.clone(),
        name: required_name(name, "Expense type")?,
    })
}

/// Finds a commercial by id, or by name ignoring case.
#[must_use]
pub fn find_commercial<'a>(catalog: &'a [Commercial], key: &str) -> Option<&'a Commercial> {
    let key = key.trim();
    catalog
        .iter()
        .find(|c| c.id == key)
        .or_else(|| {
            let key = key.to_lowercase();
            catalog.iter().find(|c| c.name.to_lowercase() == key)
        })
}

/// Finds an expense type by id, or by name ignoring case.
#[must_use]
pub fn find_expense_type<'a>(catalog: &'a [ExpenseType], key: &str) -> Option<&'a ExpenseType> {
    let key = key.trim();
    catalog
        .iter()
        .find(|t| t.id == key)
        .or_else(|| {
            let key = key.to_lowercase();
            catalog.iter().find(|t| t.name.to_lowercase() == key)
        })
}
