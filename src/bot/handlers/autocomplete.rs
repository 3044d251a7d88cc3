//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions come from the live ledger, so renamed or deleted catalog entries disappear
//! from the lists immediately. Every choice is kept within Discord's 100-character limit;
//! a catalog name too long to be sent back as the value is answered with its id instead,
//! which the commands accept as well.

use crate::{
    bot::{BotData, limits},
    core::history,
    errors::Error,
};
use poise::serenity_prelude as serenity;

/// Discord's limit on autocomplete choices.
const MAX_CHOICES: usize = 25;

/// Picks the catalog entries whose name contains `partial`, sorted by name.
///
/// Each entry is `(name, id)`; the result is `(label, value)` pairs ready to be sent.
fn matching_entries<'a>(
    entries: impl Iterator<Item = (&'a str, &'a str)>,
    partial: &str,
) -> Vec<(String, String)> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<(String, String)> = entries
        .filter(|(name, _)| name.to_lowercase().contains(&partial_lower))
        .map(|(name, id)| {
            let value = if name.chars().count() <= limits::CHOICE_CHARS {
                name
            } else {
                id
            };
            (
                limits::truncate_chars(name, limits::CHOICE_CHARS),
                value.to_string(),
            )
        })
        .take(MAX_CHOICES)
        .collect();
    matching.sort();
    matching
}

fn to_choices(pairs: Vec<(String, String)>) -> Vec<serenity::AutocompleteChoice> {
    pairs
        .into_iter()
        .map(|(label, value)| serenity::AutocompleteChoice::new(label, value))
        .collect()
}

/// Provides autocomplete suggestions for commercial names.
///
/// Matches case-insensitively anywhere in the name and returns up to 25 commercials in
/// alphabetical order.
///
/// # Arguments
/// * `ctx` - The poise context holding the ledger
/// * `partial` - The partial string the user has typed so far
///
/// # Returns
/// Choices labelled with the commercial's name
pub async fn autocomplete_commercial(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let ledger = ctx.data().ledger.lock().await;
    to_choices(matching_entries(
        ledger
            .commercials()
            .iter()
            .map(|c| (c.name.as_str(), c.id.as_str())),
        partial,
    ))
}

/// Provides autocomplete suggestions for expense category names.
///
/// # Arguments
/// * `ctx` - The poise context holding the ledger
/// * `partial` - The partial string the user has typed so far
///
/// # Returns
/// Up to 25 choices labelled with the category name, in alphabetical order
pub async fn autocomplete_category(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let ledger = ctx.data().ledger.lock().await;
    to_choices(matching_entries(
        ledger
            .expense_types()
            .iter()
            .map(|t| (t.name.as_str(), t.id.as_str())),
        partial,
    ))
}

/// Provides autocomplete suggestions for the year filter.
///
/// Only years that have at least one expense are offered.
///
/// # Arguments
/// * `ctx` - The poise context holding the ledger
/// * `partial` - The digits the user has typed so far
///
/// # Returns
/// Matching years, most recent first
pub async fn autocomplete_year(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let ledger = ctx.data().ledger.lock().await;
    history::available_years(ledger.expenses())
        .into_iter()
        .map(|year| year.to_string())
        .filter(|year| year.starts_with(partial.trim()))
        .take(MAX_CHOICES)
        .collect()
}

/// Label shown for an expense in autocomplete lists.
fn expense_label(date: &str, creditor: &str, amount: f64) -> String {
    let label = format!("{date} · {creditor} · {amount:.2}");
    if label.chars().count() <= limits::CHOICE_CHARS {
        return label;
    }
    let fixed = format!("{date} ·  · {amount:.2}").chars().count();
    let creditor = limits::truncate_chars(
        creditor,
        limits::CHOICE_CHARS.saturating_sub(fixed),
    );
    format!("{date} · {creditor} · {amount:.2}")
}

/// Provides autocomplete suggestions for a single expense.
///
/// The user can type part of the date, creditor or amount, or the start of the id.
/// Creditors are shortened so the label keeps its date and amount.
///
/// # Arguments
/// * `ctx` - The poise context holding the ledger
/// * `partial` - The partial string the user has typed so far
///
/// # Returns
/// Up to 25 choices, newest first, whose value is the expense id
pub async fn autocomplete_expense(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<serenity::AutocompleteChoice> {
    let ledger = ctx.data().ledger.lock().await;
    let partial_lower = partial.to_lowercase();

    ledger
        .expenses()
        .iter()
        .filter(|e| {
            format!("{} · {} · {:.2}", e.date, e.creditor, e.amount)
                .to_lowercase()
                .contains(&partial_lower)
                || e.id.starts_with(partial)
        })
        .take(MAX_CHOICES)
        .map(|e| {
            serenity::AutocompleteChoice::new(
                expense_label(&e.date.to_string(), &e.creditor, e.amount),
                e.id.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_entries_filters_and_sorts() {
        let entries = [
            ("Otros gastos", "4"),
            ("Comidas", "2"),
            ("Alojamiento", "3"),
            ("Desplazamientos", "1"),
        ];

        assert_eq!(
            matching_entries(entries.into_iter(), "AM"),
            vec![
                ("Alojamiento".to_string(), "Alojamiento".to_string()),
                ("Desplazamientos".to_string(), "Desplazamientos".to_string()),
            ]
        );
        assert_eq!(matching_entries(entries.into_iter(), "").len(), 4);
        assert!(matching_entries(entries.into_iter(), "peaje").is_empty());
    }

    #[test]
    fn test_long_name_is_shortened_and_answered_by_id() {
        let long = "Gastos de representación ".repeat(6);
        let entries = [(long.as_str(), "t-9")];

        let matched = matching_entries(entries.into_iter(), "gastos");

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].0.chars().count(), limits::CHOICE_CHARS);
        assert_eq!(matched[0].1, "t-9");
    }

    #[test]
    fn test_expense_label_keeps_date_and_amount() {
        assert_eq!(
            expense_label("2024-03-01", "Bar Pepe", 12.5),
            "2024-03-01 · Bar Pepe · 12.50"
        );

        let creditor = "Restaurante ".repeat(20);
        let label = expense_label("2024-03-01", &creditor, 1234.5);

        assert_eq!(label.chars().count(), limits::CHOICE_CHARS);
        assert!(label.starts_with("2024-03-01 · Restaurante"));
        assert!(label.ends_with("… · 1234.50"));
    }
}
