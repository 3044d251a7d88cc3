//! Receipt extraction: reading a receipt image into suggested form values.
//!
//! The model's answer is a best-effort guess. Anything it could not determine, or returned
//! in an unusable shape, is left out rather than filled with an empty value, so the capture
//! form only overwrites fields the model actually supplied.

use crate::{
    core::{
        models::{DATE_FORMAT, ExpenseType},
        receipt::ReceiptImage,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

/// Something that can read a receipt image.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// Reads `image` and suggests field values; `categories` are the names the suggested
    /// category should be chosen from.
    ///
    /// Any transport, parsing or model problem is reported as [`Error::Extraction`].
    async fn extract(
        &self,
        image: &ReceiptImage,
        categories: &[String],
    ) -> Result<ReceiptExtraction>;
}

/// Fields read from a receipt. `None` means the model did not determine it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReceiptExtraction {
    /// Transaction date
    pub date: Option<NaiveDate>,
    /// Merchant name
    pub creditor: Option<String>,
    /// Total paid
    pub amount: Option<f64>,
    /// Short summary of the purchase
    pub observations: Option<String>,
    /// Category name the model picked
    pub suggested_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtraction {
    date: Option<String>,
    creditor: Option<String>,
    amount: Option<Value>,
    observations: Option<String>,
    suggested_type: Option<String>,
}

impl ReceiptExtraction {
    /// Parses the model's JSON answer.
    ///
    /// Malformed JSON is an [`Error::Extraction`]; individual fields that are blank or of
    /// the wrong shape are dropped.
    pub fn from_model_json(text: &str) -> Result<Self> {
        let raw: RawExtraction =
            serde_json::from_str(text.trim()).map_err(|e| Error::Extraction {
                message: format!("model answer is not the expected JSON: {e}"),
            })?;

        let date = non_blank(raw.date).and_then(|value| {
            let parsed = crate::core::models::parse_expense_date(&value).ok();
            if parsed.is_none() {
                tracing::debug!("Dropping extracted date '{value}', expected {DATE_FORMAT}");
            }
            parsed
        });

        let amount = match raw.amount {
            Some(Value::Number(number)) => number
                .as_f64()
                .filter(|amount| amount.is_finite() && *amount >= 0.0),
            Some(other) => {
                tracing::debug!("Dropping extracted amount {other}, expected a number");
                None
            }
            None => None,
        };

        Ok(Self {
            date,
            creditor: non_blank(raw.creditor),
            amount,
            observations: non_blank(raw.observations),
            suggested_type: non_blank(raw.suggested_type),
        })
    }

    /// The catalog entry whose name matches the suggestion, ignoring case.
    ///
    /// A suggestion with no match is discarded; no category is ever created from it.
    #[must_use]
    pub fn matched_type<'a>(&self, catalog: &'a [ExpenseType]) -> Option<&'a ExpenseType> {
        let suggested = self.suggested_type.as_deref()?.trim().to_lowercase();
        catalog
            .iter()
            .find(|expense_type| expense_type.name.trim().to_lowercase() == suggested)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Instruction sent alongside the receipt image.
#[must_use]
pub fn extraction_prompt(categories: &[String], fallback_category: &str) -> String {
    format!(
        "Analyze this receipt image. Extract the following information in JSON format:\n\
         - date: The date of the transaction (format YYYY-MM-DD).\n\
         - creditor: The name of the merchant or business.\n\
         - amount: The total amount paid (number).\n\
         - observations: A brief summary of items purchased.\n\
         - suggestedType: Based on the content, suggest one of these categories: {}. \
         If unsure, use \"{fallback_category}\".\n\
         Leave out any field you cannot determine.",
        categories.join(", ")
    )
}

/// JSON schema the model's answer must follow. Every field is optional and `amount` is
/// numeric.
#[must_use]
pub fn extraction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "date": { "type": "STRING" },
            "creditor": { "type": "STRING" },
            "amount": { "type": "NUMBER" },
            "observations": { "type": "STRING" },
            "suggestedType": { "type": "STRING" }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::test_expense_types;

    #[test]
    fn test_full_answer() {
        let extraction = ReceiptExtraction::from_model_json(
            r#"{"date":"2024-03-01","creditor":"Bar Pepe","amount":12.5,
                "observations":"Menu del dia","suggestedType":"Comidas"}"#,
        )
        .unwrap();

        assert_eq!(extraction.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(extraction.creditor.as_deref(), Some("Bar Pepe"));
        assert_eq!(extraction.amount, Some(12.5));
        assert_eq!(extraction.observations.as_deref(), Some("Menu del dia"));
        assert_eq!(extraction.suggested_type.as_deref(), Some("Comidas"));
    }

    #[test]
    fn test_partial_answer_leaves_fields_absent() {
        let extraction =
            ReceiptExtraction::from_model_json(r#"{"date":"2024-03-01","amount":12.5}"#).unwrap();

        assert_eq!(extraction.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(extraction.amount, Some(12.5));
        assert!(extraction.creditor.is_none());
        assert!(extraction.observations.is_none());
        assert!(extraction.suggested_type.is_none());
    }

    #[test]
    fn test_blank_and_malformed_fields_are_dropped() {
        let extraction = ReceiptExtraction::from_model_json(
            r#"{"date":"03/01/2024","creditor":"  ","amount":"12.50","observations":""}"#,
        )
        .unwrap();

        assert_eq!(extraction, ReceiptExtraction::default());

        let negative = ReceiptExtraction::from_model_json(r#"{"amount":-4}"#).unwrap();
        assert!(negative.amount.is_none());
    }

    #[test]
    fn test_zero_amount_is_kept() {
        let extraction = ReceiptExtraction::from_model_json(r#"{"amount":0}"#).unwrap();
        assert_eq!(extraction.amount, Some(0.0));
    }

    #[test]
    fn test_invalid_json_is_extraction_error() {
        let result = ReceiptExtraction::from_model_json("Sorry, I can't read that.");
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_matched_type_ignores_case() {
        let catalog = test_expense_types();
        let extraction = ReceiptExtraction {
            suggested_type: Some("comidas".to_string()),
            ..ReceiptExtraction::default()
        };

        assert_eq!(extraction.matched_type(&catalog).unwrap().id, "2");
    }

    #[test]
    fn test_unknown_suggestion_is_discarded() {
        let catalog = test_expense_types();
        let extraction = ReceiptExtraction {
            suggested_type: Some("Gasolina".to_string()),
            ..ReceiptExtraction::default()
        };

        assert!(extraction.matched_type(&catalog).is_none());
        assert!(ReceiptExtraction::default().matched_type(&catalog).is_none());
    }

    #[test]
    fn test_prompt_lists_categories() {
        let prompt = extraction_prompt(
            &["Comidas".to_string(), "Alojamiento".to_string()],
            "Otros gastos",
        );
        assert!(prompt.contains("Comidas, Alojamiento"));
        assert!(prompt.contains("\"Otros gastos\""));
    }

    #[test]
    fn test_schema_types_amount_as_number() {
        let schema = extraction_schema();
        assert_eq!(schema["properties"]["amount"]["type"], "NUMBER");
        assert_eq!(schema["properties"]["suggestedType"]["type"], "STRING");
    }
}
