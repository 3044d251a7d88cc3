//! Application settings loading from config.toml
//!
//! The settings file names the Gemini models used for receipt extraction and editing and
//! lists the default catalogs of commercials and expense types. The catalogs seed the
//! ledger whenever the stored collection is missing or unreadable. Everything has a
//! built-in default, so the file itself is optional.

use crate::core::models::{Commercial, ExpenseType};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Gemini endpoint and model selection
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Commercials used when the stored catalog is absent
    #[serde(default = "default_commercials")]
    pub commercials: Vec<Commercial>,
    /// Expense types used when the stored catalog is absent
    #[serde(default = "default_expense_types")]
    pub expense_types: Vec<ExpenseType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            commercials: default_commercials(),
            expense_types: default_expense_types(),
        }
    }
}

/// Settings for the Gemini REST API
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Model that reads receipts into structured fields
    pub extraction_model: String,
    /// Model that edits receipt images
    pub edit_model: String,
    /// Category the extraction model is told to pick when unsure
    pub fallback_category: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            extraction_model: "gemini-3-flash-preview".to_string(),
            edit_model: "gemini-2.5-flash-image".to_string(),
            fallback_category: "Otros gastos".to_string(),
            request_timeout_secs: 60,
        }
    }
}

fn default_commercials() -> Vec<Commercial> {
    vec![
        Commercial {
            id: "1".to_string(),
            name: "Juan Pérez".to_string(),
            email: "juan@empresa.com".to_string(),
            phone: "555-0101".to_string(),
        },
        Commercial {
            id: "2".to_string(),
            name: "María García".to_string(),
            email: "maria@empresa.com".to_string(),
            phone: "555-0102".to_string(),
        },
    ]
}

fn default_expense_types() -> Vec<ExpenseType> {
    [
        ("1", "Desplazamientos"),
        ("2", "Comidas"),
        ("3", "Alojamiento"),
        ("4", "Otros gastos"),
    ]
    .into_iter()
    .map(|(id, name)| ExpenseType {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `EXPENSE_BUDDY_CONFIG`, or ./config.toml when unset.
pub fn load_default_config() -> Result<Config> {
    let path =
        std::env::var("EXPENSE_BUDDY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

/// Reads the Gemini credential from `GEMINI_API_KEY`, falling back to `API_KEY`.
pub fn gemini_api_key() -> Result<String> {
    std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("API_KEY"))
        .map_err(Error::EnvVar)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [gemini]
            extraction_model = "gemini-test"
            request_timeout_secs = 5

            [[commercials]]
            id = "c1"
            name = "Ana"
            email = "ana@example.com"
            phone = "600"

            [[expense_types]]
            id = "t1"
            name = "Peajes"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gemini.extraction_model, "gemini-test");
        assert_eq!(config.gemini.edit_model, "gemini-2.5-flash-image");
        assert_eq!(config.gemini.request_timeout_secs, 5);
        assert_eq!(config.commercials.len(), 1);
        assert_eq!(config.commercials[0].name, "Ana");
        assert_eq!(config.expense_types[0].name, "Peajes");
    }

    #[test]
    fn test_empty_config_uses_builtin_catalogs() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.commercials.len(), 2);
        assert_eq!(config.expense_types.len(), 4);
        assert_eq!(config.expense_types[3].name, "Otros gastos");
        assert_eq!(config.gemini.fallback_category, "Otros gastos");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
