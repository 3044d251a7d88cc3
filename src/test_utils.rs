//! Shared test utilities for `ExpenseBuddy`.
//!
//! In-memory databases, a ledger seeded with known catalogs, sample records and fake
//! adapters that stand in for the Gemini client.

use crate::{
    core::{
        editing::ReceiptEditor,
        extraction::{ReceiptExtraction, ReceiptExtractor},
        ledger::Ledger,
        models::{Commercial, Expense, ExpenseType, new_record_id, parse_expense_date},
        receipt::ReceiptImage,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Opens a ledger over a fresh database with [`test_commercials`] and
/// [`test_expense_types`] as defaults.
pub async fn setup_ledger() -> Result<Ledger> {
    let db = setup_test_db().await?;
    Ok(Ledger::open(db, test_commercials(), test_expense_types()).await)
}

/// Commercials with ids `1` and `2`.
#[must_use]
pub fn test_commercials() -> Vec<Commercial> {
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

/// Expense types with ids `1` to `4`.
#[must_use]
pub fn test_expense_types() -> Vec<ExpenseType> {
    ["Desplazamientos", "Comidas", "Alojamiento", "Otros gastos"]
        .iter()
        .enumerate()
        .map(|(i, name)| ExpenseType {
            id: (i + 1).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

/// A tiny JPEG-tagged receipt.
#[must_use]
pub fn sample_image() -> ReceiptImage {
    ReceiptImage::from_base64("image/jpeg", "/9j/4AAQSkZJRg==")
}

/// An expense with a fresh id on `date` (`YYYY-MM-DD`).
///
/// # Panics
/// If `date` is not a valid `YYYY-MM-DD` date.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn sample_expense(date: &str, commercial_id: &str, type_id: &str) -> Expense {
    Expense {
        id: new_record_id(),
        date: parse_expense_date(date).unwrap(),
        creditor: "Bar Pepe".to_string(),
        amount: 12.5,
        commercial_id: commercial_id.to_string(),
        type_id: type_id.to_string(),
        observations: "Menu del dia".to_string(),
        receipt_image: sample_image(),
    }
}

/// Extractor answering every call the same way and recording the categories it was given.
pub struct FakeExtractor {
    answer: std::result::Result<ReceiptExtraction, String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeExtractor {
    /// Always returns `extraction`.
    #[must_use]
    pub const fn answering(extraction: ReceiptExtraction) -> Self {
        Self {
            answer: Ok(extraction),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with an extraction error carrying `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Category lists received, one per call.
    #[allow(clippy::unwrap_used)]
    pub fn seen_categories(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptExtractor for FakeExtractor {
    #[allow(clippy::unwrap_used)]
    async fn extract(
        &self,
        _image: &ReceiptImage,
        categories: &[String],
    ) -> Result<ReceiptExtraction> {
        self.calls.lock().unwrap().push(categories.to_vec());
        self.answer.clone().map_err(|message| Error::Extraction { message })
    }
}

/// Editor answering every call the same way and recording the instructions it was given.
pub struct FakeEditor {
    answer: Option<ReceiptImage>,
    instructions: Mutex<Vec<String>>,
}

impl FakeEditor {
    /// Always returns `image`.
    #[must_use]
    pub const fn succeeding(image: ReceiptImage) -> Self {
        Self {
            answer: Some(image),
            instructions: Mutex::new(Vec::new()),
        }
    }

    /// Always fails as if the model returned no image.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            answer: None,
            instructions: Mutex::new(Vec::new()),
        }
    }

    /// Instructions received, in call order.
    #[allow(clippy::unwrap_used)]
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptEditor for FakeEditor {
    #[allow(clippy::unwrap_used)]
    async fn edit(&self, _image: &ReceiptImage, instruction: &str) -> Result<ReceiptImage> {
        self.instructions
            .lock()
            .unwrap()
            .push(instruction.to_string());
        self.answer.clone().ok_or_else(|| Error::Edit {
            message: "no image generated".to_string(),
        })
    }
}
