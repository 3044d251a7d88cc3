//! Expense capture workflow.
//!
//! A [`CaptureForm`] follows one receipt from upload to a committed expense:
//!
//! ```text
//! Empty -> ImageSelected -> Extracting -> Prefilled | ExtractFailed -> (submit) -> Empty
//! ```
//!
//! Extraction only ever overwrites the fields it supplied. A failed extraction leaves the
//! form as it was and the user fills it in by hand. While an extraction is running, another
//! image cannot be selected and the form cannot be submitted. Each extraction carries a
//! ticket; a result whose ticket is older than the form's current one (because the form was
//! reset in the meantime) is ignored.

use crate::{
    core::{
        extraction::{ReceiptExtraction, ReceiptExtractor},
        ledger::Ledger,
        models::{Expense, ExpenseType, new_record_id, parse_amount},
        receipt::ReceiptImage,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use std::fmt;

/// Where a capture session stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing uploaded yet
    #[default]
    Empty,
    /// An image is attached but has not been sent for extraction
    ImageSelected,
    /// The image is being read
    Extracting,
    /// Extraction succeeded and filled in what it could
    Prefilled,
    /// Extraction failed; the form must be completed by hand
    ExtractFailed,
}

/// Fields that must be present before an expense can be saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequiredField {
    /// Receipt image
    Image,
    /// Transaction date
    Date,
    /// Merchant
    Creditor,
    /// Amount paid
    Amount,
    /// Salesperson
    Commercial,
    /// Category
    ExpenseType,
}

impl RequiredField {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "receipt image",
            Self::Date => "date",
            Self::Creditor => "creditor",
            Self::Amount => "amount",
            Self::Commercial => "commercial",
            Self::ExpenseType => "expense type",
        }
    }

    /// Comma-separated labels.
    #[must_use]
    pub fn join(fields: &[Self]) -> String {
        fields
            .iter()
            .map(|field| field.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Form fields an extraction can fill in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    /// Transaction date
    Date,
    /// Merchant
    Creditor,
    /// Amount paid
    Amount,
    /// Notes
    Observations,
    /// Category, when the suggestion matched the catalog
    ExpenseType,
}

impl FormField {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Creditor => "creditor",
            Self::Amount => "amount",
            Self::Observations => "observations",
            Self::ExpenseType => "expense type",
        }
    }
}

/// Proof that an extraction was started for a particular state of the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractionTicket(u64);

/// What happened when an extraction result was handed back to the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// These fields were overwritten
    Prefilled {
        /// Fields the extraction supplied, in form order
        filled: Vec<FormField>,
    },
    /// The adapter failed; nothing changed
    Failed {
        /// Adapter error, for the user notice
        message: String,
    },
    /// The form moved on since the extraction started; the result was dropped
    Stale,
}

/// One capture session.
#[derive(Clone, Debug, Default)]
pub struct CaptureForm {
    state: CaptureState,
    image: Option<ReceiptImage>,
    date: Option<NaiveDate>,
    creditor: String,
    amount: String,
    commercial_id: Option<String>,
    type_id: Option<String>,
    observations: String,
    generation: u64,
}

impl CaptureForm {
    /// A blank form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    /// Attached receipt.
    #[must_use]
    pub const fn image(&self) -> Option<&ReceiptImage> {
        self.image.as_ref()
    }

    /// Date field.
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Creditor field.
    #[must_use]
    pub fn creditor(&self) -> &str {
        &self.creditor
    }

    /// Amount field as entered.
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.amount
    }

    /// Selected commercial.
    #[must_use]
    pub fn commercial_id(&self) -> Option<&str> {
        self.commercial_id.as_deref()
    }

    /// Selected expense type.
    #[must_use]
    pub fn type_id(&self) -> Option<&str> {
        self.type_id.as_deref()
    }

    /// Observations field.
    #[must_use]
    pub fn observations(&self) -> &str {
        &self.observations
    }

    /// Attaches a receipt image, replacing any previous one.
    ///
    /// Refused while an extraction is running.
    pub fn select_image(&mut self, image: ReceiptImage) -> Result<()> {
        if self.state == CaptureState::Extracting {
            return Err(Error::ExtractionInProgress);
        }
        self.image = Some(image);
        self.state = CaptureState::ImageSelected;
        Ok(())
    }

    /// Marks the attached image as being read and returns the ticket the result must carry.
    pub fn begin_extraction(&mut self) -> Result<ExtractionTicket> {
        match self.state {
            CaptureState::ImageSelected => {
                self.generation += 1;
                self.state = CaptureState::Extracting;
                Ok(ExtractionTicket(self.generation))
            }
            CaptureState::Extracting => Err(Error::ExtractionInProgress),
            _ => Err(Error::InvalidInput {
                message: "select a receipt image first".to_string(),
            }),
        }
    }

    /// Applies an extraction result.
    ///
    /// On success every field the extraction supplied overwrites the form; the suggested
    /// category is applied only if it matches `catalog`. On failure the form is unchanged.
    pub fn finish_extraction(
        &mut self,
        ticket: ExtractionTicket,
        result: Result<ReceiptExtraction>,
        catalog: &[ExpenseType],
    ) -> ExtractionOutcome {
        if self.state != CaptureState::Extracting || ticket.0 != self.generation {
            tracing::debug!("Ignoring stale extraction result");
            return ExtractionOutcome::Stale;
        }

        match result {
            Ok(extraction) => {
                let filled = self.prefill(&extraction, catalog);
                self.state = CaptureState::Prefilled;
                ExtractionOutcome::Prefilled { filled }
            }
            Err(e) => {
                self.state = CaptureState::ExtractFailed;
                ExtractionOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Runs the whole extraction step against `extractor`.
    pub async fn extract_with(
        &mut self,
        extractor: &dyn ReceiptExtractor,
        catalog: &[ExpenseType],
    ) -> Result<ExtractionOutcome> {
        let ticket = self.begin_extraction()?;
        let Some(image) = self.image.clone() else {
            self.state = CaptureState::Empty;
            return Err(Error::InvalidInput {
                message: "select a receipt image first".to_string(),
            });
        };
        let names = category_names(catalog);
        let result = extractor.extract(&image, &names).await;
        Ok(self.finish_extraction(ticket, result, catalog))
    }

    fn prefill(&mut self, extraction: &ReceiptExtraction, catalog: &[ExpenseType]) -> Vec<FormField> {
        let mut filled = Vec::new();
        if let Some(date) = extraction.date {
            self.date = Some(date);
            filled.push(FormField::Date);
        }
        if let Some(creditor) = &extraction.creditor {
            self.creditor.clone_from(creditor);
            filled.push(FormField::Creditor);
        }
        if let Some(amount) = extraction.amount {
            self.amount = amount.to_string();
            filled.push(FormField::Amount);
        }
        if let Some(observations) = &extraction.observations {
            self.observations.clone_from(observations);
            filled.push(FormField::Observations);
        }
        if let Some(expense_type) = extraction.matched_type(catalog) {
            self.type_id = Some(expense_type.id.clone());
            filled.push(FormField::ExpenseType);
        }
        filled
    }

    /// Sets the date.
    pub const fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
    }

    /// Sets the creditor.
    pub fn set_creditor(&mut self, creditor: impl Into<String>) {
        self.creditor = creditor.into();
    }

    /// Sets the amount, rejecting anything that is not a non-negative number.
    pub fn set_amount(&mut self, amount: &str) -> Result<()> {
        parse_amount(amount)?;
        self.amount = amount.trim().to_string();
        Ok(())
    }

    /// Selects the commercial.
    pub fn set_commercial(&mut self, commercial_id: impl Into<String>) {
        self.commercial_id = Some(commercial_id.into());
    }

    /// Selects the expense type.
    pub fn set_expense_type(&mut self, type_id: impl Into<String>) {
        self.type_id = Some(type_id.into());
    }

    /// Sets the observations.
    pub fn set_observations(&mut self, observations: impl Into<String>) {
        self.observations = observations.into();
    }

    /// Required fields that are still missing, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        let mut missing = Vec::new();
        if self.image.is_none() {
            missing.push(RequiredField::Image);
        }
        if self.date.is_none() {
            missing.push(RequiredField::Date);
        }
        if self.creditor.trim().is_empty() {
            missing.push(RequiredField::Creditor);
        }
        if self.amount.trim().is_empty() {
            missing.push(RequiredField::Amount);
        }
        if self.commercial_id.as_deref().is_none_or(str::is_empty) {
            missing.push(RequiredField::Commercial);
        }
        if self.type_id.as_deref().is_none_or(str::is_empty) {
            missing.push(RequiredField::ExpenseType);
        }
        missing
    }

    /// Validates the form and builds the expense it describes, with a fresh id.
    pub fn to_expense(&self) -> Result<Expense> {
        let missing = self.missing_fields();
        let (Some(image), Some(date), Some(commercial_id), Some(type_id)) = (
            self.image.as_ref(),
            self.date,
            self.commercial_id.as_ref(),
            self.type_id.as_ref(),
        ) else {
            return Err(Error::MissingFields { fields: missing });
        };
        if !missing.is_empty() {
            return Err(Error::MissingFields { fields: missing });
        }

        Ok(Expense {
            id: new_record_id(),
            date,
            creditor: self.creditor.trim().to_string(),
            amount: parse_amount(&self.amount)?,
            commercial_id: commercial_id.clone(),
            type_id: type_id.clone(),
            observations: self.observations.trim().to_string(),
            receipt_image: image.clone(),
        })
    }

    /// Validates the form, adds the expense to the ledger and resets the form.
    ///
    /// On any error nothing is added and the form is left as it was.
    pub async fn submit(&mut self, ledger: &mut Ledger) -> Result<Expense> {
        if self.state == CaptureState::Extracting {
            return Err(Error::ExtractionInProgress);
        }
        let expense = self.to_expense()?;
        ledger.add(expense.clone()).await?;
        tracing::info!(
            "Expense '{}' saved: {} {:.2} at {}",
            expense.id,
            expense.date,
            expense.amount,
            expense.creditor
        );
        self.reset();
        Ok(expense)
    }

    /// Clears the form. A running extraction's result will be ignored.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }
}

/// Category names in catalog order, as offered to the extraction model.
#[must_use]
pub fn category_names(catalog: &[ExpenseType]) -> Vec<String> {
    catalog.iter().map(|t| t.name.clone()).collect()
}
