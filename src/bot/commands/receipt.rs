//! Receipt capture commands - `/receipt upload|set|show|submit|cancel`.
//!
//! Each Discord user has one capture form. Uploading a receipt reads it with the
//! extraction adapter and prefills the form; the user completes or corrects it with
//! `/receipt set` and saves it with `/receipt submit`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            handlers::autocomplete,
            limits::{self, truncate_chars},
        },
        core::{
            capture::{self, CaptureForm, ExtractionOutcome},
            history::UNKNOWN_LABEL,
            ledger::Ledger,
            models::{Commercial, ExpenseType, parse_expense_date},
            receipt::{MAX_RECEIPT_BYTES, ReceiptImage},
            reference,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Renders the form as message text, one field per line.
    fn describe_form(form: &CaptureForm, ledger: &Ledger) -> Result<String> {
        let mut text = String::new();
        let or_dash = |value: &str| {
            if value.trim().is_empty() {
                "—".to_string()
            } else {
                truncate_chars(value, limits::INLINE_VALUE_CHARS)
            }
        };

        writeln!(&mut text, "**State:** {:?}", form.state())?;
        writeln!(
            &mut text,
            "**Receipt:** {}",
            if form.image().is_some() { "attached" } else { "—" }
        )?;
        writeln!(
            &mut text,
            "**Date:** {}",
            form.date().map_or_else(|| "—".to_string(), |d| d.to_string())
        )?;
        writeln!(&mut text, "**Creditor:** {}", or_dash(form.creditor()))?;
        writeln!(&mut text, "**Amount:** {}", or_dash(form.amount()))?;
        writeln!(
            &mut text,
            "**Commercial:** {}",
            or_dash(form.commercial_id().map_or("", |id| {
                ledger
                    .get::<Commercial>(id)
                    .map_or(UNKNOWN_LABEL, |c| c.name.as_str())
            }))
        )?;
        writeln!(
            &mut text,
            "**Category:** {}",
            or_dash(form.type_id().map_or("", |id| {
                ledger
                    .get::<ExpenseType>(id)
                    .map_or(UNKNOWN_LABEL, |t| t.name.as_str())
            }))
        )?;
        writeln!(&mut text, "**Observations:** {}", or_dash(form.observations()))?;

        let missing = form.missing_fields();
        if !missing.is_empty() {
            writeln!(
                &mut text,
                "\nStill needed: {}",
                capture::RequiredField::join(&missing)
            )?;
        }
        Ok(text)
    }

    /// Renders the invoking user's form, or an empty one if they have none.
    async fn current_summary(ctx: poise::Context<'_, BotData, Error>) -> Result<String> {
        let user = ctx.author().id.get();
        let captures = ctx.data().captures.lock().await;
        let ledger = ctx.data().ledger.lock().await;
        let form = captures.get(&user).cloned().unwrap_or_default();
        describe_form(&form, &ledger)
    }

    /// Parent command for the receipt capture workflow.
    #[poise::command(
        slash_command,
        subcommands(
            "receipt_upload",
            "receipt_set",
            "receipt_show",
            "receipt_submit",
            "receipt_cancel"
        )
    )]
    pub async fn receipt(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Receipt capture command. Available subcommands:\n\
            `/receipt upload` - Attach a receipt image and read it\n\
            `/receipt set` - Fill in or correct fields\n\
            `/receipt show` - Show the current form\n\
            `/receipt submit` - Save the expense\n\
            `/receipt cancel` - Discard the form";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Attaches a receipt image and prefills the form from it.
    ///
    /// Only the fields the receipt actually shows are overwritten. If reading fails the
    /// form is left as it was and can be completed by hand.
    #[poise::command(slash_command, rename = "upload")]
    pub async fn receipt_upload(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Photo or scan of the receipt"] image: serenity::Attachment,
    ) -> Result<()> {
        if image.size as usize > MAX_RECEIPT_BYTES {
            ctx.say(format!(
                "❌ That file is too large. Receipts can be at most {} MiB.",
                MAX_RECEIPT_BYTES / (1024 * 1024)
            ))
            .await?;
            return Ok(());
        }

        ctx.defer().await?;

        let bytes = image.download().await?;
        let receipt = match ReceiptImage::from_bytes(image.content_type.as_deref(), &bytes) {
            Ok(receipt) => receipt,
            Err(e) => {
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        let user = ctx.author().id.get();
        let started = {
            let mut captures = ctx.data().captures.lock().await;
            let form = captures.entry(user).or_default();
            form.select_image(receipt.clone())
                .and_then(|()| form.begin_extraction())
        };
        let ticket = match started {
            Ok(ticket) => ticket,
            Err(e @ Error::ExtractionInProgress) => {
                ctx.say(format!("⏳ {e}. Wait for it to finish before uploading another."))
                    .await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let catalog = ctx.data().ledger.lock().await.expense_types().to_vec();
        let result = ctx
            .data()
            .extractor
            .extract(&receipt, &capture::category_names(&catalog))
            .await;

        let outcome = {
            let mut captures = ctx.data().captures.lock().await;
            captures.get_mut(&user).map_or(ExtractionOutcome::Stale, |form| {
                form.finish_extraction(ticket, result, &catalog)
            })
        };

        let notice = match outcome {
            ExtractionOutcome::Prefilled { filled } if filled.is_empty() => {
                "🧾 Receipt attached, but nothing could be read from it. Fill in the form with `/receipt set`.".to_string()
            }
            ExtractionOutcome::Prefilled { filled } => format!(
                "🧾 Receipt read. Filled in: {}.",
                filled
                    .iter()
                    .map(|field| field.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ExtractionOutcome::Failed { message } => format!(
                "⚠️ The receipt could not be read ({message}). Fill in the form by hand with `/receipt set`."
            ),
            ExtractionOutcome::Stale => {
                ctx.say("The form was cancelled while the receipt was being read; the result was discarded.")
                    .await?;
                return Ok(());
            }
        };

        let summary = current_summary(ctx).await?;
        ctx.say(truncate_chars(
            &format!("{notice}\n\n{summary}"),
            limits::MESSAGE_CHARS,
        ))
        .await?;
        Ok(())
    }

    /// Fills in or corrects fields of the capture form.
    ///
    /// Only the options given are changed. The date must be `YYYY-MM-DD` and the amount a
    /// non-negative number; an invalid value is reported and nothing is changed. The
    /// commercial and category are picked by name or id.
    #[poise::command(slash_command, rename = "set")]
    pub async fn receipt_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Transaction date (YYYY-MM-DD)"] date: Option<String>,
        #[description = "Merchant or supplier"] creditor: Option<String>,
        #[description = "Amount paid (e.g. 12.50)"] amount: Option<String>,
        #[description = "Salesperson who incurred the expense"]
        #[autocomplete = "autocomplete::autocomplete_commercial"]
        commercial: Option<String>,
        #[description = "Expense category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "Notes"] observations: Option<String>,
    ) -> Result<()> {
        let date = match date.as_deref().map(parse_expense_date).transpose() {
            Ok(date) => date,
            Err(e) => {
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        let (commercial_id, type_id) = {
            let ledger = ctx.data().ledger.lock().await;
            let commercial_id = match commercial.as_deref() {
                Some(key) => {
                    let Some(found) = reference::find_commercial(ledger.commercials(), key) else {
                        ctx.say(format!(
                            "❌ No commercial named '{}'.",
                            truncate_chars(key, limits::INLINE_VALUE_CHARS)
                        ))
                        .await?;
                        return Ok(());
                    };
                    Some(found.id.clone())
                }
                None => None,
            };
            let type_id = match category.as_deref() {
                Some(key) => {
                    let Some(found) = reference::find_expense_type(ledger.expense_types(), key)
                    else {
                        ctx.say(format!(
                            "❌ No category named '{}'.",
                            truncate_chars(key, limits::INLINE_VALUE_CHARS)
                        ))
                        .await?;
                        return Ok(());
                    };
                    Some(found.id.clone())
                }
                None => None,
            };
            (commercial_id, type_id)
        };

        {
            let user = ctx.author().id.get();
            let mut captures = ctx.data().captures.lock().await;
            let form = captures.entry(user).or_default();

            if let Some(amount) = amount.as_deref() {
                if let Err(e) = form.set_amount(amount) {
                    ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                        .await?;
                    return Ok(());
                }
            }
            if let Some(date) = date {
                form.set_date(date);
            }
            if let Some(creditor) = creditor {
                form.set_creditor(creditor.trim());
            }
            if let Some(id) = commercial_id {
                form.set_commercial(id);
            }
            if let Some(id) = type_id {
                form.set_expense_type(id);
            }
            if let Some(observations) = observations {
                form.set_observations(observations.trim());
            }
        }

        let summary = current_summary(ctx).await?;
        ctx.say(truncate_chars(
            &format!("✏️ Form updated.\n\n{summary}"),
            limits::MESSAGE_CHARS,
        ))
        .await?;
        Ok(())
    }

    /// Shows the current capture form with its receipt.
    ///
    /// Lists every field, marks the ones still needed for submission and attaches the
    /// selected receipt image, if any.
    #[poise::command(slash_command, rename = "show")]
    pub async fn receipt_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = ctx.author().id.get();
        let image = {
            let captures = ctx.data().captures.lock().await;
            captures.get(&user).and_then(|form| form.image().cloned())
        };
        let summary = current_summary(ctx).await?;

        let mut reply = poise::CreateReply::default()
            .content(truncate_chars(&summary, limits::MESSAGE_CHARS));
        if let Some(image) = image {
            reply = reply.attachment(serenity::CreateAttachment::bytes(
                image.decode()?,
                format!("receipt.{}", image.file_extension()),
            ));
        }
        ctx.send(reply).await?;
        Ok(())
    }

    /// Validates the form and saves it as a new expense.
    ///
    /// All six required fields must be filled in and no extraction may be running. On
    /// success the expense is stored at the top of the history and the form is cleared;
    /// otherwise the form is kept as it is and the missing fields are listed.
    #[poise::command(slash_command, rename = "submit")]
    pub async fn receipt_submit(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = ctx.author().id.get();
        let mut captures = ctx.data().captures.lock().await;
        let form = captures.entry(user).or_default();
        let mut ledger = ctx.data().ledger.lock().await;
        let result = form.submit(&mut ledger).await;
        drop(ledger);
        drop(captures);

        match result {
            Ok(expense) => {
                ctx.say(format!(
                    "✅ Expense saved: {} · {} · {:.2}. See it with `/expenses list`.",
                    expense.date,
                    truncate_chars(&expense.creditor, limits::INLINE_VALUE_CHARS),
                    expense.amount
                ))
                .await?;
            }
            Err(
                e @ (Error::MissingFields { .. }
                | Error::ExtractionInProgress
                | Error::InvalidAmount { .. }),
            ) => {
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Discards the capture form.
    ///
    /// A receipt still being read when the form is cleared is ignored once its result
    /// arrives.
    #[poise::command(slash_command, rename = "cancel")]
    pub async fn receipt_cancel(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let user = ctx.author().id.get();
        {
            let mut captures = ctx.data().captures.lock().await;
            if let Some(form) = captures.get_mut(&user) {
                form.reset();
            }
        }
        ctx.say("🗑️ Capture form cleared.").await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::test_utils::setup_ledger;

        #[tokio::test]
        async fn test_long_form_values_fit_in_one_message() -> Result<()> {
            let ledger = setup_ledger().await?;
            let mut form = CaptureForm::default();
            form.set_creditor("Bar ".repeat(600));
            form.set_observations("x".repeat(6000));
            form.set_commercial("1");

            let text = describe_form(&form, &ledger)?;

            assert!(text.chars().count() < limits::MESSAGE_CHARS);
            assert!(text.contains("**Commercial:** Juan Pérez"));
            assert!(text.contains("Still needed:"));
            Ok(())
        }
    }
}

// Re-export all commands
pub use inner::*;
