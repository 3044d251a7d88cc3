//! Expense history commands - `/expenses list|export|show|edit_image|delete`.
//!
//! Listing and export share the same four filters. Edits to a receipt image are only
//! written once the edit adapter has returned a new image.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            handlers::{autocomplete, confirm},
            limits::{self, truncate_chars},
        },
        core::{
            editing,
            history::{self, ExpenseFilter},
            ledger::{Decision, Ledger},
            models::Expense,
            reference,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Rows shown by `/expenses list` before pointing at the export.
    const LIST_LIMIT: usize = 20;

    /// Longest creditor or catalog name shown in a list row.
    const LIST_VALUE_CHARS: usize = 40;

    /// Resolves the command's filter options into an [`ExpenseFilter`].
    fn build_filter(
        ledger: &Ledger,
        commercial: Option<&str>,
        category: Option<&str>,
        year: Option<&str>,
        month: Option<&str>,
    ) -> Result<ExpenseFilter> {
        let commercial_id = commercial
            .map(|key| {
                reference::find_commercial(ledger.commercials(), key)
                    .map(|c| c.id.clone())
                    .ok_or_else(|| Error::InvalidInput {
                        message: format!("no commercial named '{key}'"),
                    })
            })
            .transpose()?;
        let type_id = category
            .map(|key| {
                reference::find_expense_type(ledger.expense_types(), key)
                    .map(|t| t.id.clone())
                    .ok_or_else(|| Error::InvalidInput {
                        message: format!("no category named '{key}'"),
                    })
            })
            .transpose()?;

        Ok(ExpenseFilter {
            commercial_id,
            type_id,
            year: history::parse_year(year.unwrap_or_default())?,
            month: history::parse_month(month.unwrap_or_default())?,
        })
    }

    /// The stored receipt as an attachment, with the name an embed can reference.
    fn receipt_attachment(expense: &Expense) -> Result<(serenity::CreateAttachment, String)> {
        let file_name = format!("receipt.{}", expense.receipt_image.file_extension());
        let attachment =
            serenity::CreateAttachment::bytes(expense.receipt_image.decode()?, file_name.clone());
        Ok((attachment, file_name))
    }

    fn expense_not_found(id: &str) -> Error {
        Error::RecordNotFound {
            kind: "Expense",
            id: id.to_string(),
        }
    }

    /// Parent command for the expense history.
    ///
    /// Groups the subcommands that list, export, inspect, edit and delete saved expenses.
    #[poise::command(
        slash_command,
        subcommands(
            "expenses_list",
            "expenses_export",
            "expenses_show",
            "expenses_edit_image",
            "expenses_delete"
        )
    )]
    pub async fn expenses(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Expense history command. Available subcommands:\n\
            `/expenses list` - List expenses, optionally filtered\n\
            `/expenses export` - Download the filtered expenses as CSV\n\
            `/expenses show` - Show one expense and its receipt\n\
            `/expenses edit_image` - Edit a receipt image with AI\n\
            `/expenses delete` - Delete an expense";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Lists expenses matching every given filter, newest first.
    ///
    /// Filters combine with AND; an omitted filter does not constrain. Shows the total of
    /// all matches and the first rows, pointing at `/expenses export` for the rest.
    #[poise::command(slash_command, rename = "list")]
    pub async fn expenses_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only this salesperson"]
        #[autocomplete = "autocomplete::autocomplete_commercial"]
        commercial: Option<String>,
        #[description = "Only this category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "Only this year (YYYY)"]
        #[autocomplete = "autocomplete::autocomplete_year"]
        year: Option<String>,
        #[description = "Only this month (MM)"] month: Option<String>,
    ) -> Result<()> {
        let response = {
            let ledger = ctx.data().ledger.lock().await;
            let filter = build_filter(
                &ledger,
                commercial.as_deref(),
                category.as_deref(),
                year.as_deref(),
                month.as_deref(),
            )?;
            let filtered = history::filter_expenses(ledger.expenses(), &filter);

            if filtered.is_empty() {
                "No expenses match those filters.".to_string()
            } else {
                let rows =
                    history::resolve_rows(&filtered, ledger.commercials(), ledger.expense_types());
                let mut response = String::new();
                writeln!(
                    &mut response,
                    "**{} expense(s)** · total **{:.2}**\n",
                    rows.len(),
                    history::total_amount(&filtered)
                )?;
                for row in rows.iter().take(LIST_LIMIT) {
                    writeln!(
                        &mut response,
                        "• {} · {} · {} · {} · **{:.2}**",
                        row.expense.date,
                        truncate_chars(&row.expense.creditor, LIST_VALUE_CHARS),
                        truncate_chars(row.commercial, LIST_VALUE_CHARS),
                        truncate_chars(row.expense_type, LIST_VALUE_CHARS),
                        row.expense.amount
                    )?;
                }
                if rows.len() > LIST_LIMIT {
                    writeln!(
                        &mut response,
                        "\nShowing the first {LIST_LIMIT}. Use `/expenses export` for the full list."
                    )?;
                }
                response
            }
        };

        ctx.say(truncate_chars(&response, limits::MESSAGE_CHARS))
            .await?;
        Ok(())
    }

    /// Exports the expenses matching every given filter as `gastos.csv`.
    ///
    /// Takes the same filters as `/expenses list`. Deleted commercials and categories are
    /// written as `Desconocido`.
    #[poise::command(slash_command, rename = "export")]
    pub async fn expenses_export(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only this salesperson"]
        #[autocomplete = "autocomplete::autocomplete_commercial"]
        commercial: Option<String>,
        #[description = "Only this category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: Option<String>,
        #[description = "Only this year (YYYY)"]
        #[autocomplete = "autocomplete::autocomplete_year"]
        year: Option<String>,
        #[description = "Only this month (MM)"] month: Option<String>,
    ) -> Result<()> {
        let (count, csv) = {
            let ledger = ctx.data().ledger.lock().await;
            let filter = build_filter(
                &ledger,
                commercial.as_deref(),
                category.as_deref(),
                year.as_deref(),
                month.as_deref(),
            )?;
            let filtered = history::filter_expenses(ledger.expenses(), &filter);
            let rows =
                history::resolve_rows(&filtered, ledger.commercials(), ledger.expense_types());
            (rows.len(), history::export_csv(&rows)?)
        };

        tracing::info!("Exporting {count} expenses");
        ctx.send(
            poise::CreateReply::default()
                .content(format!("📄 {count} expense(s) exported."))
                .attachment(serenity::CreateAttachment::bytes(
                    csv,
                    history::EXPORT_FILE_NAME,
                )),
        )
        .await?;
        Ok(())
    }

    /// Shows one expense with its full-size receipt.
    ///
    /// The expense is picked through autocomplete by date, creditor or amount.
    #[poise::command(slash_command, rename = "show")]
    pub async fn expenses_show(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Expense to show"]
        #[autocomplete = "autocomplete::autocomplete_expense"]
        expense: String,
    ) -> Result<()> {
        let (embed, attachment) = {
            let ledger = ctx.data().ledger.lock().await;
            let record: &Expense = ledger.get(&expense).ok_or_else(|| expense_not_found(&expense))?;
            let rows = history::resolve_rows(&[record], ledger.commercials(), ledger.expense_types());
            let row = rows.first().ok_or_else(|| expense_not_found(&expense))?;
            let (attachment, file_name) = receipt_attachment(record)?;

            let embed = serenity::CreateEmbed::default()
                .title(truncate_chars(
                    &format!("{} · {}", record.date, record.creditor),
                    limits::EMBED_TITLE_CHARS,
                ))
                .color(0x0058_65F2)
                .field("Amount", format!("{:.2}", record.amount), true)
                .field(
                    "Commercial",
                    truncate_chars(row.commercial, limits::EMBED_FIELD_VALUE_CHARS),
                    true,
                )
                .field(
                    "Category",
                    truncate_chars(row.expense_type, limits::EMBED_FIELD_VALUE_CHARS),
                    true,
                )
                .field(
                    "Observations",
                    if record.observations.is_empty() {
                        "—".to_string()
                    } else {
                        truncate_chars(&record.observations, limits::EMBED_FIELD_VALUE_CHARS)
                    },
                    false,
                )
                .image(format!("attachment://{file_name}"))
                .footer(serenity::CreateEmbedFooter::new(format!("ID: {}", record.id)));
            (embed, attachment)
        };

        ctx.send(
            poise::CreateReply::default()
                .embed(embed)
                .attachment(attachment),
        )
        .await?;
        Ok(())
    }

    /// Edits an expense's receipt image with an AI instruction.
    ///
    /// The stored image is replaced only if the edit succeeds.
    #[poise::command(slash_command, rename = "edit_image")]
    pub async fn expenses_edit_image(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Expense whose receipt to edit"]
        #[autocomplete = "autocomplete::autocomplete_expense"]
        expense: String,
        #[description = "What to change (e.g. 'increase contrast', 'crop to the receipt')"]
        instruction: String,
    ) -> Result<()> {
        let image = {
            let ledger = ctx.data().ledger.lock().await;
            let record: &Expense = ledger.get(&expense).ok_or_else(|| expense_not_found(&expense))?;
            record.receipt_image.clone()
        };

        if let Err(e) = editing::validate_instruction(&instruction) {
            ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                .await?;
            return Ok(());
        }

        ctx.defer().await?;

        let edited =
            match editing::request_edit(ctx.data().editor.as_ref(), &image, &instruction).await {
                Ok(edited) => edited,
                Err(e @ Error::Edit { .. }) => {
                    ctx.say(truncate_chars(
                        &format!("❌ {e}. The receipt was left unchanged."),
                        limits::MESSAGE_CHARS,
                    ))
                    .await?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

        let updated = {
            let mut ledger = ctx.data().ledger.lock().await;
            history::apply_receipt_edit(&mut ledger, &expense, edited).await?
        };

        let (attachment, _) = receipt_attachment(&updated)?;
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "✅ Receipt of {} · {} updated.",
                    updated.date,
                    truncate_chars(&updated.creditor, limits::INLINE_VALUE_CHARS)
                ))
                .attachment(attachment),
        )
        .await?;
        Ok(())
    }

    /// Deletes an expense after confirmation.
    ///
    /// Nothing is removed unless the confirm button is clicked within a minute.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn expenses_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Expense to delete"]
        #[autocomplete = "autocomplete::autocomplete_expense"]
        expense: String,
    ) -> Result<()> {
        let prompt = {
            let ledger = ctx.data().ledger.lock().await;
            let record: &Expense = ledger.get(&expense).ok_or_else(|| expense_not_found(&expense))?;
            format!(
                "Delete the expense {} · {} · {:.2}? This cannot be undone.",
                record.date,
                truncate_chars(&record.creditor, limits::INLINE_VALUE_CHARS),
                record.amount
            )
        };

        let decision = confirm::ask(ctx, &prompt).await?;
        let removed = ctx
            .data()
            .ledger
            .lock()
            .await
            .delete::<Expense>(&expense, decision)
            .await?;

        if removed {
            ctx.say("🗑️ Expense deleted.").await?;
        } else if decision == Decision::Confirmed {
            ctx.say("That expense no longer exists.").await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
