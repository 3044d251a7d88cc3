//! Reference-data commands - `/commercials` and `/categories`.
//!
//! Deleting a commercial or category never touches the expenses that use it; the history
//! shows those references as unknown.

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
            ledger::Decision,
            models::{Commercial, ExpenseType},
            reference,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// A catalog name as quoted in a reply.
    fn shown(name: &str) -> String {
        truncate_chars(name, limits::INLINE_VALUE_CHARS)
    }

    /// Parent command for managing salespeople.
    ///
    /// Commercials are the people expenses are charged to. This command groups the
    /// subcommands for adding, editing, removing and listing them.
    #[poise::command(
        slash_command,
        subcommands(
            "commercial_add",
            "commercial_edit",
            "commercial_delete",
            "commercial_list"
        )
    )]
    pub async fn commercials(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Commercial management command. Available subcommands:\n\
            `/commercials add` - Add a salesperson\n\
            `/commercials edit` - Change a salesperson's details\n\
            `/commercials delete` - Remove a salesperson\n\
            `/commercials list` - List all salespeople";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds a salesperson.
    ///
    /// The name is required; email and phone may be left empty.
    #[poise::command(slash_command, rename = "add")]
    pub async fn commercial_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Full name"] name: String,
        #[description = "Email address"] email: Option<String>,
        #[description = "Phone number"] phone: Option<String>,
    ) -> Result<()> {
        let commercial = match reference::new_commercial(
            &name,
            email.as_deref().unwrap_or_default(),
            phone.as_deref().unwrap_or_default(),
        ) {
            Ok(commercial) => commercial,
            Err(e) => {
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        ctx.data()
            .ledger
            .lock()
            .await
            .add(commercial.clone())
            .await?;

        ctx.say(format!("✅ Commercial '{}' added.", shown(&commercial.name)))
            .await?;
        Ok(())
    }

    /// Changes a salesperson's name, email or phone.
    ///
    /// Options left out keep their current value. The id stays the same, so existing
    /// expenses follow the change.
    #[poise::command(slash_command, rename = "edit")]
    pub async fn commercial_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Salesperson to edit"]
        #[autocomplete = "autocomplete::autocomplete_commercial"]
        commercial: String,
        #[description = "New name"] name: Option<String>,
        #[description = "New email address"] email: Option<String>,
        #[description = "New phone number"] phone: Option<String>,
    ) -> Result<()> {
        let mut ledger = ctx.data().ledger.lock().await;
        let Some(current) = reference::find_commercial(ledger.commercials(), &commercial) else {
            drop(ledger);
            ctx.say(format!("❌ No commercial named '{}'.", shown(&commercial)))
                .await?;
            return Ok(());
        };

        let edited = match reference::edited_commercial(
            current,
            name.as_deref(),
            email.as_deref(),
            phone.as_deref(),
        ) {
            Ok(edited) => edited,
            Err(e) => {
                drop(ledger);
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        ledger.update(edited.clone()).await?;
        drop(ledger);

        ctx.say(format!("✅ Commercial '{}' updated.", shown(&edited.name)))
            .await?;
        Ok(())
    }

    /// Removes a salesperson after confirmation. Their expenses are kept.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn commercial_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Salesperson to remove"]
        #[autocomplete = "autocomplete::autocomplete_commercial"]
        commercial: String,
    ) -> Result<()> {
        let target = {
            let ledger = ctx.data().ledger.lock().await;
            reference::find_commercial(ledger.commercials(), &commercial).cloned()
        };
        let Some(target) = target else {
            ctx.say(format!("❌ No commercial named '{}'.", shown(&commercial)))
                .await?;
            return Ok(());
        };

        let decision = confirm::ask(
            ctx,
            &format!(
                "Remove commercial '{}'? Their expenses are kept and will show the commercial as unknown.",
                shown(&target.name)
            ),
        )
        .await?;

        let removed = ctx
            .data()
            .ledger
            .lock()
            .await
            .delete::<Commercial>(&target.id, decision)
            .await?;

        if removed {
            ctx.say(format!("🗑️ Commercial '{}' removed.", shown(&target.name)))
                .await?;
        } else if decision == Decision::Confirmed {
            ctx.say("That commercial no longer exists.").await?;
        }
        Ok(())
    }

    /// Lists all salespeople.
    ///
    /// Shows each commercial's email and phone in an embed.
    #[poise::command(slash_command, rename = "list")]
    pub async fn commercial_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let (fields, total): (Vec<(String, String, bool)>, usize) = {
            let ledger = ctx.data().ledger.lock().await;
            let fields = ledger
                .commercials()
                .iter()
                .take(limits::EMBED_FIELDS)
                .map(|c| {
                    let email = if c.email.is_empty() { "—" } else { &c.email };
                    let phone = if c.phone.is_empty() { "—" } else { &c.phone };
                    (
                        truncate_chars(&c.name, limits::EMBED_FIELD_NAME_CHARS),
                        truncate_chars(
                            &format!("📧 {email}\n📞 {phone}"),
                            limits::EMBED_FIELD_VALUE_CHARS,
                        ),
                        true,
                    )
                })
                .collect();
            (fields, ledger.commercials().len())
        };

        if fields.is_empty() {
            ctx.say("No commercials yet. Use `/commercials add` to create one!")
                .await?;
            return Ok(());
        }

        let mut embed = serenity::CreateEmbed::default()
            .title("**Commercials**")
            .color(0x0058_65F2)
            .fields(fields);
        if total > limits::EMBED_FIELDS {
            embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
                "Showing {} of {total}. Use autocomplete in /commercials edit to find the rest.",
                limits::EMBED_FIELDS
            )));
        }

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Parent command for managing expense categories.
    ///
    /// Categories are offered to the receipt reader, which picks the closest one. This
    /// command groups the subcommands for adding, renaming, removing and listing them.
    #[poise::command(
        slash_command,
        subcommands(
            "category_add",
            "category_rename",
            "category_delete",
            "category_list"
        )
    )]
    pub async fn categories(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Category management command. Available subcommands:\n\
            `/categories add` - Add a category\n\
            `/categories rename` - Rename a category\n\
            `/categories delete` - Remove a category\n\
            `/categories list` - List all categories";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Adds an expense category.
    ///
    /// Names are unique ignoring case.
    #[poise::command(slash_command, rename = "add")]
    pub async fn category_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name (e.g. 'Peajes')"] name: String,
    ) -> Result<()> {
        let expense_type = match reference::new_expense_type(&name) {
            Ok(expense_type) => expense_type,
            Err(e) => {
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        {
            let mut ledger = ctx.data().ledger.lock().await;
            if reference::find_expense_type(ledger.expense_types(), &expense_type.name).is_some() {
                drop(ledger);
                ctx.say(format!(
                    "⚠️ A category named '{}' already exists.",
                    shown(&expense_type.name)
                ))
                .await?;
                return Ok(());
            }
            ledger.add(expense_type.clone()).await?;
        }

        ctx.say(format!("✅ Category '{}' added.", shown(&expense_type.name)))
            .await?;
        Ok(())
    }

    /// Renames an expense category.
    ///
    /// The id stays the same, so existing expenses show the new name.
    #[poise::command(slash_command, rename = "rename")]
    pub async fn category_rename(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category to rename"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "New name"] name: String,
    ) -> Result<()> {
        let mut ledger = ctx.data().ledger.lock().await;
        let Some(current) = reference::find_expense_type(ledger.expense_types(), &category) else {
            drop(ledger);
            ctx.say(format!("❌ No category named '{}'.", shown(&category)))
                .await?;
            return Ok(());
        };

        let old_name = current.name.clone();
        let renamed = match reference::renamed_expense_type(current, &name) {
            Ok(renamed) => renamed,
            Err(e) => {
                drop(ledger);
                ctx.say(truncate_chars(&format!("❌ {e}"), limits::MESSAGE_CHARS))
                    .await?;
                return Ok(());
            }
        };

        ledger.update(renamed.clone()).await?;
        drop(ledger);

        ctx.say(format!(
            "✅ Category '{}' renamed to '{}'.",
            shown(&old_name),
            shown(&renamed.name)
        ))
        .await?;
        Ok(())
    }

    /// Removes an expense category after confirmation. Its expenses are kept.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn category_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category to remove"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
    ) -> Result<()> {
        let target = {
            let ledger = ctx.data().ledger.lock().await;
            reference::find_expense_type(ledger.expense_types(), &category).cloned()
        };
        let Some(target) = target else {
            ctx.say(format!("❌ No category named '{}'.", shown(&category)))
                .await?;
            return Ok(());
        };

        let decision = confirm::ask(
            ctx,
            &format!(
                "Remove category '{}'? Its expenses are kept and will show the category as unknown.",
                shown(&target.name)
            ),
        )
        .await?;

        let removed = ctx
            .data()
            .ledger
            .lock()
            .await
            .delete::<ExpenseType>(&target.id, decision)
            .await?;

        if removed {
            ctx.say(format!("🗑️ Category '{}' removed.", shown(&target.name)))
                .await?;
        } else if decision == Decision::Confirmed {
            ctx.say("That category no longer exists.").await?;
        }
        Ok(())
    }

    /// Lists all expense categories.
    #[poise::command(slash_command, rename = "list")]
    pub async fn category_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let names: Vec<String> = {
            let ledger = ctx.data().ledger.lock().await;
            ledger
                .expense_types()
                .iter()
                .map(|t| format!("• {}", shown(&t.name)))
                .collect()
        };

        if names.is_empty() {
            ctx.say("No categories yet. Use `/categories add` to create one!")
                .await?;
            return Ok(());
        }

        ctx.say(truncate_chars(
            &format!("**Categories**\n{}", names.join("\n")),
            limits::MESSAGE_CHARS,
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
