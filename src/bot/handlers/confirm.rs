//! Two-button confirmation for destructive actions.
//!
//! The prompt resolves to a [`Decision`] that the command hands to the ledger's delete;
//! a timeout counts as declined.

use crate::{
    bot::{BotData, limits},
    core::ledger::Decision,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// How long the buttons stay live.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Asks the invoking user to confirm `prompt` and waits for their click.
pub async fn ask(ctx: poise::Context<'_, BotData, Error>, prompt: &str) -> Result<Decision> {
    let confirm_id = format!("{}-confirm", ctx.id());
    let cancel_id = format!("{}-cancel", ctx.id());

    let buttons = serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(confirm_id.clone())
            .label("Delete")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new(cancel_id.clone())
            .label("Cancel")
            .style(serenity::ButtonStyle::Secondary),
    ]);

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .content(limits::truncate_chars(prompt, limits::MESSAGE_CHARS))
                .components(vec![buttons]),
        )
        .await?;

    let prefix = ctx.id().to_string();
    let interaction = serenity::ComponentInteractionCollector::new(ctx)
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(CONFIRM_TIMEOUT)
        .filter(move |mci| mci.data.custom_id.starts_with(&prefix))
        .await;

    let Some(interaction) = interaction else {
        handle
            .edit(
                ctx,
                poise::CreateReply::default()
                    .content("⌛ No answer, nothing was deleted.")
                    .components(Vec::new()),
            )
            .await?;
        return Ok(Decision::Declined);
    };

    let decision = if interaction.data.custom_id == confirm_id {
        Decision::Confirmed
    } else {
        Decision::Declined
    };

    let status = match decision {
        Decision::Confirmed => "Deleting...",
        Decision::Declined => "Cancelled, nothing was deleted.",
    };
    interaction
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(status)
                    .components(Vec::new()),
            ),
        )
        .await?;

    Ok(decision)
}
