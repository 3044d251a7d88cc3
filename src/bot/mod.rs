//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for `ExpenseBuddy`: the capture workflow,
//! the expense history and the reference-data manager as slash commands, plus the
//! autocomplete and confirmation handlers they share.
//!
//! Locks are always taken in the order `captures`, then `ledger`, and neither is held
//! while an AI adapter call is in flight.

/// Discord command implementations (receipt, expenses, catalogs, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, confirmation buttons)
pub mod handlers;
/// Discord length limits for outgoing text
pub mod limits;

use crate::{
    core::{
        capture::CaptureForm, editing::ReceiptEditor, extraction::ReceiptExtractor,
        ledger::Ledger,
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// The domain store; every mutation goes through this lock
    pub ledger: Mutex<Ledger>,
    /// One capture session per Discord user
    pub captures: Mutex<HashMap<u64, CaptureForm>>,
    /// Reads uploaded receipts
    pub extractor: Arc<dyn ReceiptExtractor>,
    /// Edits stored receipt images
    pub editor: Arc<dyn ReceiptEditor>,
}

impl BotData {
    /// Creates a new `BotData` around an opened ledger and the two adapters.
    #[must_use]
    pub fn new(
        ledger: Ledger,
        extractor: Arc<dyn ReceiptExtractor>,
        editor: Arc<dyn ReceiptEditor>,
    ) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            captures: Mutex::new(HashMap::new()),
            extractor,
            editor,
        }
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error}", ctx.command().qualified_name);
            let reply = limits::truncate_chars(&format!("❌ {error}"), limits::MESSAGE_CHARS);
            if let Err(e) = ctx.say(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Registers every command and runs the Discord client until it stops.
#[instrument(skip(token, data))]
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::receipt(),
                commands::expenses(),
                commands::commercials(),
                commands::categories(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeEditor, FakeExtractor, sample_image, setup_ledger};

    #[tokio::test]
    async fn test_bot_data_shares_the_given_adapters() -> Result<()> {
        let ledger = setup_ledger().await?;
        let extractor = Arc::new(FakeExtractor::failing("offline"));
        let editor = Arc::new(FakeEditor::failing());

        let data = BotData::new(ledger, extractor.clone(), editor.clone());

        let extracted = data
            .extractor
            .extract(&sample_image(), &["Comidas".to_string()])
            .await;
        assert!(matches!(extracted, Err(Error::Extraction { .. })));
        assert_eq!(extractor.seen_categories(), vec![vec!["Comidas".to_string()]]);

        assert!(data.editor.edit(&sample_image(), "crop").await.is_err());
        assert_eq!(editor.instructions(), vec!["crop".to_string()]);
        Ok(())
    }
}
