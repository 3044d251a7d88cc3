use dotenvy::dotenv;
use expense_buddy::{
    bot::{self, BotData},
    config::{database, settings},
    core::{gemini::GeminiClient, ledger::Ledger},
    errors::{Error, Result},
};
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings, falling back to the built-in defaults
    let config = settings::load_default_config().unwrap_or_else(|e| {
        warn!("{e}; using built-in defaults");
        settings::Config::default()
    });

    // 4. Connect to the database and create the storage table
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Hydrate the ledger
    let ledger = Ledger::open(db, config.commercials, config.expense_types).await;

    // 6. Build the AI adapters
    let api_key = settings::gemini_api_key()
        .inspect_err(|e| error!("GEMINI_API_KEY not found: {e}"))?;
    let gemini = Arc::new(GeminiClient::new(config.gemini, api_key)?);

    // 7. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    let data = BotData::new(ledger, gemini.clone(), gemini);
    bot::run_bot(token, data).await
}
