//! General Discord commands - ping and help.
//! These commands don't touch the ledger.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**ExpenseBuddy Help**\n\
        Capture receipts, review the expense history and manage the catalogs.\n\n\
        **Capture**\n\
        • `/receipt upload <image>` - Attaches a receipt and reads it with AI.\n\
        • `/receipt set [date] [creditor] [amount] [commercial] [category] [observations]` - Fills in or corrects the form.\n\
        • `/receipt show` - Shows the current form.\n\
        • `/receipt submit` - Saves the expense.\n\
        • `/receipt cancel` - Discards the form.\n\n\
        **History**\n\
        • `/expenses list [commercial] [category] [year] [month]` - Lists matching expenses.\n\
        • `/expenses export [filters]` - Downloads the matching expenses as `gastos.csv`.\n\
        • `/expenses show <expense>` - Shows one expense with its receipt.\n\
        • `/expenses edit_image <expense> <instruction>` - Edits the receipt image with AI.\n\
        • `/expenses delete <expense>` - Deletes an expense after confirmation.\n\n\
        **Catalogs**\n\
        • `/commercials add|edit|delete|list` - Manage salespeople.\n\
        • `/categories add|rename|delete|list` - Manage expense types.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
