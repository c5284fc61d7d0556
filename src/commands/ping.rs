//! Liveness check.

use crate::types::{Context, Error};

/// Check whether the bot is alive and how fast the gateway answers.
#[poise::command(slash_command)]
pub async fn ping(context: Context<'_>) -> Result<(), Error> {
    let latency = context.ping().await;
    context
        .say(format!("Pong! 🏓 ({} ms)", latency.as_millis()))
        .await?;
    Ok(())
}
