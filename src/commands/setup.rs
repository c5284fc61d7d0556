//! Setup commands for the ticket prompt, voice lobbies and the member counter.

use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Configure server features.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    subcommands("ticket", "voice", "membercounter")
)]
pub async fn setup(_context: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Post the ticket prompt into the current channel.
#[poise::command(slash_command, guild_only)]
pub async fn ticket(context: Context<'_>) -> Result<(), Error> {
    crate::tickets::post_ticket_prompt(context.serenity_context(), context.channel_id()).await?;
    context
        .send(
            poise::CreateReply::default()
                .content("✅ Ticket-System eingerichtet.")
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// Turn a voice channel into a monitored lobby, or offer to tear it down again.
#[poise::command(slash_command, guild_only)]
pub async fn voice(
    context: Context<'_>,
    #[description = "Der Lobby-Channel"]
    #[channel_types("Voice")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };

    let manager = &context.data().voice;
    if manager.is_monitored(guild_id.get(), channel.id.get()).await {
        let buttons = serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(format!("voice_teardown_{}", channel.id.get()))
                .label("Entfernen")
                .style(serenity::ButtonStyle::Danger),
            serenity::CreateButton::new(format!("voice_teardown_cancel_{}", channel.id.get()))
                .label("Abbrechen")
                .style(serenity::ButtonStyle::Secondary),
        ]);
        context
            .send(
                poise::CreateReply::default()
                    .content(format!(
                        "<#{}> ist bereits ein Voice-System. Soll es entfernt werden?",
                        channel.id
                    ))
                    .components(vec![buttons])
                    .ephemeral(true),
            )
            .await?;
        return Ok(());
    }

    manager.add_monitored(guild_id.get(), channel.id.get()).await?;
    context
        .send(
            poise::CreateReply::default()
                .content(format!("✅ Voice-System für <#{}> eingerichtet.", channel.id))
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// Create the locked member counter channel.
#[poise::command(slash_command, guild_only)]
pub async fn membercounter(context: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };

    let channel_id =
        crate::counter::create_member_counter(context.serenity_context(), guild_id).await?;
    context
        .send(
            poise::CreateReply::default()
                .content(format!("✅ Mitglieder-Zähler erstellt: <#{}>", channel_id))
                .ephemeral(true),
        )
        .await?;
    Ok(())
}
