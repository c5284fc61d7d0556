//! Giveaway commands.

use crate::types::{Context, Error};
use crate::utils::duration::parse_duration;
use poise::serenity_prelude as serenity;

/// Start a giveaway in the current channel.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn creategiveaway(
    context: Context<'_>,
    #[description = "Dauer, z.B. 10m, 2h oder 1d"] zeit: String,
    #[description = "Was gibt es zu gewinnen?"] preis: String,
    #[description = "Embed-Farbe als Hex, z.B. FF69B4"] farbe: Option<String>,
    #[description = "Bild für das Giveaway"] bild: Option<serenity::Attachment>,
) -> Result<(), Error> {
    let duration = match parse_duration(&zeit) {
        Some(d) => d,
        None => {
            context
                .send(
                    poise::CreateReply::default()
                        .content("❌ Ungültige Dauer. Erlaubt sind z.B. `30s`, `10m`, `2h` oder `1d`.")
                        .ephemeral(true),
                )
                .await?;
            return Ok(());
        }
    };

    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };

    let id = context
        .data()
        .giveaways
        .create(
            guild_id.get(),
            context.channel_id().get(),
            context.author().id.get(),
            &preis,
            duration,
            farbe,
            bild.map(|a| a.url),
        )
        .await?;

    context
        .send(
            poise::CreateReply::default()
                .content(format!("✅ Giveaway gestartet! ID: `{}`", id))
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// End a giveaway before its timer fires.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn endgiveaway(
    context: Context<'_>,
    #[description = "ID des Giveaways"] giveawayid: String,
) -> Result<(), Error> {
    let resolved = context.data().giveaways.resolve_early(&giveawayid).await?;
    let reply = if resolved {
        "✅ Das Giveaway wurde beendet.".to_string()
    } else {
        format!("❌ Kein aktives Giveaway mit der ID `{}` gefunden.", giveawayid)
    };
    context
        .send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
