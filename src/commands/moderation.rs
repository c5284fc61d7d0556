//! Moderation commands: ban, mute, unmute.

use crate::moderation::{punish, PunishAction};
use crate::types::{Context, Error};
use crate::utils::duration::parse_duration;
use poise::serenity_prelude as serenity;

/// Ban a member from the server.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    context: Context<'_>,
    #[description = "Wer soll gebannt werden?"] user: serenity::User,
    #[description = "Grund für den Bann"] grund: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };
    let reason = grund.as_deref().unwrap_or("Kein Grund angegeben");

    let confirmation = punish(
        context.serenity_context(),
        &context.data().config,
        guild_id,
        &user,
        PunishAction::Ban,
        reason,
    )
    .await?;
    context.say(confirmation).await?;
    Ok(())
}

/// Timeout a member for a given duration.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn mute(
    context: Context<'_>,
    #[description = "Wer soll stummgeschaltet werden?"] user: serenity::User,
    #[description = "Dauer, z.B. 10m, 2h oder 1d"] zeit: String,
    #[description = "Grund für den Timeout"] grund: Option<String>,
) -> Result<(), Error> {
    let duration = match parse_duration(&zeit) {
        Some(d) => d,
        None => {
            context
                .say("❌ Ungültige Dauer. Erlaubt sind z.B. `30s`, `10m`, `2h` oder `1d`.")
                .await?;
            return Ok(());
        }
    };

    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };
    let reason = grund.as_deref().unwrap_or("Kein Grund angegeben");

    let confirmation = punish(
        context.serenity_context(),
        &context.data().config,
        guild_id,
        &user,
        PunishAction::Mute(duration),
        reason,
    )
    .await?;
    context.say(confirmation).await?;
    Ok(())
}

/// Lift a member's timeout.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn unmute(
    context: Context<'_>,
    #[description = "Wessen Timeout soll aufgehoben werden?"] user: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = context.guild_id() else {
        return Ok(());
    };

    let confirmation = punish(
        context.serenity_context(),
        &context.data().config,
        guild_id,
        &user,
        PunishAction::Unmute,
        "",
    )
    .await?;
    context.say(confirmation).await?;
    Ok(())
}
