//! Gateway event dispatch.
//!
//! One entry point fans events out to the subsystems that care. Handler
//! failures are logged and contained here so one broken subsystem never
//! stops the others or crashes the gateway loop.

use crate::leveling::ActivitySource;
use crate::tickets;
use crate::types::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

const WELCOME_COLOUR: u32 = 0x5A09C1;

/// Route a gateway event to the interested subsystems.
pub async fn dispatch(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(user = %data_about_bot.user.name, "gateway session ready");
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            handle_member_join(ctx, data, new_member).await;
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            info!(user = %user.id, "member left");
            crate::counter::refresh_member_counter(ctx, *guild_id).await;
        }
        serenity::FullEvent::Message { new_message } => {
            handle_message(ctx, data, new_message).await;
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            data.voice.on_voice_state_update(ctx, old.as_ref(), new).await;
            award_voice_xp(ctx, data, new).await;
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let serenity::Interaction::Component(component) = interaction {
                if let Err(e) = handle_component(ctx, data, component).await {
                    error!(custom_id = %component.data.custom_id, "component handler failed: {}", e);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

async fn handle_member_join(ctx: &serenity::Context, data: &Data, member: &serenity::Member) {
    info!(user = %member.user.id, "member joined");

    if let Some(join_role) = data.config.join_role {
        if let Err(e) = member
            .add_role(ctx, serenity::RoleId::new(join_role))
            .await
        {
            warn!(user = %member.user.id, "failed to assign join role: {}", e);
        }
    }

    if let Some(welcome) = data.config.welcome_channel {
        let embed = serenity::CreateEmbed::new()
            .title("Willkommen! 🎉")
            .description(format!(
                "Willkommen auf dem Server, {}! Schau dich in Ruhe um.",
                member.user
            ))
            .thumbnail(member.user.face())
            .colour(WELCOME_COLOUR);
        if let Err(e) = serenity::ChannelId::new(welcome)
            .send_message(ctx, serenity::CreateMessage::new().embed(embed))
            .await
        {
            warn!("failed to send welcome message: {}", e);
        }
    }

    if let Err(e) = data.levels.seed_member(member).await {
        warn!(user = %member.user.id, "failed to seed progress record: {}", e);
    }

    crate::counter::refresh_member_counter(ctx, member.guild_id).await;
}

async fn handle_message(ctx: &serenity::Context, data: &Data, message: &serenity::Message) {
    if message.author.bot {
        return;
    }
    let guild_id = match message.guild_id {
        Some(id) => id,
        None => return,
    };

    data.tickets.append(message.channel_id.get(), message);

    match guild_id.member(ctx, message.author.id).await {
        Ok(member) => {
            data.levels
                .award_activity(
                    ctx,
                    &member,
                    ActivitySource::Message {
                        length: message.content.chars().count(),
                    },
                )
                .await;
        }
        Err(e) => warn!(user = %message.author.id, "failed to resolve member for xp: {}", e),
    }
}

/// Voice presence only counts when someone else is actually there.
async fn award_voice_xp(ctx: &serenity::Context, data: &Data, state: &serenity::VoiceState) {
    let (guild_id, channel_id) = match (state.guild_id, state.channel_id) {
        (Some(g), Some(c)) => (g, c),
        _ => return,
    };

    let has_company = {
        let guild = match ctx.cache.guild(guild_id) {
            Some(g) => g,
            None => return,
        };
        guild.voice_states.values().any(|v| {
            v.channel_id == Some(channel_id)
                && v.user_id != state.user_id
                && guild
                    .members
                    .get(&v.user_id)
                    .map(|m| !m.user.bot)
                    .unwrap_or(true)
        })
    };
    if !has_company {
        return;
    }

    match guild_id.member(ctx, state.user_id).await {
        Ok(member) => {
            data.levels
                .award_activity(ctx, &member, ActivitySource::VoicePresence)
                .await;
        }
        Err(e) => warn!(user = %state.user_id, "failed to resolve member for voice xp: {}", e),
    }
}

/// Route a button press by its custom id.
///
/// Prefix order matters: the teardown cancel id is a prefix-collision with
/// the teardown confirm id and must be checked first.
async fn handle_component(
    ctx: &serenity::Context,
    data: &Data,
    component: &serenity::ComponentInteraction,
) -> crate::error::Result<()> {
    let custom_id = component.data.custom_id.as_str();

    if custom_id.starts_with("voice_teardown_cancel_") {
        return ephemeral(ctx, component, "Abgebrochen, das Voice-System bleibt aktiv.").await;
    }
    if let Some(raw) = custom_id.strip_prefix("voice_teardown_") {
        let channel_id: u64 = raw.parse().unwrap_or_default();
        let guild_id = component.guild_id.map(|g| g.get()).unwrap_or_default();
        data.voice.remove_monitored(guild_id, channel_id).await?;
        return ephemeral(
            ctx,
            component,
            &format!("Voice-System von <#{}> wurde entfernt.", channel_id),
        )
        .await;
    }
    if let Some(giveaway_id) = custom_id.strip_prefix("join_") {
        let joined = data.giveaways.join(giveaway_id, component.user.id.get()).await?;
        let reply = if joined {
            "Du hast am Giveaway teilgenommen! 🎉"
        } else {
            "Du nimmst bereits teil oder das Giveaway ist vorbei."
        };
        return ephemeral(ctx, component, reply).await;
    }
    if let Some(giveaway_id) = custom_id.strip_prefix("leave_") {
        let left = data.giveaways.leave(giveaway_id, component.user.id.get()).await?;
        let reply = if left {
            "Du hast das Giveaway verlassen."
        } else {
            "Du nimmst an diesem Giveaway nicht teil."
        };
        return ephemeral(ctx, component, reply).await;
    }

    match custom_id {
        "open_ticket" => tickets::open_ticket(ctx, &data.config, &data.tickets, component).await,
        "claim_ticket" => tickets::claim_ticket(ctx, &data.config, component).await,
        "close_ticket" => tickets::request_close(ctx, component).await,
        "confirm_close_yes" => {
            tickets::confirm_close(ctx, &data.config, &data.tickets, component).await
        }
        "confirm_close_no" => tickets::cancel_close(ctx, component).await,
        _ => {
            warn!(custom_id, "unhandled component interaction");
            Ok(())
        }
    }
}

async fn ephemeral(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    content: &str,
) -> crate::error::Result<()> {
    component
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
