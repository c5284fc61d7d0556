//! Ticket sessions and their button workflow.
//!
//! A ticket is a private text channel plus an in-memory transcript session.
//! Every message in a tracked channel is appended to the session; closing the
//! ticket flushes the transcript to the log channel and deletes the channel.

use crate::config::Config;
use crate::error::Result;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// An open ticket's transcript state.
#[derive(Debug, Clone)]
struct TicketSession {
    ticket_type: String,
    name: String,
    lines: Vec<String>,
}

/// Tracks transcript sessions for open ticket channels.
#[derive(Clone, Default)]
pub struct TicketTracker {
    sessions: Arc<Mutex<HashMap<u64, TicketSession>>>,
}

impl TicketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a ticket channel.
    pub fn open(&self, channel_id: u64, ticket_type: &str, name: &str) {
        self.sessions.lock().unwrap().insert(
            channel_id,
            TicketSession {
                ticket_type: ticket_type.to_string(),
                name: name.to_string(),
                lines: Vec::new(),
            },
        );
    }

    /// Whether a channel has an active session.
    pub fn is_tracked(&self, channel_id: u64) -> bool {
        self.sessions.lock().unwrap().contains_key(&channel_id)
    }

    /// Append a message to the channel's transcript.
    ///
    /// Messages in untracked channels are ignored.
    pub fn append(&self, channel_id: u64, message: &serenity::Message) {
        if !message.content.is_empty() {
            self.record(channel_id, &message.author.name, &message.content);
        }
        for sticker in &message.sticker_items {
            self.record(
                channel_id,
                &message.author.name,
                &format!("Sticker: {}", sticker.name),
            );
        }
        for attachment in &message.attachments {
            self.record(channel_id, &message.author.name, &attachment.url);
        }
    }

    /// Append one raw transcript line.
    pub fn record(&self, channel_id: u64, author: &str, body: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&channel_id) {
            session.lines.push(format!("[{}]: {}", author, body));
        }
    }

    /// End a session and render its transcript, or `None` if untracked.
    pub fn flush(&self, channel_id: u64) -> Option<String> {
        let session = self.sessions.lock().unwrap().remove(&channel_id)?;
        Some(format!(
            "**Ticket Type**: {}\n**Ticket Name**: {}\n```\n{}\n```",
            session.ticket_type,
            session.name,
            session.lines.join("\n")
        ))
    }
}

/// Post the embed carrying the "open a ticket" button.
pub async fn post_ticket_prompt(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
) -> Result<()> {
    let embed = serenity::CreateEmbed::new()
        .title("🎫 Support")
        .description("Du brauchst Hilfe? Öffne ein Ticket und das Team meldet sich bei dir.")
        .colour(0x5A09C1);
    let buttons = serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new(
        "open_ticket",
    )
    .label("Ticket öffnen")
    .style(serenity::ButtonStyle::Primary)]);

    channel_id
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .embed(embed)
                .components(vec![buttons]),
        )
        .await?;
    Ok(())
}

/// Create a private ticket channel for the pressing user and start tracking it.
pub async fn open_ticket(
    ctx: &serenity::Context,
    config: &Config,
    tracker: &TicketTracker,
    interaction: &serenity::ComponentInteraction,
) -> Result<()> {
    let guild_id = match interaction.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };
    let user = &interaction.user;
    let channel_name = format!("ticket-{}", user.name.to_lowercase());

    let mut overwrites = vec![
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::VIEW_CHANNEL,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id.get())),
        },
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::VIEW_CHANNEL | serenity::Permissions::SEND_MESSAGES,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(user.id),
        },
    ];
    if let Some(team_role) = config.team_role {
        overwrites.push(serenity::PermissionOverwrite {
            allow: serenity::Permissions::VIEW_CHANNEL | serenity::Permissions::SEND_MESSAGES,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(team_role)),
        });
    }

    let channel = guild_id
        .create_channel(
            ctx,
            serenity::CreateChannel::new(&channel_name)
                .kind(serenity::ChannelType::Text)
                .permissions(overwrites),
        )
        .await?;

    tracker.open(channel.id.get(), "Support", &channel_name);
    info!(channel = %channel.id, user = %user.id, "ticket opened");

    let embed = serenity::CreateEmbed::new()
        .title("🎫 Ticket")
        .description(format!(
            "Hallo {}, beschreibe dein Anliegen. Das Team wird das Ticket übernehmen.",
            user
        ))
        .colour(0x5A09C1);
    let buttons = serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("claim_ticket")
            .label("Übernehmen")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new("close_ticket")
            .label("Schließen")
            .style(serenity::ButtonStyle::Danger),
    ]);
    channel
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .embed(embed)
                .components(vec![buttons]),
        )
        .await?;

    // A bare ping that vanishes again, just to notify
    let ping = channel.say(ctx, format!("{}", user)).await?;
    if let Err(e) = ping.delete(ctx).await {
        warn!(channel = %channel.id, "failed to delete ticket ping: {}", e);
    }

    ephemeral_reply(
        ctx,
        interaction,
        format!("✅ Dein Ticket wurde erstellt: <#{}>", channel.id),
    )
    .await
}

/// Mark a ticket as claimed by a team member.
pub async fn claim_ticket(
    ctx: &serenity::Context,
    config: &Config,
    interaction: &serenity::ComponentInteraction,
) -> Result<()> {
    if let Some(team_role) = config.team_role {
        let is_team = interaction
            .member
            .as_ref()
            .map(|m| m.roles.contains(&serenity::RoleId::new(team_role)))
            .unwrap_or(false);
        if !is_team {
            return ephemeral_reply(
                ctx,
                interaction,
                "❌ Nur Teammitglieder können Tickets übernehmen.".to_string(),
            )
            .await;
        }
    }

    let channel = interaction.channel_id.to_channel(ctx).await?;
    let guild_channel = match channel.guild() {
        Some(c) => c,
        None => return Ok(()),
    };
    if guild_channel
        .topic
        .as_deref()
        .is_some_and(|t| t.contains("claimed by:"))
    {
        return ephemeral_reply(
            ctx,
            interaction,
            "❌ Dieses Ticket wurde bereits übernommen.".to_string(),
        )
        .await;
    }

    interaction
        .channel_id
        .edit(
            ctx,
            serenity::EditChannel::new().topic(format!("claimed by: {}", interaction.user.name)),
        )
        .await?;
    info!(channel = %interaction.channel_id, user = %interaction.user.id, "ticket claimed");

    respond_in_channel(
        ctx,
        interaction,
        format!("✅ {} hat das Ticket übernommen.", interaction.user),
    )
    .await
}

/// Ask for confirmation before closing a ticket.
pub async fn request_close(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
) -> Result<()> {
    let buttons = serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new("confirm_close_yes")
            .label("Ja, schließen")
            .style(serenity::ButtonStyle::Danger),
        serenity::CreateButton::new("confirm_close_no")
            .label("Abbrechen")
            .style(serenity::ButtonStyle::Secondary),
    ]);
    interaction
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content("Soll das Ticket wirklich geschlossen werden?")
                    .components(vec![buttons]),
            ),
        )
        .await?;
    Ok(())
}

/// Close a ticket: flush the transcript to the log channel, then delete the channel.
pub async fn confirm_close(
    ctx: &serenity::Context,
    config: &Config,
    tracker: &TicketTracker,
    interaction: &serenity::ComponentInteraction,
) -> Result<()> {
    let channel_id = interaction.channel_id;

    if let Some(transcript) = tracker.flush(channel_id.get()) {
        match config.log_channel {
            Some(log) => {
                if let Err(e) = serenity::ChannelId::new(log).say(ctx, transcript).await {
                    warn!(channel = %channel_id, "failed to deliver transcript: {}", e);
                }
            }
            None => warn!("LOG_CHANNEL is not configured, dropping ticket transcript"),
        }
    }

    interaction
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content("Das Ticket wird geschlossen."),
            ),
        )
        .await?;

    channel_id.delete(ctx).await?;
    info!(channel = %channel_id, "ticket closed");
    Ok(())
}

/// Abort a pending close request.
pub async fn cancel_close(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
) -> Result<()> {
    ephemeral_reply(ctx, interaction, "Das Ticket bleibt offen.".to_string()).await
}

async fn ephemeral_reply(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: String,
) -> Result<()> {
    interaction
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

async fn respond_in_channel(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: String,
) -> Result<()> {
    interaction
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_flush_renders_transcript() {
        let tracker = TicketTracker::new();
        tracker.open(1, "Support", "ticket-ulli");
        assert!(tracker.is_tracked(1));

        tracker.record(1, "ulli", "Hallo, ich brauche Hilfe");
        tracker.record(1, "team", "Wir kümmern uns darum");
        tracker.record(1, "ulli", "Sticker: thumbsup");

        let transcript = tracker.flush(1).unwrap();
        assert_eq!(
            transcript,
            "**Ticket Type**: Support\n**Ticket Name**: ticket-ulli\n\
             ```\n[ulli]: Hallo, ich brauche Hilfe\n[team]: Wir kümmern uns darum\n\
             [ulli]: Sticker: thumbsup\n```"
        );
        // Flushing ends the session
        assert!(!tracker.is_tracked(1));
        assert!(tracker.flush(1).is_none());
    }

    #[test]
    fn test_record_untracked_is_noop() {
        let tracker = TicketTracker::new();
        tracker.record(99, "ghost", "lost words");

        assert!(!tracker.is_tracked(99));
        assert!(tracker.flush(99).is_none());
    }

    #[test]
    fn test_flush_with_no_messages() {
        let tracker = TicketTracker::new();
        tracker.open(1, "Support", "ticket-x");

        let transcript = tracker.flush(1).unwrap();
        assert!(transcript.ends_with("```\n\n```"));
    }
}
