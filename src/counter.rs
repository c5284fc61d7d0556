//! Member counter channel.
//!
//! A locked voice channel whose name carries the current member count,
//! renamed whenever membership changes.

use crate::error::Result;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Name prefix of the counter channel.
pub const COUNTER_PREFIX: &str = "👤・Mitglieder: ";

/// The counter channel name for a member count.
pub fn counter_channel_name(count: u64) -> String {
    format!("{}{}", COUNTER_PREFIX, count)
}

/// Create the counter channel, locked against joining.
pub async fn create_member_counter(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<serenity::ChannelId> {
    let count = ctx
        .cache
        .guild(guild_id)
        .map(|g| g.member_count)
        .unwrap_or(0);

    let everyone = serenity::RoleId::new(guild_id.get());
    let channel = guild_id
        .create_channel(
            ctx,
            serenity::CreateChannel::new(counter_channel_name(count))
                .kind(serenity::ChannelType::Voice)
                .permissions(vec![serenity::PermissionOverwrite {
                    allow: serenity::Permissions::empty(),
                    deny: serenity::Permissions::CONNECT,
                    kind: serenity::PermissionOverwriteType::Role(everyone),
                }]),
        )
        .await?;
    info!(channel = %channel.id, "created member counter channel");
    Ok(channel.id)
}

/// Bring the counter channel name in line with the current member count.
///
/// Does nothing when no counter channel exists.
pub async fn refresh_member_counter(ctx: &serenity::Context, guild_id: serenity::GuildId) {
    let snapshot = {
        let guild = match ctx.cache.guild(guild_id) {
            Some(g) => g,
            None => return,
        };
        guild
            .channels
            .values()
            .find(|c| c.name.starts_with(COUNTER_PREFIX))
            .map(|c| (c.id, c.name.clone(), guild.member_count))
    };

    let (channel_id, current_name, count) = match snapshot {
        Some(s) => s,
        None => return,
    };

    let wanted = counter_channel_name(count);
    if current_name == wanted {
        return;
    }

    if let Err(e) = channel_id
        .edit(ctx, serenity::EditChannel::new().name(&wanted))
        .await
    {
        warn!(channel = %channel_id, "failed to rename member counter: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_channel_name() {
        assert_eq!(counter_channel_name(0), "👤・Mitglieder: 0");
        assert_eq!(counter_channel_name(1234), "👤・Mitglieder: 1234");
        assert!(counter_channel_name(42).starts_with(COUNTER_PREFIX));
    }
}
