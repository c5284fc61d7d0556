//! Moderation actions: ban, timeout, timeout removal.

use crate::config::Config;
use crate::error::{GuildwardenError, Result};
use crate::utils::duration::format_duration;
use poise::serenity_prelude as serenity;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Discord rejects timeouts longer than 28 days.
const MAX_TIMEOUT: Duration = Duration::from_secs(28 * 24 * 3600);

/// A moderation action against a guild member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PunishAction {
    Ban,
    Mute(Duration),
    Unmute,
}

/// Apply a moderation action and post a notice to the log channel.
///
/// Returns the confirmation text for the invoking moderator.
pub async fn punish(
    ctx: &serenity::Context,
    config: &Config,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    action: PunishAction,
    reason: &str,
) -> Result<String> {
    let confirmation = match action {
        PunishAction::Ban => {
            guild_id.ban_with_reason(ctx, user.id, 0, reason).await?;
            info!(user = %user.id, reason, "banned user");
            format!("🔨 **{}** wurde gebannt. Grund: {}", user.name, reason)
        }
        PunishAction::Mute(duration) => {
            if duration > MAX_TIMEOUT {
                return Err(GuildwardenError::Validation(
                    "Timeouts dürfen höchstens 28 Tage dauern".to_string(),
                ));
            }
            let until = timestamp_after(duration)?;
            guild_id
                .edit_member(
                    ctx,
                    user.id,
                    serenity::EditMember::new().disable_communication_until(until.to_string()),
                )
                .await?;
            info!(user = %user.id, reason, "muted user for {:?}", duration);
            format!(
                "🔇 **{}** wurde für {} stummgeschaltet. Grund: {}",
                user.name,
                format_duration(duration),
                reason
            )
        }
        PunishAction::Unmute => {
            guild_id
                .edit_member(ctx, user.id, serenity::EditMember::new().enable_communication())
                .await?;
            info!(user = %user.id, "unmuted user");
            format!("🔊 **{}** ist nicht mehr stummgeschaltet.", user.name)
        }
    };

    if let Some(log) = config.log_channel {
        if let Err(e) = serenity::ChannelId::new(log).say(ctx, &confirmation).await {
            warn!("failed to post moderation notice: {}", e);
        }
    }

    Ok(confirmation)
}

fn timestamp_after(duration: Duration) -> Result<serenity::Timestamp> {
    let until = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|now| now.as_secs() as i64 + duration.as_secs() as i64)
        .unwrap_or_default();
    serenity::Timestamp::from_unix_timestamp(until)
        .map_err(|e| GuildwardenError::Validation(format!("Invalid timeout end: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_after_is_in_the_future() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let ts = timestamp_after(Duration::from_secs(600)).unwrap();
        assert!(ts.unix_timestamp() >= now + 600);
        assert!(ts.unix_timestamp() <= now + 601);
    }

    #[test]
    fn test_max_timeout_bound() {
        assert!(Duration::from_secs(27 * 24 * 3600) <= MAX_TIMEOUT);
        assert!(Duration::from_secs(29 * 24 * 3600) > MAX_TIMEOUT);
    }
}
