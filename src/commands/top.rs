//! Leaderboard command.

use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

const TOP_COUNT: u32 = 10;

/// Show the most active members.
#[poise::command(slash_command, guild_only)]
pub async fn top(context: Context<'_>) -> Result<(), Error> {
    let leaders = context.data().levels.top(TOP_COUNT).await?;
    if leaders.is_empty() {
        context.say("❌ Es gibt noch keine Einträge.").await?;
        return Ok(());
    }

    let mut lines = String::new();
    for (index, user) in leaders.iter().enumerate() {
        let medal = match index {
            0 => "🥇",
            1 => "🥈",
            2 => "🥉",
            _ => "🏅",
        };
        lines.push_str(&format!(
            "{} **#{}** {} · Level {} ({} XP)\n",
            medal,
            index + 1,
            user.display_name,
            user.level,
            user.xp
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title("🏆 Die aktivsten Mitglieder")
        .description(lines)
        .colour(0x5A09C1);
    context.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
