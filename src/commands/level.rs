//! Level lookup command.

use crate::leveling::required_xp;
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Show the level progress of a member.
#[poise::command(slash_command, guild_only)]
pub async fn level(
    context: Context<'_>,
    #[description = "Wessen Level? (Standard: du selbst)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.unwrap_or_else(|| context.author().clone());

    let progress = match context.data().levels.progress(&target.id.to_string()).await? {
        Some(p) => p,
        None => {
            context
                .say("❌ Für diesen User gibt es noch keinen Fortschritt.")
                .await?;
            return Ok(());
        }
    };
    let rank = context.data().levels.rank(&target.id.to_string()).await?;

    let embed = serenity::CreateEmbed::new()
        .title(format!("Level von {}", progress.display_name))
        .thumbnail(&progress.avatar_url)
        .field("Level", progress.level.to_string(), true)
        .field(
            "XP",
            format!("{} / {}", progress.xp, required_xp(progress.level)),
            true,
        )
        .field(
            "Rang",
            rank.map(|r| format!("#{}", r)).unwrap_or_else(|| "-".to_string()),
            true,
        )
        .colour(0x5A09C1);

    context.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
