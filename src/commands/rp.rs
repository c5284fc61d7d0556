//! Roleplay command.

use crate::roleplay::{fetch_gif, Emotion};
use crate::types::{Context, Error};
use poise::serenity_prelude as serenity;

/// Direct a roleplay emotion at another member.
#[poise::command(slash_command, guild_only)]
pub async fn rp(
    context: Context<'_>,
    #[description = "Was möchtest du tun?"] emotion: Emotion,
    #[description = "Mit wem?"] user: serenity::User,
) -> Result<(), Error> {
    if user.id == context.author().id {
        context
            .say("❌ Das kannst du nicht mit dir selbst machen.")
            .await?;
        return Ok(());
    }
    if user.bot {
        context.say("❌ Bots haben dafür keine Gefühle.").await?;
        return Ok(());
    }

    let gif = fetch_gif(&context.data().http_client, emotion.reaction()).await?;
    let gif_url = match gif {
        Some(url) => url,
        None => {
            context
                .say("❌ Dafür wurde leider kein Gif gefunden.")
                .await?;
            return Ok(());
        }
    };

    let embed = serenity::CreateEmbed::new()
        .description(format!(
            "{} {} {} {}!",
            emotion.emoji(),
            context.author(),
            emotion.verb(),
            user
        ))
        .image(gif_url)
        .colour(emotion.colour());
    context.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
