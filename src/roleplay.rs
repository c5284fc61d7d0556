//! Roleplay gif lookup via the OtakuGIFs API.

use crate::error::{GuildwardenError, Result};
use serde::Deserialize;

const GIF_API_URL: &str = "https://api.otakugifs.xyz/gif";

/// Response payload of the gif endpoint.
#[derive(Debug, Deserialize)]
pub struct GifResponse {
    pub url: String,
}

/// A roleplay emotion a user can direct at another member.
#[derive(Debug, Clone, Copy, PartialEq, poise::ChoiceParameter)]
pub enum Emotion {
    #[name = "Umarmen"]
    Hug,
    #[name = "Küssen"]
    Kiss,
    #[name = "Tätscheln"]
    Pat,
    #[name = "Ohrfeigen"]
    Slap,
    #[name = "Kuscheln"]
    Cuddle,
    #[name = "Anstupsen"]
    Poke,
    #[name = "Kitzeln"]
    Tickle,
    #[name = "Winken"]
    Wave,
}

impl Emotion {
    /// The API reaction keyword.
    pub fn reaction(self) -> &'static str {
        match self {
            Emotion::Hug => "hug",
            Emotion::Kiss => "kiss",
            Emotion::Pat => "pat",
            Emotion::Slap => "slap",
            Emotion::Cuddle => "cuddle",
            Emotion::Poke => "poke",
            Emotion::Tickle => "tickle",
            Emotion::Wave => "wave",
        }
    }

    /// Verb for the embed text: "{actor} {verb} {target}".
    pub fn verb(self) -> &'static str {
        match self {
            Emotion::Hug => "umarmt",
            Emotion::Kiss => "küsst",
            Emotion::Pat => "tätschelt",
            Emotion::Slap => "ohrfeigt",
            Emotion::Cuddle => "kuschelt mit",
            Emotion::Poke => "stupst",
            Emotion::Tickle => "kitzelt",
            Emotion::Wave => "winkt",
        }
    }

    /// Embed accent colour.
    pub fn colour(self) -> u32 {
        match self {
            Emotion::Hug => 0xF5A9B8,
            Emotion::Kiss => 0xE91E63,
            Emotion::Pat => 0x9B59B6,
            Emotion::Slap => 0xE74C3C,
            Emotion::Cuddle => 0xF1C40F,
            Emotion::Poke => 0x3498DB,
            Emotion::Tickle => 0x2ECC71,
            Emotion::Wave => 0x1ABC9C,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Emotion::Hug => "🤗",
            Emotion::Kiss => "💋",
            Emotion::Pat => "🫳",
            Emotion::Slap => "🫲",
            Emotion::Cuddle => "🥰",
            Emotion::Poke => "👉",
            Emotion::Tickle => "🪶",
            Emotion::Wave => "👋",
        }
    }
}

/// Fetch a random gif for a reaction.
///
/// Returns `None` when the API has no gif for the reaction (404).
pub async fn fetch_gif(client: &reqwest::Client, reaction: &str) -> Result<Option<String>> {
    let url = format!("{}?reaction={}&format=gif", GIF_API_URL, reaction);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| GuildwardenError::Network(format!("Gif API request failed: {}", e)))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(GuildwardenError::GifApi(format!(
            "Gif API returned status {}",
            response.status()
        )));
    }

    let payload: GifResponse = response
        .json()
        .await
        .map_err(|e| GuildwardenError::GifApi(format!("Invalid gif API response: {}", e)))?;
    Ok(Some(payload.url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_keywords_are_api_safe() {
        let emotions = [
            Emotion::Hug,
            Emotion::Kiss,
            Emotion::Pat,
            Emotion::Slap,
            Emotion::Cuddle,
            Emotion::Poke,
            Emotion::Tickle,
            Emotion::Wave,
        ];
        for emotion in emotions {
            assert!(emotion
                .reaction()
                .chars()
                .all(|c| c.is_ascii_lowercase()));
            assert!(!emotion.verb().is_empty());
        }
    }
}
