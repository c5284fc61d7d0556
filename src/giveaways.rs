//! Giveaway scheduler.
//!
//! Each active giveaway has a persisted record and an armed timer that fires
//! at its end time. Resolution can also be triggered early by the creator.
//! Whoever resolves first deletes the record; the delete result is the claim,
//! so the winner announcement happens exactly once even when the timer and an
//! early end race.

use crate::error::{GuildwardenError, Result};
use crate::store::{Giveaway, GiveawayRepository};
use poise::serenity_prelude as serenity;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const ID_LENGTH: usize = 9;
const ID_RETRIES: u32 = 5;
const DEFAULT_COLOUR: u32 = 0x5A09C1;

/// A short random identifier for a giveaway: lowercase letters and digits.
pub fn generate_id() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(ID_LENGTH)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// Parse a user-supplied hex colour like `"FF69B4"` or `"#ff69b4"`.
pub fn parse_colour(raw: &str) -> Option<u32> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

struct SchedulerInner {
    repo: GiveawayRepository,
    http: Arc<serenity::Http>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Drives giveaway announcements, membership updates and resolution.
#[derive(Clone)]
pub struct GiveawayScheduler {
    inner: Arc<SchedulerInner>,
}

impl GiveawayScheduler {
    /// Create a scheduler over the given repository.
    pub fn new(repo: GiveawayRepository, http: Arc<serenity::Http>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                repo,
                http,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start a giveaway: announce it, persist it and arm its timer.
    ///
    /// Returns the giveaway id shown to the creator.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        guild_id: u64,
        channel_id: u64,
        creator_id: u64,
        prize: &str,
        duration: Duration,
        color: Option<String>,
        thumbnail_url: Option<String>,
    ) -> Result<String> {
        let id = self.fresh_id().await?;

        let now_ms = unix_millis();
        let duration_ms = duration.as_millis() as u64;
        let end_time = now_ms + duration_ms as i64;

        let embed = announcement_embed(prize, end_time, 0, color.as_deref(), thumbnail_url.as_deref());
        let message = serenity::ChannelId::new(channel_id)
            .send_message(
                &self.inner.http,
                serenity::CreateMessage::new()
                    .embed(embed)
                    .components(vec![membership_buttons(&id)]),
            )
            .await?;

        let giveaway = Giveaway {
            id: id.clone(),
            guild_id,
            channel_id,
            prize: prize.to_string(),
            duration_ms,
            end_time,
            participants: Vec::new(),
            message_id: message.id.get(),
            creator_id,
            color,
            thumbnail_url,
        };
        self.inner.repo.create(giveaway).await?;

        self.arm_timer(&id, duration).await;
        info!(giveaway = %id, prize, "giveaway started");

        Ok(id)
    }

    /// Re-arm timers for all giveaways that survived a restart.
    ///
    /// Expired ones resolve immediately. Returns how many were restored.
    pub async fn restore(&self) -> Result<usize> {
        let pending = self.inner.repo.all().await?;
        let count = pending.len();
        for giveaway in pending {
            let remaining_ms = giveaway.end_time - unix_millis();
            let remaining = Duration::from_millis(remaining_ms.max(0) as u64);
            info!(giveaway = %giveaway.id, "re-arming giveaway timer");
            self.arm_timer(&giveaway.id, remaining).await;
        }
        Ok(count)
    }

    async fn arm_timer(&self, id: &str, delay: Duration) {
        let scheduler = self.clone();
        let timer_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = scheduler.resolve(&timer_id).await {
                error!(giveaway = %timer_id, "giveaway resolution failed: {}", e);
            }
        });
        self.inner.timers.lock().await.insert(id.to_string(), handle);
    }

    /// Add a user to a giveaway, refreshing the announcement on change.
    ///
    /// Returns `false` when the user was already in or the giveaway is gone.
    pub async fn join(&self, giveaway_id: &str, user_id: u64) -> Result<bool> {
        let joined = self
            .inner
            .repo
            .add_participant(giveaway_id, &user_id.to_string())
            .await?;
        if joined {
            self.refresh_announcement(giveaway_id).await;
        }
        Ok(joined)
    }

    /// Remove a user from a giveaway, refreshing the announcement on change.
    pub async fn leave(&self, giveaway_id: &str, user_id: u64) -> Result<bool> {
        let left = self
            .inner
            .repo
            .remove_participant(giveaway_id, &user_id.to_string())
            .await?;
        if left {
            self.refresh_announcement(giveaway_id).await;
        }
        Ok(left)
    }

    /// End a giveaway before its timer fires.
    ///
    /// Returns `false` when no such giveaway exists (or it already resolved).
    pub async fn resolve_early(&self, giveaway_id: &str) -> Result<bool> {
        if let Some(handle) = self.inner.timers.lock().await.remove(giveaway_id) {
            handle.abort();
        }
        self.resolve(giveaway_id).await
    }

    /// Resolve a giveaway: claim the record, pick a winner, announce.
    async fn resolve(&self, giveaway_id: &str) -> Result<bool> {
        // The timer entry goes away no matter who wins the claim. No abort
        // here: the caller may be the timer task itself.
        self.inner.timers.lock().await.remove(giveaway_id);

        let giveaway = match self.inner.repo.get(giveaway_id).await? {
            Some(g) => g,
            None => return Ok(false),
        };

        // The delete is the claim. A concurrent resolver that loses it
        // must stay silent.
        if !self.inner.repo.delete(giveaway_id).await? {
            return Ok(false);
        }

        let winner = pick_winner(&giveaway.participants);
        let channel = serenity::ChannelId::new(giveaway.channel_id);

        let embed = match &winner {
            Some(user_id) => winner_embed(&giveaway.prize, user_id),
            None => no_participants_embed(&giveaway.prize),
        };
        channel
            .send_message(&self.inner.http, serenity::CreateMessage::new().embed(embed))
            .await?;

        // Drop the membership buttons from the original announcement
        let final_embed = announcement_embed(
            &giveaway.prize,
            giveaway.end_time,
            giveaway.participants.len(),
            giveaway.color.as_deref(),
            giveaway.thumbnail_url.as_deref(),
        );
        if let Err(e) = channel
            .edit_message(
                &self.inner.http,
                serenity::MessageId::new(giveaway.message_id),
                serenity::EditMessage::new()
                    .embed(final_embed)
                    .components(Vec::new()),
            )
            .await
        {
            warn!(giveaway = %giveaway.id, "failed to strip giveaway buttons: {}", e);
        }

        info!(
            giveaway = %giveaway.id,
            winner = winner.as_deref().unwrap_or("none"),
            "giveaway resolved"
        );
        Ok(true)
    }

    /// Abort all armed timers. Pending giveaways resolve after the next start.
    pub async fn shutdown(&self) {
        let mut timers = self.inner.timers.lock().await;
        for (id, handle) in timers.drain() {
            info!(giveaway = %id, "aborting giveaway timer");
            handle.abort();
        }
    }

    async fn fresh_id(&self) -> Result<String> {
        for _ in 0..ID_RETRIES {
            let id = generate_id();
            if self.inner.repo.get(&id).await?.is_none() {
                return Ok(id);
            }
        }
        Err(GuildwardenError::Validation(
            "Could not generate a unique giveaway id".to_string(),
        ))
    }

    async fn refresh_announcement(&self, giveaway_id: &str) {
        let giveaway = match self.inner.repo.get(giveaway_id).await {
            Ok(Some(g)) => g,
            Ok(None) => return,
            Err(e) => {
                warn!(giveaway = %giveaway_id, "failed to load giveaway for refresh: {}", e);
                return;
            }
        };

        let embed = announcement_embed(
            &giveaway.prize,
            giveaway.end_time,
            giveaway.participants.len(),
            giveaway.color.as_deref(),
            giveaway.thumbnail_url.as_deref(),
        );
        if let Err(e) = serenity::ChannelId::new(giveaway.channel_id)
            .edit_message(
                &self.inner.http,
                serenity::MessageId::new(giveaway.message_id),
                serenity::EditMessage::new().embed(embed),
            )
            .await
        {
            warn!(giveaway = %giveaway.id, "failed to refresh announcement: {}", e);
        }
    }
}

fn pick_winner(participants: &[String]) -> Option<String> {
    if participants.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..participants.len());
    Some(participants[index].clone())
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn announcement_embed(
    prize: &str,
    end_time_ms: i64,
    participant_count: usize,
    color: Option<&str>,
    thumbnail_url: Option<&str>,
) -> serenity::CreateEmbed {
    let colour = color.and_then(parse_colour).unwrap_or(DEFAULT_COLOUR);
    let mut embed = serenity::CreateEmbed::new()
        .title("🎉 Giveaway 🎉")
        .description(format!(
            "**Preis**: {}\nEndet <t:{}:R>\n\n**Teilnehmer**: {}",
            prize,
            end_time_ms / 1000,
            participant_count
        ))
        .colour(colour);
    if let Some(url) = thumbnail_url {
        embed = embed.thumbnail(url);
    }
    embed
}

fn winner_embed(prize: &str, winner_id: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("🎉 Giveaway beendet 🎉")
        .description(format!(
            "<@{}> hat **{}** gewonnen! Herzlichen Glückwunsch!",
            winner_id, prize
        ))
        .colour(DEFAULT_COLOUR)
}

fn no_participants_embed(prize: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Giveaway beendet")
        .description(format!(
            "Niemand hat am Giveaway für **{}** teilgenommen.",
            prize
        ))
        .colour(DEFAULT_COLOUR)
}

fn membership_buttons(giveaway_id: &str) -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("join_{}", giveaway_id))
            .label("Teilnehmen")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(format!("leave_{}", giveaway_id))
            .label("Verlassen")
            .style(serenity::ButtonStyle::Danger),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_lowercase_alphanumeric() {
        for _ in 0..50 {
            let id = generate_id();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_parse_colour() {
        assert_eq!(parse_colour("FF69B4"), Some(0xFF69B4));
        assert_eq!(parse_colour("#ff69b4"), Some(0xFF69B4));
        assert_eq!(parse_colour(" 5a09c1 "), Some(0x5A09C1));
        assert_eq!(parse_colour("red"), None);
        assert_eq!(parse_colour("FFF"), None);
        assert_eq!(parse_colour(""), None);
    }

    #[test]
    fn test_winner_is_a_participant() {
        assert_eq!(pick_winner(&[]), None);

        let participants: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        for _ in 0..50 {
            let winner = pick_winner(&participants).unwrap();
            assert!(participants.contains(&winner));
        }
    }

    #[test]
    fn test_single_participant_always_wins() {
        let participants = vec!["42".to_string()];
        assert_eq!(pick_winner(&participants), Some("42".to_string()));
    }

    #[tokio::test]
    async fn test_lost_claim_still_clears_timer_entry() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();
        crate::store::init_db(&db_path_str)
            .await
            .expect("Failed to initialize database");

        let scheduler = GiveawayScheduler::new(
            GiveawayRepository::new(db_path_str),
            Arc::new(serenity::Http::new("")),
        );

        // A timer for a giveaway that no longer exists, as after a racing
        // early end that already claimed the record
        scheduler.arm_timer("gone12345", Duration::from_secs(3600)).await;
        assert_eq!(scheduler.inner.timers.lock().await.len(), 1);

        assert!(!scheduler.resolve("gone12345").await.unwrap());
        assert!(scheduler.inner.timers.lock().await.is_empty());
    }
}
