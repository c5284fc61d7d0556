//! XP/leveling engine.
//!
//! Awards experience for messages, voice presence and command use. Progress
//! lives in the store; a TTL'd in-process cache keyed by user id is the
//! source of truth between store syncs and is refreshed on every write.
//!
//! Awards run on hot interaction paths, so they never surface errors to the
//! caller - failures are logged and dropped.

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::Result;
use crate::store::{UserProgress, UserRepository};
use poise::serenity_prelude as serenity;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

/// Levels are capped here; users at the cap earn nothing further.
pub const LEVEL_CAP: i64 = 100;
/// Required xp per level is `level * XP_PER_LEVEL_STEP`.
pub const XP_PER_LEVEL_STEP: i64 = 100;
/// Every multiple of this level grants a configured reward role.
pub const MILESTONE_INTERVAL: i64 = 20;

const VOICE_XP: i64 = 3;
const COMMAND_XP: i64 = 5;
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// What kind of activity triggered an award.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivitySource {
    /// A guild message; xp scales with message length
    Message { length: usize },
    /// Active voice presence alongside other users
    VoicePresence,
    /// A slash command invocation
    Command,
}

/// Experience required to advance from `level` to the next.
pub fn required_xp(level: i64) -> i64 {
    level * XP_PER_LEVEL_STEP
}

/// The xp delta for a single activity event.
pub fn xp_delta(source: ActivitySource) -> i64 {
    match source {
        ActivitySource::Message { length } => (length / 3) as i64,
        ActivitySource::VoicePresence => VOICE_XP,
        ActivitySource::Command => COMMAND_XP,
    }
}

/// Outcome of applying a single award to a progress record.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AwardOutcome {
    pub leveled_up: bool,
    pub milestone: bool,
}

/// Apply an xp delta to a progress record.
///
/// At most one level-up is applied per award, even when the delta would
/// justify more. Users at the cap are left untouched.
pub fn apply_award(progress: &mut UserProgress, delta: i64) -> AwardOutcome {
    if progress.level >= LEVEL_CAP {
        return AwardOutcome::default();
    }

    progress.xp += delta;

    let required = required_xp(progress.level);
    if progress.xp >= required && progress.level < LEVEL_CAP {
        progress.xp -= required;
        progress.level += 1;
        return AwardOutcome {
            leveled_up: true,
            milestone: progress.level % MILESTONE_INTERVAL == 0,
        };
    }

    AwardOutcome::default()
}

struct LevelInner {
    repo: UserRepository,
    cache: Mutex<TtlCache<String, UserProgress>>,
    config: Arc<Config>,
}

/// The leveling engine. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct LevelSystem {
    inner: Arc<LevelInner>,
}

impl LevelSystem {
    /// Create the engine over the given repository.
    pub fn new(repo: UserRepository, config: Arc<Config>) -> Self {
        Self {
            inner: Arc::new(LevelInner {
                repo,
                cache: Mutex::new(TtlCache::new(CACHE_TTL)),
                config,
            }),
        }
    }

    /// Award xp for a qualifying activity. Never fails visibly; errors are logged.
    pub async fn award_activity(
        &self,
        ctx: &serenity::Context,
        member: &serenity::Member,
        source: ActivitySource,
    ) {
        if member.user.bot {
            return;
        }
        if let Err(e) = self.award_inner(ctx, member, source).await {
            error!(user = %member.user.id, "failed to award xp: {}", e);
        }
    }

    async fn award_inner(
        &self,
        ctx: &serenity::Context,
        member: &serenity::Member,
        source: ActivitySource,
    ) -> Result<()> {
        let user_id = member.user.id.to_string();

        let cached = self.inner.cache.lock().unwrap().get(&user_id);
        let mut progress = match cached {
            Some(p) => p,
            None => match self.inner.repo.get_user(&user_id).await? {
                Some(p) => p,
                None => {
                    let fresh = fresh_progress(member);
                    self.inner.repo.create_user(fresh.clone()).await?;
                    self.inner
                        .cache
                        .lock()
                        .unwrap()
                        .insert(user_id.clone(), fresh.clone());
                    fresh
                }
            },
        };

        if progress.level >= LEVEL_CAP {
            return Ok(());
        }

        let outcome = apply_award(&mut progress, xp_delta(source));

        // Keep the display identity current on every award
        progress.username = member.user.name.clone();
        progress.display_name = member.display_name().to_string();
        progress.avatar_url = member.user.face();

        if outcome.milestone {
            self.grant_milestone_role(ctx, member, progress.level).await;
        }

        self.inner.repo.update_user(progress.clone()).await?;
        self.inner
            .cache
            .lock()
            .unwrap()
            .insert(user_id, progress.clone());

        // The announcement goes out even when a milestone role grant failed
        if outcome.leveled_up {
            let message = if outcome.milestone {
                milestone_message(&progress.display_name, progress.level)
            } else {
                level_up_message(&progress.display_name, progress.level)
            };
            self.send_to_bot_chat(ctx, message).await;
        }

        Ok(())
    }

    /// Attempt the milestone role grant. Failures are logged, not retried.
    async fn grant_milestone_role(
        &self,
        ctx: &serenity::Context,
        member: &serenity::Member,
        level: i64,
    ) {
        let role_id = match self.inner.config.milestone_roles.get(&level) {
            Some(id) => *id,
            None => {
                warn!("no reward role configured for milestone level {}", level);
                return;
            }
        };

        match member
            .add_role(&ctx.http, serenity::RoleId::new(role_id))
            .await
        {
            Ok(()) => {
                info!(user = %member.user.id, role = role_id, "assigned milestone role");
            }
            Err(e) => {
                warn!(
                    user = %member.user.id,
                    role = role_id,
                    "failed to assign milestone role: {}",
                    e
                );
            }
        }
    }

    async fn send_to_bot_chat(&self, ctx: &serenity::Context, message: String) {
        let channel_id = match self.inner.config.bot_chat_channel {
            Some(id) => serenity::ChannelId::new(id),
            None => {
                warn!("BOT_CHAT_CHANNEL is not configured, dropping announcement");
                return;
            }
        };

        if let Err(e) = channel_id.say(&ctx.http, message).await {
            warn!("failed to send announcement to bot chat: {}", e);
        }
    }

    /// A user's progress, cache first, store on miss.
    pub async fn progress(&self, user_id: &str) -> Result<Option<UserProgress>> {
        if let Some(p) = self.inner.cache.lock().unwrap().get(&user_id.to_string()) {
            return Ok(Some(p));
        }

        let progress = self.inner.repo.get_user(user_id).await?;
        if let Some(ref p) = progress {
            self.inner
                .cache
                .lock()
                .unwrap()
                .insert(user_id.to_string(), p.clone());
        }
        Ok(progress)
    }

    /// Leaderboard rank, or `None` for unknown users.
    pub async fn rank(&self, user_id: &str) -> Result<Option<i64>> {
        self.inner.repo.placement(user_id).await
    }

    /// Top `n` users by (level desc, xp desc).
    pub async fn top(&self, n: u32) -> Result<Vec<UserProgress>> {
        self.inner.repo.top_users(n).await
    }

    /// Seed a fresh progress record on guild join if none exists yet.
    pub async fn seed_member(&self, member: &serenity::Member) -> Result<()> {
        if member.user.bot {
            return Ok(());
        }
        let user_id = member.user.id.to_string();
        if self.inner.repo.get_user(&user_id).await?.is_none() {
            self.inner.repo.create_user(fresh_progress(member)).await?;
        }
        Ok(())
    }

    /// Drop all cached progress. Called on shutdown.
    pub fn clear_cache(&self) {
        self.inner.cache.lock().unwrap().clear();
        info!("level cache cleared");
    }
}

fn level_up_message(display_name: &str, level: i64) -> String {
    format!(
        "Glückwunsch **{}**, du hast Level **{}** erreicht! 🎉",
        display_name, level
    )
}

fn milestone_message(display_name: &str, level: i64) -> String {
    format!(
        "🎉 **{}** hat Level **{}** erreicht und eine neue Rolle verdient!",
        display_name, level
    )
}

fn fresh_progress(member: &serenity::Member) -> UserProgress {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    UserProgress {
        user_id: member.user.id.to_string(),
        username: member.user.name.clone(),
        display_name: member.display_name().to_string(),
        creation_date: member.user.created_at().unix_timestamp(),
        join_date: member
            .joined_at
            .map(|t| t.unix_timestamp())
            .unwrap_or(now),
        level: 1,
        xp: 0,
        avatar_url: member.user.face(),
        banner_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(level: i64, xp: i64) -> UserProgress {
        UserProgress {
            user_id: "1".to_string(),
            username: "tester".to_string(),
            display_name: "Tester".to_string(),
            creation_date: 0,
            join_date: 0,
            level,
            xp,
            avatar_url: String::new(),
            banner_url: None,
        }
    }

    #[test]
    fn test_required_xp_is_monotonic() {
        for level in 1..LEVEL_CAP {
            assert!(required_xp(level) < required_xp(level + 1));
        }
        assert_eq!(required_xp(1), XP_PER_LEVEL_STEP);
    }

    #[test]
    fn test_xp_delta_per_source() {
        assert_eq!(xp_delta(ActivitySource::Message { length: 30 }), 10);
        assert_eq!(xp_delta(ActivitySource::Message { length: 2 }), 0);
        assert_eq!(xp_delta(ActivitySource::VoicePresence), 3);
        assert_eq!(xp_delta(ActivitySource::Command), 5);
    }

    #[test]
    fn test_level_up_carries_remainder() {
        // Level 1 with 95 xp, a 30-char message: delta 10 -> 105 >= 100
        let mut p = progress(1, 95);
        let outcome = apply_award(&mut p, xp_delta(ActivitySource::Message { length: 30 }));
        assert!(outcome.leveled_up);
        assert!(!outcome.milestone);
        assert_eq!(p.level, 2);
        assert_eq!(p.xp, 5);
    }

    #[test]
    fn test_single_step_level_up() {
        // A huge delta still advances exactly one level
        let mut p = progress(1, 0);
        let outcome = apply_award(&mut p, 1_000);
        assert!(outcome.leveled_up);
        assert_eq!(p.level, 2);
        assert_eq!(p.xp, 900);
    }

    #[test]
    fn test_milestone_detection() {
        let mut p = progress(19, required_xp(19) - 1);
        let outcome = apply_award(&mut p, 1);
        assert!(outcome.leveled_up);
        assert!(outcome.milestone);
        assert_eq!(p.level, 20);
        assert_eq!(p.xp, 0);
    }

    #[test]
    fn test_capped_user_earns_nothing() {
        let mut p = progress(LEVEL_CAP, 0);
        let outcome = apply_award(&mut p, 500);
        assert_eq!(outcome, AwardOutcome::default());
        assert_eq!(p.level, LEVEL_CAP);
        assert_eq!(p.xp, 0);
    }

    #[test]
    fn test_announcement_texts_are_distinct() {
        let regular = level_up_message("Tester", 19);
        let milestone = milestone_message("Tester", 20);
        assert!(regular.contains("Level **19**"));
        assert!(milestone.contains("Level **20**"));
        assert!(milestone.contains("Rolle"));
        assert_ne!(regular, milestone);
    }

    #[test]
    fn test_awards_keep_invariant_below_cap() {
        // Any sequence of awards leaves xp < required_xp(level) or level == cap
        let mut p = progress(1, 0);
        for delta in [10, 99, 3, 250, 0, 77, 100, 100, 42] {
            apply_award(&mut p, delta);
            assert!(p.xp < required_xp(p.level) || p.level == LEVEL_CAP);
            assert!(p.xp >= 0);
        }
    }
}
