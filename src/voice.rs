//! Ephemeral voice channel lifecycle.
//!
//! Monitored lobby channels act as entry points: whoever joins one gets
//! moved into a personal channel that is created on demand and reclaimed as
//! soon as it sits empty. The monitored set lives in memory for the hot path
//! and is mirrored to the store so it survives restarts.

use crate::error::Result;
use crate::store::VoiceRepository;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Name prefix for generated personal channels.
pub const PERSONAL_PREFIX: &str = "🔊・Talk von ";

/// The generated channel name for a member.
pub fn personal_channel_name(display_name: &str) -> String {
    format!("{}{}", PERSONAL_PREFIX, display_name)
}

/// Whether a channel name marks a generated personal channel.
pub fn is_personal_channel(name: &str) -> bool {
    name.starts_with(PERSONAL_PREFIX)
}

/// Overwrites for a freshly created personal channel.
///
/// The channel starts private: the owner may connect and see it, everyone
/// else is denied connecting until the owner changes that.
fn personal_channel_overwrites(
    guild_id: serenity::GuildId,
    owner: serenity::UserId,
) -> Vec<serenity::PermissionOverwrite> {
    vec![
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::CONNECT | serenity::Permissions::VIEW_CHANNEL,
            deny: serenity::Permissions::empty(),
            kind: serenity::PermissionOverwriteType::Member(owner),
        },
        serenity::PermissionOverwrite {
            allow: serenity::Permissions::empty(),
            deny: serenity::Permissions::CONNECT,
            kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id.get())),
        },
    ]
}

struct VoiceInner {
    repo: VoiceRepository,
    monitored: RwLock<HashSet<(u64, u64)>>,
}

/// Manages monitored lobbies and the personal channels spawned from them.
#[derive(Clone)]
pub struct VoiceManager {
    inner: Arc<VoiceInner>,
}

impl VoiceManager {
    /// Create a manager over the given repository.
    pub fn new(repo: VoiceRepository) -> Self {
        Self {
            inner: Arc::new(VoiceInner {
                repo,
                monitored: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Load the persisted monitored set for a guild into memory.
    pub async fn load(&self, guild_id: u64) -> Result<()> {
        let channels = self.inner.repo.all_channels(guild_id).await?;
        let mut monitored = self.inner.monitored.write().await;
        for channel_id in &channels {
            monitored.insert((guild_id, *channel_id));
        }
        info!(guild = guild_id, count = channels.len(), "loaded monitored voice channels");
        Ok(())
    }

    /// Whether a channel is currently monitored.
    pub async fn is_monitored(&self, guild_id: u64, channel_id: u64) -> bool {
        self.inner
            .monitored
            .read()
            .await
            .contains(&(guild_id, channel_id))
    }

    /// Start monitoring a lobby channel.
    ///
    /// Returns `false` when it was already monitored.
    pub async fn add_monitored(&self, guild_id: u64, channel_id: u64) -> Result<bool> {
        let inserted = self
            .inner
            .monitored
            .write()
            .await
            .insert((guild_id, channel_id));
        if inserted {
            self.inner.repo.add_channel(guild_id, channel_id).await?;
        }
        Ok(inserted)
    }

    /// Stop monitoring a lobby channel. Removing an unmonitored channel is a no-op.
    pub async fn remove_monitored(&self, guild_id: u64, channel_id: u64) -> Result<bool> {
        self.inner
            .monitored
            .write()
            .await
            .remove(&(guild_id, channel_id));
        self.inner.repo.remove_channel(guild_id, channel_id).await
    }

    /// React to a voice state transition.
    ///
    /// Joining a monitored lobby routes the member into their personal
    /// channel. Any departure may leave a personal channel empty, in which
    /// case it is reclaimed. Failures are logged, never retried.
    pub async fn on_voice_state_update(
        &self,
        ctx: &serenity::Context,
        old: Option<&serenity::VoiceState>,
        new: &serenity::VoiceState,
    ) {
        let guild_id = match new.guild_id.or_else(|| old.and_then(|o| o.guild_id)) {
            Some(id) => id,
            None => return,
        };

        if let Some(joined) = new.channel_id {
            if self.is_monitored(guild_id.get(), joined.get()).await {
                if let Err(e) = self.route_to_personal_channel(ctx, guild_id, joined, new).await {
                    error!(user = %new.user_id, "failed to route into personal channel: {}", e);
                }
            }
        }

        if let Some(left) = old.and_then(|o| o.channel_id) {
            if Some(left) != new.channel_id {
                if let Err(e) = self.reclaim_if_empty(ctx, guild_id, left).await {
                    error!(channel = %left, "failed to reclaim personal channel: {}", e);
                }
            }
        }
    }

    async fn route_to_personal_channel(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        lobby_id: serenity::ChannelId,
        state: &serenity::VoiceState,
    ) -> Result<()> {
        let member = match &state.member {
            Some(m) => m.clone(),
            None => guild_id.member(ctx, state.user_id).await?,
        };
        if member.user.bot {
            return Ok(());
        }

        let wanted = personal_channel_name(member.display_name());

        // Snapshot what we need from the cache before any await
        let (existing, parent) = {
            let guild = match ctx.cache.guild(guild_id) {
                Some(g) => g,
                None => {
                    warn!(guild = %guild_id, "guild missing from cache, skipping voice routing");
                    return Ok(());
                }
            };
            let existing = guild
                .channels
                .values()
                .find(|c| c.kind == serenity::ChannelType::Voice && c.name == wanted)
                .map(|c| c.id);
            let parent = guild.channels.get(&lobby_id).and_then(|c| c.parent_id);
            (existing, parent)
        };

        let target = match existing {
            Some(id) => id,
            None => {
                let mut builder = serenity::CreateChannel::new(&wanted)
                    .kind(serenity::ChannelType::Voice)
                    .permissions(personal_channel_overwrites(guild_id, member.user.id));
                if let Some(parent_id) = parent {
                    builder = builder.category(parent_id);
                }
                let channel = guild_id.create_channel(ctx, builder).await?;
                info!(channel = %channel.id, owner = %member.user.id, "created personal voice channel");
                channel.id
            }
        };

        guild_id.move_member(ctx, member.user.id, target).await?;
        Ok(())
    }

    async fn reclaim_if_empty(
        &self,
        ctx: &serenity::Context,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Result<()> {
        let reclaim = {
            let guild = match ctx.cache.guild(guild_id) {
                Some(g) => g,
                None => return Ok(()),
            };
            let channel = match guild.channels.get(&channel_id) {
                Some(c) => c,
                None => return Ok(()),
            };
            let occupied = guild
                .voice_states
                .values()
                .any(|v| v.channel_id == Some(channel_id));
            is_personal_channel(&channel.name) && !occupied
        };

        if reclaim {
            channel_id.delete(ctx).await?;
            info!(channel = %channel_id, "reclaimed empty personal voice channel");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_manager() -> (TempDir, VoiceManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();

        crate::store::init_db(&db_path_str)
            .await
            .expect("Failed to initialize database");

        let manager = VoiceManager::new(VoiceRepository::new(db_path_str));
        (temp_dir, manager)
    }

    #[test]
    fn test_personal_channel_naming() {
        let name = personal_channel_name("Ulli");
        assert_eq!(name, "🔊・Talk von Ulli");
        assert!(is_personal_channel(&name));
        assert!(!is_personal_channel("General"));
        assert!(!is_personal_channel("Talk von Ulli"));
    }

    #[test]
    fn test_personal_channel_starts_private() {
        let guild = serenity::GuildId::new(100);
        let owner = serenity::UserId::new(7);
        let overwrites = personal_channel_overwrites(guild, owner);

        let owner_overwrite = overwrites
            .iter()
            .find(|o| o.kind == serenity::PermissionOverwriteType::Member(owner))
            .unwrap();
        assert!(owner_overwrite.allow.contains(serenity::Permissions::CONNECT));
        assert!(owner_overwrite
            .allow
            .contains(serenity::Permissions::VIEW_CHANNEL));

        // The default role shares the guild id and must not be able to connect
        let everyone = serenity::RoleId::new(guild.get());
        let everyone_overwrite = overwrites
            .iter()
            .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone))
            .unwrap();
        assert!(everyone_overwrite.deny.contains(serenity::Permissions::CONNECT));
        assert!(everyone_overwrite.allow.is_empty());
    }

    #[tokio::test]
    async fn test_monitored_set_round_trip() {
        let (_temp_dir, manager) = setup_manager().await;

        assert!(manager.add_monitored(1, 10).await.unwrap());
        // Adding twice changes nothing
        assert!(!manager.add_monitored(1, 10).await.unwrap());
        assert!(manager.is_monitored(1, 10).await);
        assert!(!manager.is_monitored(1, 11).await);

        assert!(manager.remove_monitored(1, 10).await.unwrap());
        assert!(!manager.is_monitored(1, 10).await);
        // Removing an unmonitored channel is harmless
        assert!(!manager.remove_monitored(1, 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_load_restores_persisted_set() {
        let (_temp_dir, manager) = setup_manager().await;
        manager.add_monitored(1, 10).await.unwrap();
        manager.add_monitored(1, 20).await.unwrap();

        // A fresh manager over the same store starts empty until loaded
        let fresh = VoiceManager::new(manager.inner.repo.clone());
        assert!(!fresh.is_monitored(1, 10).await);

        fresh.load(1).await.unwrap();
        assert!(fresh.is_monitored(1, 10).await);
        assert!(fresh.is_monitored(1, 20).await);
    }
}
