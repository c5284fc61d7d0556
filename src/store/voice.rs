//! VoiceChannels collection accessor.
//!
//! Persists the set of monitored lobby channels so the voice system survives
//! restarts. Both add and remove are idempotent.

use crate::error::{GuildwardenError, Result};

/// Repository for monitored voice channels.
#[derive(Clone)]
pub struct VoiceRepository {
    db_path: String,
}

impl VoiceRepository {
    /// Create a new voice channel repository.
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Persist a monitored channel. Adding an already-monitored channel is a no-op.
    pub async fn add_channel(&self, guild_id: u64, channel_id: u64) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            conn.execute(
                "INSERT OR IGNORE INTO voice_channels (guild_id, channel_id) VALUES (?1, ?2)",
                rusqlite::params![guild_id.to_string(), channel_id.to_string()],
            )?;
            Ok::<_, GuildwardenError>(())
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Remove a monitored channel, returning whether it was present.
    ///
    /// Removing an unmonitored channel is a harmless no-op.
    pub async fn remove_channel(&self, guild_id: u64, channel_id: u64) -> Result<bool> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let removed = conn.execute(
                "DELETE FROM voice_channels WHERE guild_id = ?1 AND channel_id = ?2",
                rusqlite::params![guild_id.to_string(), channel_id.to_string()],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// All monitored channel ids for a guild.
    pub async fn all_channels(&self, guild_id: u64) -> Result<Vec<u64>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT channel_id FROM voice_channels WHERE guild_id = ?1",
            )?;
            let rows = stmt.query_map(rusqlite::params![guild_id.to_string()], |row| {
                row.get::<_, String>(0)
            })?;

            let mut channels = Vec::new();
            for channel in rows {
                if let Ok(id) = channel?.parse::<u64>() {
                    channels.push(id);
                }
            }
            Ok(channels)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_db() -> (TempDir, VoiceRepository) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();

        super::super::init_db(&db_path_str)
            .await
            .expect("Failed to initialize database");

        let repo = VoiceRepository::new(db_path_str);
        (temp_dir, repo)
    }

    #[tokio::test]
    async fn test_add_and_list_channels() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.add_channel(1, 10).await.unwrap();
        repo.add_channel(1, 20).await.unwrap();
        repo.add_channel(2, 30).await.unwrap();

        let mut channels = repo.all_channels(1).await.unwrap();
        channels.sort();
        assert_eq!(channels, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.add_channel(1, 10).await.unwrap();
        repo.add_channel(1, 10).await.unwrap();

        assert_eq!(repo.all_channels(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unmonitored_is_noop() {
        let (_temp_dir, repo) = setup_test_db().await;

        // Never added - success, no state change
        assert!(!repo.remove_channel(1, 99).await.unwrap());

        repo.add_channel(1, 10).await.unwrap();
        assert!(repo.remove_channel(1, 10).await.unwrap());
        assert!(!repo.remove_channel(1, 10).await.unwrap());
        assert!(repo.all_channels(1).await.unwrap().is_empty());
    }
}
