//! Giveaways collection accessor.
//!
//! Participant membership lives in its own table with a composite primary
//! key, so join/leave are single atomic statements instead of a
//! read-modify-write of the whole record. `delete` reports whether a row was
//! actually removed, which the scheduler uses to claim a giveaway for
//! resolution exactly once.

use crate::error::{GuildwardenError, Result};
use rusqlite::Row;

/// A persisted giveaway.
#[derive(Debug, Clone, PartialEq)]
pub struct Giveaway {
    /// Opaque short id shown to the creator
    pub id: String,
    pub guild_id: u64,
    pub channel_id: u64,
    pub prize: String,
    pub duration_ms: u64,
    /// Absolute end time, unix milliseconds
    pub end_time: i64,
    /// Participant ids in join order, no duplicates
    pub participants: Vec<String>,
    /// Announcement message carrying the join button
    pub message_id: u64,
    pub creator_id: u64,
    /// Optional embed color as given by the creator (hex string)
    pub color: Option<String>,
    pub thumbnail_url: Option<String>,
}

fn row_to_giveaway(row: &Row<'_>) -> rusqlite::Result<Giveaway> {
    let guild_id: String = row.get(1)?;
    let channel_id: String = row.get(2)?;
    let message_id: String = row.get(6)?;
    let creator_id: String = row.get(7)?;
    Ok(Giveaway {
        id: row.get(0)?,
        guild_id: guild_id.parse().unwrap_or_default(),
        channel_id: channel_id.parse().unwrap_or_default(),
        prize: row.get(3)?,
        duration_ms: row.get::<_, i64>(4)? as u64,
        end_time: row.get(5)?,
        participants: Vec::new(),
        message_id: message_id.parse().unwrap_or_default(),
        creator_id: creator_id.parse().unwrap_or_default(),
        color: row.get(8)?,
        thumbnail_url: row.get(9)?,
    })
}

/// Repository for giveaway records and their participant sets.
#[derive(Clone)]
pub struct GiveawayRepository {
    db_path: String,
}

impl GiveawayRepository {
    /// Create a new giveaway repository.
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Get a giveaway with its participants in join order.
    pub async fn get(&self, giveaway_id: &str) -> Result<Option<Giveaway>> {
        let db_path = self.db_path.clone();
        let giveaway_id = giveaway_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, guild_id, channel_id, prize, duration_ms, end_time,
                        message_id, creator_id, color, thumbnail_url
                 FROM giveaways WHERE id = ?1",
            )?;

            let mut rows = stmt.query(rusqlite::params![giveaway_id])?;
            let mut giveaway = match rows.next()? {
                Some(row) => row_to_giveaway(row)?,
                None => return Ok(None),
            };

            let mut stmt = conn.prepare(
                "SELECT user_id FROM giveaway_participants
                 WHERE giveaway_id = ?1 ORDER BY rowid",
            )?;
            let participants = stmt.query_map(rusqlite::params![giveaway_id], |row| row.get(0))?;
            for participant in participants {
                giveaway.participants.push(participant?);
            }

            Ok(Some(giveaway))
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// All stored giveaways with their participants, for timer re-arming.
    pub async fn all(&self) -> Result<Vec<Giveaway>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, guild_id, channel_id, prize, duration_ms, end_time,
                        message_id, creator_id, color, thumbnail_url
                 FROM giveaways",
            )?;
            let rows = stmt.query_map([], row_to_giveaway)?;

            let mut giveaways = Vec::new();
            for giveaway in rows {
                giveaways.push(giveaway?);
            }

            let mut stmt = conn.prepare(
                "SELECT giveaway_id, user_id FROM giveaway_participants ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (giveaway_id, user_id) = row?;
                if let Some(giveaway) = giveaways.iter_mut().find(|g| g.id == giveaway_id) {
                    giveaway.participants.push(user_id);
                }
            }

            Ok(giveaways)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// Persist a new giveaway record.
    pub async fn create(&self, giveaway: Giveaway) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            conn.execute(
                "INSERT INTO giveaways (id, guild_id, channel_id, prize, duration_ms, end_time,
                                        message_id, creator_id, color, thumbnail_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    giveaway.id,
                    giveaway.guild_id.to_string(),
                    giveaway.channel_id.to_string(),
                    giveaway.prize,
                    giveaway.duration_ms as i64,
                    giveaway.end_time,
                    giveaway.message_id.to_string(),
                    giveaway.creator_id.to_string(),
                    giveaway.color,
                    giveaway.thumbnail_url,
                ],
            )?;
            Ok::<_, GuildwardenError>(())
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Delete a giveaway, returning whether a record was actually removed.
    ///
    /// Participants go with it (cascade). The boolean is the resolution
    /// claim: of two racing resolvers, exactly one sees `true`.
    pub async fn delete(&self, giveaway_id: &str) -> Result<bool> {
        let db_path = self.db_path.clone();
        let giveaway_id = giveaway_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let deleted = conn.execute(
                "DELETE FROM giveaways WHERE id = ?1",
                rusqlite::params![giveaway_id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// Atomically add a participant.
    ///
    /// Returns `false` when the user was already a participant or the
    /// giveaway no longer exists.
    pub async fn add_participant(&self, giveaway_id: &str, user_id: &str) -> Result<bool> {
        let db_path = self.db_path.clone();
        let giveaway_id = giveaway_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO giveaway_participants (giveaway_id, user_id)
                 SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM giveaways WHERE id = ?1)",
                rusqlite::params![giveaway_id, user_id],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// Atomically remove a participant, returning whether they were present.
    pub async fn remove_participant(&self, giveaway_id: &str, user_id: &str) -> Result<bool> {
        let db_path = self.db_path.clone();
        let giveaway_id = giveaway_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let removed = conn.execute(
                "DELETE FROM giveaway_participants WHERE giveaway_id = ?1 AND user_id = ?2",
                rusqlite::params![giveaway_id, user_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_giveaway(id: &str) -> Giveaway {
        Giveaway {
            id: id.to_string(),
            guild_id: 100,
            channel_id: 200,
            prize: "Nitro".to_string(),
            duration_ms: 10_000,
            end_time: 1_700_000_010_000,
            participants: Vec::new(),
            message_id: 300,
            creator_id: 400,
            color: Some("FF69B4".to_string()),
            thumbnail_url: None,
        }
    }

    async fn setup_test_db() -> (TempDir, GiveawayRepository) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();

        super::super::init_db(&db_path_str)
            .await
            .expect("Failed to initialize database");

        let repo = GiveawayRepository::new(db_path_str);
        (temp_dir, repo)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.create(test_giveaway("abc123def")).await.unwrap();
        let loaded = repo.get("abc123def").await.unwrap().unwrap();
        assert_eq!(loaded.prize, "Nitro");
        assert_eq!(loaded.guild_id, 100);
        assert!(loaded.participants.is_empty());

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_all_returns_every_record_with_participants() {
        let (_temp_dir, repo) = setup_test_db().await;
        repo.create(test_giveaway("g1")).await.unwrap();
        repo.create(test_giveaway("g2")).await.unwrap();
        repo.add_participant("g1", "u1").await.unwrap();
        repo.add_participant("g1", "u2").await.unwrap();

        let mut all = repo.all().await.unwrap();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].participants, vec!["u1", "u2"]);
        assert!(all[1].participants.is_empty());
    }

    #[tokio::test]
    async fn test_join_is_deduplicated() {
        let (_temp_dir, repo) = setup_test_db().await;
        repo.create(test_giveaway("g1")).await.unwrap();

        assert!(repo.add_participant("g1", "u1").await.unwrap());
        // Second join of the same user changes nothing
        assert!(!repo.add_participant("g1", "u1").await.unwrap());

        let loaded = repo.get("g1").await.unwrap().unwrap();
        assert_eq!(loaded.participants, vec!["u1"]);
    }

    #[tokio::test]
    async fn test_participants_keep_join_order() {
        let (_temp_dir, repo) = setup_test_db().await;
        repo.create(test_giveaway("g1")).await.unwrap();

        repo.add_participant("g1", "zeta").await.unwrap();
        repo.add_participant("g1", "alpha").await.unwrap();
        repo.add_participant("g1", "mid").await.unwrap();

        let loaded = repo.get("g1").await.unwrap().unwrap();
        assert_eq!(loaded.participants, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_leave_non_participant_is_harmless() {
        let (_temp_dir, repo) = setup_test_db().await;
        repo.create(test_giveaway("g1")).await.unwrap();
        repo.add_participant("g1", "u1").await.unwrap();

        assert!(!repo.remove_participant("g1", "stranger").await.unwrap());
        assert!(repo.remove_participant("g1", "u1").await.unwrap());

        let loaded = repo.get("g1").await.unwrap().unwrap();
        assert!(loaded.participants.is_empty());
    }

    #[tokio::test]
    async fn test_join_missing_giveaway_is_rejected() {
        let (_temp_dir, repo) = setup_test_db().await;
        assert!(!repo.add_participant("nope", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_claims_exactly_once() {
        let (_temp_dir, repo) = setup_test_db().await;
        repo.create(test_giveaway("g1")).await.unwrap();
        repo.add_participant("g1", "u1").await.unwrap();

        assert!(repo.delete("g1").await.unwrap());
        // Second delete finds nothing - the caller must not announce again
        assert!(!repo.delete("g1").await.unwrap());
        assert!(repo.get("g1").await.unwrap().is_none());

        // Participants are gone with the record
        assert!(!repo.remove_participant("g1", "u1").await.unwrap());
    }
}
