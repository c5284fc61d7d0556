//! Users collection accessor.

use crate::error::{GuildwardenError, Result};
use rusqlite::Row;

/// Per-user leveling progress, mirrored in the leveling cache.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProgress {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    /// Account creation, unix seconds
    pub creation_date: i64,
    /// Guild join, unix seconds
    pub join_date: i64,
    pub level: i64,
    pub xp: i64,
    pub avatar_url: String,
    pub banner_url: Option<String>,
}

fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<UserProgress> {
    Ok(UserProgress {
        user_id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        creation_date: row.get(3)?,
        join_date: row.get(4)?,
        level: row.get(5)?,
        xp: row.get(6)?,
        avatar_url: row.get(7)?,
        banner_url: row.get(8)?,
    })
}

const SELECT_COLUMNS: &str = "user_id, username, display_name, creation_date, join_date, \
                              level, xp, avatar_url, banner_url";

/// Repository for user progress records.
#[derive(Clone)]
pub struct UserRepository {
    db_path: String,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Get a user's progress record by id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProgress>> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users WHERE user_id = ?1",
                SELECT_COLUMNS
            ))?;

            let mut rows = stmt.query(rusqlite::params![user_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_progress(row)?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// Insert a fresh progress record.
    pub async fn create_user(&self, progress: UserProgress) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            conn.execute(
                "INSERT INTO users (user_id, username, display_name, creation_date, join_date,
                                    level, xp, avatar_url, banner_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    progress.user_id,
                    progress.username,
                    progress.display_name,
                    progress.creation_date,
                    progress.join_date,
                    progress.level,
                    progress.xp,
                    progress.avatar_url,
                    progress.banner_url,
                ],
            )?;
            Ok::<_, GuildwardenError>(())
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Overwrite the mutable fields of a progress record (level, xp, display identity).
    pub async fn update_user(&self, progress: UserProgress) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            conn.execute(
                "UPDATE users
                 SET username = ?2, display_name = ?3, level = ?4, xp = ?5,
                     avatar_url = ?6, banner_url = ?7
                 WHERE user_id = ?1",
                rusqlite::params![
                    progress.user_id,
                    progress.username,
                    progress.display_name,
                    progress.level,
                    progress.xp,
                    progress.avatar_url,
                    progress.banner_url,
                ],
            )?;
            Ok::<_, GuildwardenError>(())
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Top `n` users ordered by (level desc, xp desc).
    pub async fn top_users(&self, n: u32) -> Result<Vec<UserProgress>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY level DESC, xp DESC LIMIT ?1",
                SELECT_COLUMNS
            ))?;

            let rows = stmt.query_map(rusqlite::params![n], row_to_progress)?;

            let mut users = Vec::new();
            for user in rows {
                users.push(user?);
            }
            Ok(users)
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }

    /// Leaderboard placement: 1 + the number of users strictly ahead.
    ///
    /// A user is ahead when their level is higher, or equal with more xp.
    /// Returns `None` for unknown users.
    pub async fn placement(&self, user_id: &str) -> Result<Option<i64>> {
        let progress = match self.get_user(user_id).await? {
            Some(p) => p,
            None => return Ok(None),
        };

        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = super::open(&db_path)?;
            let ahead: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users
                 WHERE level > ?1 OR (level = ?1 AND xp > ?2)",
                rusqlite::params![progress.level, progress.xp],
                |row| row.get(0),
            )?;
            Ok(Some(ahead + 1))
        })
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_progress(user_id: &str, level: i64, xp: i64) -> UserProgress {
        UserProgress {
            user_id: user_id.to_string(),
            username: format!("user_{}", user_id),
            display_name: format!("User {}", user_id),
            creation_date: 1_600_000_000,
            join_date: 1_700_000_000,
            level,
            xp,
            avatar_url: String::new(),
            banner_url: None,
        }
    }

    async fn setup_test_db() -> (TempDir, UserRepository) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();

        super::super::init_db(&db_path_str)
            .await
            .expect("Failed to initialize database");

        let repo = UserRepository::new(db_path_str);
        (temp_dir, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_temp_dir, repo) = setup_test_db().await;

        let progress = test_progress("1", 3, 50);
        repo.create_user(progress.clone()).await.unwrap();

        let loaded = repo.get_user("1").await.unwrap().unwrap();
        assert_eq!(loaded, progress);

        assert!(repo.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_overwrites_mutable_fields() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.create_user(test_progress("1", 1, 0)).await.unwrap();

        let mut updated = test_progress("1", 2, 10);
        updated.display_name = "Renamed".to_string();
        repo.update_user(updated).await.unwrap();

        let loaded = repo.get_user("1").await.unwrap().unwrap();
        assert_eq!(loaded.level, 2);
        assert_eq!(loaded.xp, 10);
        assert_eq!(loaded.display_name, "Renamed");
        // Join date is immutable
        assert_eq!(loaded.join_date, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_top_users_ordering() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.create_user(test_progress("low", 1, 10)).await.unwrap();
        repo.create_user(test_progress("high", 5, 0)).await.unwrap();
        repo.create_user(test_progress("mid", 1, 90)).await.unwrap();

        let top = repo.top_users(10).await.unwrap();
        let ids: Vec<&str> = top.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);

        let top_one = repo.top_users(1).await.unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].user_id, "high");
    }

    #[tokio::test]
    async fn test_placement_orders_by_level_then_xp() {
        let (_temp_dir, repo) = setup_test_db().await;

        repo.create_user(test_progress("a", 5, 0)).await.unwrap();
        repo.create_user(test_progress("b", 3, 99)).await.unwrap();
        repo.create_user(test_progress("c", 3, 10)).await.unwrap();

        assert_eq!(repo.placement("a").await.unwrap(), Some(1));
        assert_eq!(repo.placement("b").await.unwrap(), Some(2));
        assert_eq!(repo.placement("c").await.unwrap(), Some(3));
        assert_eq!(repo.placement("missing").await.unwrap(), None);
    }
}
