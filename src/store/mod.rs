//! Persistence layer: schema initialization and typed collection accessors.
//!
//! Each accessor follows the same repository pattern: it owns the database
//! path, opens a fresh connection per operation and runs the blocking rusqlite
//! work on `spawn_blocking`, keeping database concerns out of business logic.

pub mod giveaways;
pub mod users;
pub mod voice;

use crate::error::{GuildwardenError, Result};
use rusqlite::Connection;
use std::path::Path;

pub use giveaways::{Giveaway, GiveawayRepository};
pub use users::{UserProgress, UserRepository};
pub use voice::VoiceRepository;

/// Initialize the database schema.
///
/// Creates the necessary tables and indices if they don't already exist.
/// Also creates the parent directory if needed.
///
/// # Errors
///
/// Returns an error if the database cannot be created or initialized.
pub async fn init_db(path: &str) -> Result<()> {
    let path = path.to_string();
    tokio::task::spawn_blocking(move || init_db_sync(&path))
        .await
        .map_err(|e| GuildwardenError::Database(format!("Task join error: {}", e)))??;
    Ok(())
}

fn init_db_sync(path: &str) -> Result<()> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Per-user leveling progress - primary source of truth between cache syncs
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT NOT NULL PRIMARY KEY,
            username TEXT NOT NULL,
            display_name TEXT NOT NULL,
            creation_date INTEGER NOT NULL,
            join_date INTEGER NOT NULL,
            level INTEGER NOT NULL DEFAULT 1,
            xp INTEGER NOT NULL DEFAULT 0,
            avatar_url TEXT NOT NULL DEFAULT '',
            banner_url TEXT
        )",
        [],
    )?;

    // Rank and top-N queries sort by (level desc, xp desc)
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_rank ON users(level DESC, xp DESC)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS giveaways (
            id TEXT NOT NULL PRIMARY KEY,
            guild_id TEXT NOT NULL,
            channel_id TEXT NOT NULL,
            prize TEXT NOT NULL,
            duration_ms INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            message_id TEXT NOT NULL,
            creator_id TEXT NOT NULL,
            color TEXT,
            thumbnail_url TEXT
        )",
        [],
    )?;

    // Membership is a dedicated table so join/leave are atomic set operations;
    // rowid preserves join order.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS giveaway_participants (
            giveaway_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (giveaway_id, user_id),
            FOREIGN KEY (giveaway_id) REFERENCES giveaways(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Monitored lobby channels for the voice system
    conn.execute(
        "CREATE TABLE IF NOT EXISTS voice_channels (
            guild_id TEXT NOT NULL,
            channel_id TEXT NOT NULL,
            PRIMARY KEY (guild_id, channel_id)
        )",
        [],
    )?;

    Ok(())
}

pub(crate) fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .map_err(|e| GuildwardenError::Database(format!("Failed to connect to database: {}", e)))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    Ok(conn)
}
