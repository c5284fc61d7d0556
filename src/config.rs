//! Configuration management for Guildwarden.
//!
//! This module handles loading and validating environment variables and application settings.

use crate::error::{GuildwardenError, Result};
use crate::leveling::{LEVEL_CAP, MILESTONE_INTERVAL};
use std::collections::HashMap;
use std::env;

/// Configuration for the application, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// The guild (server) this bot manages
    pub guild_id: u64,
    /// Path to SQLite database file
    pub db_path: String,
    /// Channel for moderation/audit/ticket log output
    pub log_channel: Option<u64>,
    /// Channel for welcome messages
    pub welcome_channel: Option<u64>,
    /// Channel for level-up and milestone announcements
    pub bot_chat_channel: Option<u64>,
    /// Role allowed to claim tickets
    pub team_role: Option<u64>,
    /// Role assigned to new members on join
    pub join_role: Option<u64>,
    /// Role rewards per milestone level (level -> role id)
    pub milestone_roles: HashMap<i64, u64>,
    /// Audit-log polling interval in seconds
    pub audit_poll_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This will attempt to load a .env file if present using dotenv,
    /// then read required environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required environment variable is missing or invalid.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors - it's optional)
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| GuildwardenError::Config(
                "Missing DISCORD_TOKEN environment variable. Set it in your environment or create a .env file (never commit this file).".to_string()
            ))?;

        let guild_id = env::var("GUILD_ID")
            .map_err(|_| GuildwardenError::Config(
                "Missing GUILD_ID environment variable. Set it to the id of the guild this bot manages.".to_string()
            ))
            .and_then(|raw| Self::parse_snowflake("GUILD_ID", &raw))?;

        let db_path = Self::get_db_path()?;

        let log_channel = Self::optional_snowflake("LOG_CHANNEL")?;
        let welcome_channel = Self::optional_snowflake("WELCOME_CHANNEL")?;
        let bot_chat_channel = Self::optional_snowflake("BOT_CHAT_CHANNEL")?;
        let team_role = Self::optional_snowflake("TEAM_ROLE")?;
        let join_role = Self::optional_snowflake("JOIN_ROLE")?;

        let milestone_roles = Self::load_milestone_roles()?;

        let audit_poll_secs = match env::var("AUDIT_POLL_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                GuildwardenError::Config(format!(
                    "AUDIT_POLL_SECS is not a valid number of seconds: '{}'",
                    raw
                ))
            })?,
            Err(_) => 60,
        };

        Ok(Self {
            discord_token,
            guild_id,
            db_path,
            log_channel,
            welcome_channel,
            bot_chat_channel,
            team_role,
            join_role,
            milestone_roles,
            audit_poll_secs,
        })
    }

    /// Get the database path from environment or use default.
    fn get_db_path() -> Result<String> {
        match env::var("DB_PATH") {
            Ok(path) => Ok(path),
            Err(_) => {
                let mut path = env::current_dir()
                    .map_err(|e| GuildwardenError::Config(
                        format!("Failed to determine current directory: {}", e)
                    ))?;

                path.push("data");
                path.push("guildwarden.db");

                path.into_os_string()
                    .into_string()
                    .map_err(|os_str| GuildwardenError::Config(
                        format!("Database path contains invalid Unicode: {:?}", os_str)
                    ))
            }
        }
    }

    /// Parse a Discord snowflake id, rejecting zero and non-numeric values.
    fn parse_snowflake(name: &str, raw: &str) -> Result<u64> {
        let id = raw.trim().parse::<u64>().map_err(|_| {
            GuildwardenError::Config(format!(
                "{} is not a valid Discord id: '{}'",
                name, raw
            ))
        })?;

        if id == 0 {
            return Err(GuildwardenError::Config(format!(
                "{} must be a non-zero Discord id",
                name
            )));
        }

        Ok(id)
    }

    /// Read an optional snowflake-valued environment variable.
    fn optional_snowflake(name: &str) -> Result<Option<u64>> {
        match env::var(name) {
            Ok(raw) => Self::parse_snowflake(name, &raw).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Load `LEVEL_<n>_ROLE` variables for every milestone level up to the cap.
    ///
    /// Missing variables are fine - the leveling engine logs a warning when a
    /// milestone is reached without a configured reward role.
    fn load_milestone_roles() -> Result<HashMap<i64, u64>> {
        let mut roles = HashMap::new();
        let mut level = MILESTONE_INTERVAL;
        while level <= LEVEL_CAP {
            let name = format!("LEVEL_{}_ROLE", level);
            if let Ok(raw) = env::var(&name) {
                roles.insert(level, Self::parse_snowflake(&name, &raw)?);
            }
            level += MILESTONE_INTERVAL;
        }
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_parse_snowflake() {
        assert_eq!(
            Config::parse_snowflake("GUILD_ID", "123456789012345678").unwrap(),
            123456789012345678
        );
        assert_eq!(Config::parse_snowflake("GUILD_ID", " 42 ").unwrap(), 42);

        assert!(Config::parse_snowflake("GUILD_ID", "").is_err());
        assert!(Config::parse_snowflake("GUILD_ID", "abc").is_err());
        assert!(Config::parse_snowflake("GUILD_ID", "0").is_err());
        assert!(Config::parse_snowflake("GUILD_ID", "-5").is_err());
    }

    #[test]
    fn test_get_db_path_with_env_var() {
        // Save original value (if any)
        let original_value = env::var("DB_PATH").ok();

        // Set custom path
        let custom_path = "/custom/path/to/database.db";
        env::set_var("DB_PATH", custom_path);

        let result = Config::get_db_path();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), custom_path);

        // Restore original value
        match original_value {
            Some(val) => env::set_var("DB_PATH", val),
            None => env::remove_var("DB_PATH"),
        }
    }

    #[test]
    fn test_milestone_roles_cover_configured_levels() {
        let original = env::var("LEVEL_20_ROLE").ok();

        env::set_var("LEVEL_20_ROLE", "111111111111111111");
        let roles = Config::load_milestone_roles().unwrap();
        assert_eq!(roles.get(&20), Some(&111111111111111111));

        match original {
            Some(val) => env::set_var("LEVEL_20_ROLE", val),
            None => env::remove_var("LEVEL_20_ROLE"),
        }
    }
}
