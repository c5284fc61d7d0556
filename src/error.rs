//! Custom error types for Guildwarden.
//!
//! This module provides a centralized error handling system with specific error types
//! for different parts of the application.

use std::fmt;

/// Main error type for Guildwarden operations.
#[derive(Debug)]
pub enum GuildwardenError {
    /// Configuration errors (missing env vars, invalid values)
    Config(String),
    /// Database operation errors
    Database(String),
    /// Discord API errors
    Discord(String),
    /// Gif API errors (roleplay gif lookups)
    GifApi(String),
    /// Network/HTTP errors
    Network(String),
    /// Validation errors (bad duration strings, malformed ids, etc.)
    Validation(String),
    /// A referenced user/channel/giveaway does not exist
    NotFound(String),
    /// Generic I/O errors
    Io(std::io::Error),
}

impl fmt::Display for GuildwardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Discord(msg) => write!(f, "Discord error: {}", msg),
            Self::GifApi(msg) => write!(f, "Gif API error: {}", msg),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for GuildwardenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuildwardenError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Implement From traits for automatic error conversion
impl From<std::io::Error> for GuildwardenError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<rusqlite::Error> for GuildwardenError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for GuildwardenError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<poise::serenity_prelude::Error> for GuildwardenError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        Self::Discord(err.to_string())
    }
}

impl From<std::env::VarError> for GuildwardenError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GuildwardenError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Database(format!("Task join error: {}", err))
    }
}

/// Result type alias for Guildwarden operations.
pub type Result<T> = std::result::Result<T, GuildwardenError>;
