//! Guildwarden library.
//!
//! This library provides the core functionality for the Guildwarden Discord
//! bot: leveling, giveaways, ephemeral voice channels, tickets, moderation
//! and the command/event plumbing that ties them together.

pub mod bot;
pub mod cache;
pub mod commands;
pub mod config;
pub mod counter;
pub mod error;
pub mod events;
pub mod giveaways;
pub mod leveling;
pub mod moderation;
pub mod registry;
pub mod roleplay;
pub mod store;
pub mod tasks;
pub mod tickets;
pub mod types;
pub mod utils;
pub mod voice;

pub use config::Config;
pub use error::{GuildwardenError, Result};
