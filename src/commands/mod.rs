//! Discord bot commands.
//!
//! This module contains all available bot commands organized by functionality.

pub mod giveaway;
pub mod level;
pub mod moderation;
pub mod ping;
pub mod rp;
pub mod setup;
pub mod top;

use crate::types::{Data, Error};

/// All statically declared command units, in registration order.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        ping::ping(),
        level::level(),
        top::top(),
        moderation::ban(),
        moderation::mute(),
        moderation::unmute(),
        rp::rp(),
        giveaway::creategiveaway(),
        giveaway::endgiveaway(),
        setup::setup(),
    ]
}
