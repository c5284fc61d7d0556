//! Shared framework types.

use crate::config::Config;
use crate::giveaways::GiveawayScheduler;
use crate::leveling::LevelSystem;
use crate::store::{GiveawayRepository, UserRepository, VoiceRepository};
use crate::tasks::Supervisor;
use crate::tickets::TicketTracker;
use crate::voice::VoiceManager;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Shared state passed to every command and event handler.
///
/// Cheap to clone; all subsystems share state through their own `Arc`s.
#[derive(Clone)]
pub struct Data {
    pub config: Arc<Config>,
    /// Client for outbound HTTP lookups (gif API)
    pub http_client: reqwest::Client,
    pub levels: LevelSystem,
    pub giveaways: GiveawayScheduler,
    pub voice: VoiceManager,
    pub tickets: TicketTracker,
    pub tasks: Supervisor,
}

impl Data {
    /// Wire up all subsystems over the configured store.
    pub fn new(config: Arc<Config>, http: Arc<serenity::Http>) -> Self {
        let db_path = config.db_path.clone();
        Self {
            levels: LevelSystem::new(UserRepository::new(db_path.clone()), config.clone()),
            giveaways: GiveawayScheduler::new(GiveawayRepository::new(db_path.clone()), http),
            voice: VoiceManager::new(VoiceRepository::new(db_path)),
            tickets: TicketTracker::new(),
            tasks: Supervisor::new(),
            http_client: reqwest::Client::new(),
            config,
        }
    }

    /// Stop background work and drop volatile state.
    pub async fn shutdown(&self) {
        self.tasks.shutdown();
        self.giveaways.shutdown().await;
        self.levels.clear_cache();
    }
}

/// Boxed error type used throughout commands and event handlers.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Command context alias.
pub type Context<'a> = poise::Context<'a, Data, Error>;
