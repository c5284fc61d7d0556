//! Supervised background tasks.
//!
//! Long-running loops are registered with the supervisor by name so shutdown
//! can abort them instead of leaving detached intervals behind.

use poise::serenity_prelude as serenity;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owns the handles of all long-running background loops.
#[derive(Clone, Default)]
pub struct Supervisor {
    tasks: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and start a named background task.
    pub fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        info!(task = name, "background task started");
        self.tasks.lock().unwrap().push((name.to_string(), handle));
    }

    /// Abort all registered tasks.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for (name, handle) in tasks.drain(..) {
            info!(task = %name, "aborting background task");
            handle.abort();
        }
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start the audit log poller.
///
/// The first poll only establishes a baseline; afterwards every new entry is
/// posted to the log channel. Poll failures are logged and retried on the
/// next tick.
pub fn spawn_audit_log_poller(
    supervisor: &Supervisor,
    http: Arc<serenity::Http>,
    guild_id: u64,
    log_channel: u64,
    every: Duration,
) {
    let guild = serenity::GuildId::new(guild_id);
    let channel = serenity::ChannelId::new(log_channel);

    supervisor.spawn("audit-log-poller", async move {
        let mut interval = tokio::time::interval(every);
        let mut last_seen: Option<u64> = None;

        loop {
            interval.tick().await;

            let logs = match guild.audit_logs(&http, None, None, None, Some(25)).await {
                Ok(logs) => logs,
                Err(e) => {
                    warn!("audit log poll failed: {}", e);
                    continue;
                }
            };

            let newest = logs.entries.iter().map(|e| e.id.get()).max();
            let baseline = match last_seen {
                Some(id) => id,
                None => {
                    // First poll just records where the log currently ends
                    last_seen = newest;
                    continue;
                }
            };

            // Entries come newest first
            for entry in logs.entries.iter().rev() {
                if entry.id.get() <= baseline {
                    continue;
                }
                let notice = format!(
                    "📋 Audit-Log: {:?} von <@{}>{}",
                    entry.action,
                    entry.user_id,
                    entry
                        .reason
                        .as_deref()
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
                if let Err(e) = channel.say(&http, notice).await {
                    warn!("failed to post audit log notice: {}", e);
                }
            }

            if let Some(id) = newest {
                last_seen = Some(last_seen.unwrap_or(0).max(id));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let supervisor = Supervisor::new();
        assert!(supervisor.is_empty());

        supervisor.spawn("forever", async {
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });
        supervisor.spawn("forever-too", async {
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        });
        assert_eq!(supervisor.len(), 2);

        supervisor.shutdown();
        assert!(supervisor.is_empty());
    }
}
