//! Framework wiring and the bot's run loop.

use crate::config::Config;
use crate::leveling::ActivitySource;
use crate::registry;
use crate::tasks;
use crate::types::{Data, Error};
use crate::{commands, events, store};
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Start the bot and run until the gateway stops or a shutdown signal arrives.
pub async fn run() -> Result<(), Error> {
    dotenv().ok();

    let config = Arc::new(Config::from_env()?);
    store::init_db(&config.db_path).await?;

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    // Hands a clone of the shared state out of the setup closure so the
    // shutdown path can reach the subsystems.
    let (data_tx, mut data_rx) = oneshot::channel::<Data>();

    let setup_config = config.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: registry::validated_commands(commands::all()),
            event_handler: |context, event, framework, data| {
                Box::pin(events::dispatch(context, event, framework, data))
            },
            on_error: |framework_error| Box::pin(on_error(framework_error)),
            post_command: |context| {
                Box::pin(async move {
                    if let Some(member) = context.author_member().await {
                        context
                            .data()
                            .levels
                            .award_activity(
                                context.serenity_context(),
                                &member,
                                ActivitySource::Command,
                            )
                            .await;
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |context, ready, framework| {
            Box::pin(async move {
                info!(user = %ready.user.name, "logged in");

                poise::builtins::register_in_guild(
                    context,
                    &framework.options().commands,
                    serenity::GuildId::new(setup_config.guild_id),
                )
                .await?;

                let data = Data::new(setup_config.clone(), context.http.clone());
                data.voice.load(setup_config.guild_id).await?;

                let restored = data.giveaways.restore().await?;
                if restored > 0 {
                    info!(count = restored, "restored pending giveaways");
                }

                if let Some(log_channel) = setup_config.log_channel {
                    tasks::spawn_audit_log_poller(
                        &data.tasks,
                        context.http.clone(),
                        setup_config.guild_id,
                        log_channel,
                        Duration::from_secs(setup_config.audit_poll_secs),
                    );
                }

                let _ = data_tx.send(data.clone());
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;
    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            if let Ok(data) = data_rx.try_recv() {
                data.shutdown().await;
            }
            shard_manager.shutdown_all().await;
        }
    }

    Ok(())
}

async fn on_error(framework_error: poise::FrameworkError<'_, Data, Error>) {
    match framework_error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(command = %ctx.command().name, "command failed: {}", error);
            if let Err(e) = ctx
                .say("❌ Es gab einen Fehler bei der Ausführung des Commands.")
                .await
            {
                error!("failed to report command error: {}", e);
            }
        }
        poise::FrameworkError::UnknownInteraction { interaction, .. } => {
            warn!(id = %interaction.id, "dropping unknown interaction");
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("error handler failed: {}", e);
            }
        }
    }
}
