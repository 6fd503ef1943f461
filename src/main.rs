use anyhow::Result;
use botmanager::config::{env, load_config, BotManagerConfig};
use botmanager::event::{BotEvent, EventKind};
use botmanager::BotSession;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botmanager=info".into()),
        )
        .init();

    info!("Bot manager starting...");

    let path = env::config_path();
    let mut config = if Path::new(&path).exists() {
        info!(path = %path, "Loading configuration");
        load_config(&path)?
    } else {
        info!(path = %path, "No config file found, using defaults");
        BotManagerConfig::default()
    };
    config.apply_env();

    let session = BotSession::start(config)?;

    for kind in EventKind::ALL {
        session.event_bus().subscribe(
            kind,
            Arc::new(|event: &BotEvent| -> Result<()> {
                info!(
                    event = event.event_type(),
                    bot_id = event.bot_id(),
                    name = ?event.bot_name(),
                    "Lifecycle event"
                );
                Ok(())
            }),
        );
    }

    session
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;

    let stats = serde_json::to_string(&session.statistics())?;
    info!(statistics = %stats, "Final statistics");

    session.shutdown().await;
    Ok(())
}
