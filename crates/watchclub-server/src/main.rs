use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use watchclub_core::config::WatchclubConfig;
use watchclub_notify::{build_sender, Notifier};
use watchclub_service::WatchclubService;

/// Shared-viewing club backend.
#[derive(Debug, Parser)]
#[command(name = "watchclub", version)]
struct Args {
    /// Config file. Falls back to WATCHCLUB_CONFIG, then ~/.watchclub/watchclub.toml.
    #[arg(long)]
    config: Option<String>,

    /// Storage URI override: `memory` or `sqlite://<path>`.
    #[arg(long)]
    storage: Option<String>,

    /// Base URL override for links in emails and calendars.
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchclub=info,watchclub_service=info,watchclub_notify=info".into()),
        )
        .init();

    let args = Args::parse();

    // config: --config > WATCHCLUB_CONFIG env > ~/.watchclub/watchclub.toml
    let config_path = args.config.clone().or_else(|| std::env::var("WATCHCLUB_CONFIG").ok());
    let mut config = WatchclubConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        WatchclubConfig::default()
    });
    if let Some(uri) = args.storage {
        config.storage.uri = uri;
    }
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }

    if let Some(path) = config.storage.uri.strip_prefix("sqlite://") {
        ensure_parent_dir(path);
    }
    let storage = watchclub_storage::open_storage(&config.storage.uri)?;
    log_storage_summary(storage.as_ref()).await;

    let sender = build_sender(&config.mail, &config.server.base_url);
    let (notifier, pool) = Notifier::start(sender, config.server.base_url.clone(), &config.notifier);

    let service = Arc::new(
        WatchclubService::new(storage, notifier, config.server.base_url.clone())
            .with_quantity_policy(config.schedule.zero_quantity),
    );
    info!(
        base_url = %config.server.base_url,
        zero_quantity = ?config.schedule.zero_quantity,
        "watchclub ready, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    pool.shutdown().await;
    let stats = service.notifier_stats();
    info!(stats = %serde_json::to_string(&stats)?, "notifier drained");
    Ok(())
}

async fn log_storage_summary(storage: &dyn watchclub_storage::Storage) {
    let users = storage.list_users().await.map(|u| u.len());
    let clubs = storage.list_clubs().await;
    match (users, clubs) {
        (Ok(users), Ok(clubs)) => {
            let started = clubs.iter().filter(|c| c.started).count();
            info!(
                backend = storage.backend(),
                users,
                clubs = clubs.len(),
                started,
                "storage opened"
            );
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!(backend = storage.backend(), error = %e, "storage summary unavailable");
        }
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
