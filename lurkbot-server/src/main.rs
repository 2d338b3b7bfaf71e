// lurkbot-server/src/main.rs

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use lurkbot_core::Config;
use lurkbot_core::platforms::discord::ChannelAnnouncer;
use lurkbot_core::platforms::twitch_helix::{AppCredentialStore, HelixClient};
use lurkbot_core::tasks::StreamWatcher;

#[derive(Parser, Debug, Clone)]
#[command(name = "lurkbot")]
#[command(author, version, about = "Announces watched Twitch streamers in a Discord channel")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("lurkbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    info!("lurkbot starting. config={}", args.config.display());

    let config = Config::load(&args.config)?;
    info!(
        "watching {} account(s), polling every {}s",
        config.watchlist.len(),
        config.poll_interval_secs
    );

    let store = AppCredentialStore::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.token_state_file.clone(),
    )?;
    let helix = HelixClient::new(config.client_id.clone())?;
    let announcer = ChannelAnnouncer::new(config.discord_token.clone(), config.channel_id)?;

    let watcher = StreamWatcher::new(&config, store, helix, Box::new(announcer));

    tokio::select! {
        res = watcher.run() => {
            if let Err(e) = res {
                error!("stream watcher stopped: {e:?}");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
        }
    }
    Ok(())
}
