//! Roomcast server binary.
//!
//! ```text
//! roomcast --bind 0.0.0.0:8001 --max-players 6
//! roomcast --config roomcast.json --log-level debug
//! ```
//!
//! Flags override values from the config file. `RUST_LOG` overrides
//! `--log-level`.

use std::path::PathBuf;

use clap::Parser;
use roomcast::{RoomcastServer, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast session server
#[derive(Parser, Debug)]
#[command(name = "roomcast")]
#[command(about = "Room-based multiplayer session server")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,

    /// Players allowed per room
    #[arg(long)]
    max_players: Option<usize>,

    /// Close connections idle for this many seconds
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, roomcast::RoomcastError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind_addr.clone_from(bind);
        }
        if let Some(max_players) = self.max_players {
            config.room.max_players = max_players;
        }
        if let Some(secs) = self.idle_timeout {
            config.idle_timeout_secs = Some(secs);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.server_config()?;
    tracing::info!(bind = %config.bind_addr, "Roomcast server starting");

    let server = RoomcastServer::builder().config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await?;
    Ok(())
}
