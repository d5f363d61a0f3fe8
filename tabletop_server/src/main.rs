// CLI entry point for the tabletop server.
//
// Loads an optional JSON config file, applies command-line overrides, sets
// up logging and runs the server until the process is killed.
//
// Usage:
//   tabletop-server [OPTIONS]
//     --config <FILE>             JSON config file
//     --bind <ADDR>               Bind address (default: 127.0.0.1)
//     --port <PORT>               Listen port (default: 51234)
//     --name <NAME>               Session name
//     --gm-password <PASS>        Password for GM logins
//     --player-password <PASS>    Password for player logins
//     --max-players <N>           Max connected players
//     --chunk-size <BYTES>        Asset transfer chunk size
//     --verbose                   Debug logging

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tabletop_server::{ServerConfig, ServerError, start_server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Authoritative sync server for shared tabletop sessions.
#[derive(Parser)]
#[command(name = "tabletop-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON config file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Session name shown to joining clients
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    gm_password: Option<String>,

    #[arg(long)]
    player_password: Option<String>,

    #[arg(long)]
    max_players: Option<u32>,

    /// Asset transfer chunk size in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(name) = self.name {
            config.session_name = name;
        }
        if self.gm_password.is_some() {
            config.gm_password = self.gm_password;
        }
        if self.player_password.is_some() {
            config.player_password = self.player_password;
        }
        if let Some(max) = self.max_players {
            config.max_players = max;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match start_server(config) {
        Ok((handle, addr)) => {
            info!("listening on {addr}; Ctrl+C to stop");
            handle.wait();
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("failed to start server: {e}");
            ExitCode::FAILURE
        }
    }
}
