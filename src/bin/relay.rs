//! `flowboard-relay`: the room relay server.

use std::env;

use clap::Parser;
use flowboard::sync::{self, RelayConfig, DEFAULT_PORT};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "flowboard-relay", version, about = "Room relay for the flowboard game")]
struct Cli {
    /// Port to listen on.
    #[arg(long, short, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FLOWBOARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("flowboard=info,warn"));

    let format = env::var("FLOWBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = RelayConfig::default()
        .with_bind_addr(cli.bind)
        .with_port(cli.port);
    sync::run(config).await?;
    Ok(())
}
