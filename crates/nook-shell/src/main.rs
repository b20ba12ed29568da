//! nook: inspect a profile's offline store from the terminal.
//!
//! Opens the profile named by `$NOOK_DATA_DIR/config.toml` exactly the way a
//! client window does, then runs one subcommand.

mod commands;
mod config;

use std::sync::Arc;

use nook_store::{Status, Store, WindowChannel};
use tracing::{info, warn};

use crate::commands::Command;
use crate::config::ShellConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = ShellConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_directive().parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let arg = std::env::args().nth(1);
    let command = Command::parse(arg.as_deref())?;

    // 2. Open the profile
    let data_dir = config.store.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    info!("opening profile at {:?}", data_dir);

    let channel = WindowChannel::new(config.store.broadcast_capacity);
    let store = Arc::new(Store::for_profile(config.store.clone(), channel)?);
    store.init().await;
    if store.status() != Status::Ready {
        warn!("store unavailable, results will be empty");
    }

    // 3. Run the command
    match command {
        Command::Stats => println!("{:#}", commands::stats(&store)),
        Command::Export => println!("{}", commands::export(&store)?),
        Command::Watch => commands::watch(Arc::clone(&store)).await?,
    }

    store.close();
    Ok(())
}
