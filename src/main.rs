use anpr_server::{api, config};
use anyhow::Result;
use log::{error, info};
use std::path::PathBuf;

async fn run_app() -> Result<()> {
    // Config path from the environment, then from the first argument
    let config_path = std::env::var_os("ANPR_CONFIG")
        .or_else(|| std::env::args_os().nth(1))
        .map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting ANPR capture server");

    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Using default configuration"),
    }

    std::fs::create_dir_all(&config.storage.root)?;
    info!("Storage root: {}", config.storage.root.display());

    let http_server = api::rest::RestApi::new(&config)?;
    http_server.run().await?;

    info!("Shutting down...");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        error!("Application error: {:#}", e);
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
