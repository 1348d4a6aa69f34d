//! Fusion demo entry point.

mod app;
mod cli;

use clap::Parser;
use fusion_client::ClientConfig;
use tracing_subscriber::EnvFilter;

/// Points at a TOML config file; env vars still override its values.
const CONFIG_ENV: &str = "FUSION_CONFIG";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = load_config(args.config.as_deref())?;
    tracing::info!(base_url = %config.base_url, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, args.command))
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ClientConfig> {
    let from_env = std::env::var_os(CONFIG_ENV).map(std::path::PathBuf::from);
    let config = match path.map(std::path::Path::to_path_buf).or(from_env) {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::default(),
    };
    Ok(config.with_process_env())
}
