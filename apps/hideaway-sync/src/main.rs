mod cli;

use anyhow::{Context, Result};
use hideaway_config::{AppConfig, ConfigLocation};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn describe_location(location: &ConfigLocation) -> String {
    match location {
        ConfigLocation::Explicit(path) | ConfigLocation::Discovered(path) => {
            path.display().to_string()
        }
        ConfigLocation::Defaults => "<built-in defaults>".to_string(),
    }
}

fn load_cfg(args: &cli::CliArgs) -> Result<AppConfig> {
    let mut config = hideaway_config::load_config_from(&args.config)
        .with_context(|| format!("failed to load config {}", describe_location(&args.config)))?;

    if let Some(dir) = &args.output_dir {
        config.output.dir = hideaway_config::expand_path(&dir.to_string_lossy());
    }
    if args.debug_journal {
        config.output.debug_journal = true;
    }

    Ok(config)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::parse_args();
    info!("using config {}", describe_location(&args.config));

    let result = match load_cfg(&args) {
        Ok(config) => hideaway_sync_core::run_sync(&config).await,
        Err(exc) => Err(exc),
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(exc) => {
            error!("sync failed: {exc:#}");
            ExitCode::FAILURE
        }
    }
}
