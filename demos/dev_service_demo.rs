use clap::Parser;
use log::{error, info};
use mongodev::configuration::{Config, Topology};
use mongodev::container_management::DevServiceManager;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dev_service_demo")]
#[command(about = "Starts a managed MongoDB dev service and keeps it running until Ctrl-C")]
struct Args {
    /// Optional TOML configuration file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Start a single-node replica set instead of a standalone instance
    #[arg(long, action = clap::ArgAction::SetTrue)]
    replica_set: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let mut config = match &args.config_file {
        Some(path) => Config::from_file(path)?,
        None => Config::new(),
    };
    config.apply_env_overrides()?;
    if args.replica_set {
        config.devservice.topology = Topology::ReplicaSet;
    }

    let manager = match DevServiceManager::with_docker() {
        Ok(mgr) => {
            info!("Dev-service manager initialized successfully");
            mgr
        }
        Err(e) => {
            error!(
                "Failed to initialize dev-service manager (is docker installed and available?): {}",
                e
            );
            return Err(e.into());
        }
    };

    match manager.ensure(&config.devservice, &config.resolver).await {
        Some(result) => {
            result.apply_to(&mut config.resolver);
            info!(
                "MongoDB dev service available at {} (database '{}')",
                result.host_address, result.database_name
            );
        }
        None => {
            info!("No managed service started - using externally configured hosts (if any)");
            return Ok(());
        }
    }

    info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    if let Err(e) = manager.stop_if_running().await {
        error!("Failed to stop dev-service container: {}", e);
    }
    Ok(())
}
