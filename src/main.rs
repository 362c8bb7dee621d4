// Main

mod amf;
mod directory;
mod log;
mod relay;
mod rtmp;
mod server;
mod session;
mod streams;
mod utils;

use std::sync::Arc;

use directory::{HttpUserDirectory, MemoryUserDirectory, UserDirectory};
use log::{LogConfig, Logger};
use relay::{RtmpPushConnector, ServicesCatalog};
use server::{run_server, RelayConfiguration, RelayServerContext};
use streams::StreamRegistry;

/// Main function
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Logger::new(LogConfig::load_from_env());

    // Print version

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    logger.log_info(&format!("RTMP Relay ({VERSION})"));

    // Load configuration

    let config = match RelayConfiguration::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // User directory

    let directory: Arc<dyn UserDirectory> = if config.directory_url.is_empty() {
        logger.log_warning("DIRECTORY_URL not set. Every stream key will be accepted, with no restreaming destinations");

        Arc::new(MemoryUserDirectory::new_permissive())
    } else {
        Arc::new(HttpUserDirectory::new(&config.directory_url))
    };

    // Destinations catalog

    let catalog = if config.services_catalog_path.is_empty() {
        Arc::new(ServicesCatalog::empty())
    } else {
        match ServicesCatalog::load_from_file(&config.services_catalog_path) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                logger.log_warning(&format!(
                    "Could not load the destinations catalog ({}): {}",
                    config.services_catalog_path, e
                ));

                Arc::new(ServicesCatalog::empty())
            }
        }
    };

    // Run server

    run_server(
        logger,
        RelayServerContext {
            config,
            registry: Arc::new(StreamRegistry::new()),
            directory,
            connector: Arc::new(RtmpPushConnector),
            catalog,
        },
    )
    .await;

    // End of main

    Ok(())
}
