//! `TechFlow` mock server -- in-memory stand-in for the REST API.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:8080
//! cargo run --bin techflow-mock
//!
//! # Point the client at it
//! techflow --base-url http://127.0.0.1:8080/v1 register --name Ana \
//!     --email ana@example.com --password secret
//! ```

use std::sync::Arc;

use clap::Parser;
use techflow_mock::config::{MockCliArgs, MockConfig};
use techflow_mock::server::{self, MockState};
use techflow_mock::store::MockStore;

#[tokio::main]
async fn main() {
    let cli = MockCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match MockConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    tracing::info!(addr = %config.bind_addr, "starting techflow mock server");

    let store = MockStore::with_page_size(config.default_page_size);
    let state = Arc::new(MockState::with_store(store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "mock server listening on /v1");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "mock server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start mock server");
            std::process::exit(1);
        }
    }
}
