#![forbid(unsafe_code)]

use clap::Parser;
use st_viewer::{ApiState, ViewerConfig, serve};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    let config = ViewerConfig::parse();

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let paths = config.source_paths();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %paths.data_dir.display(),
        personas_dir = %paths.personas_dir.display(),
        ideas_db = %paths.ideas_db.display(),
        "st_viewer starting"
    );

    let listener = match TcpListener::bind((config.bind.as_str(), config.port)) {
        Ok(listener) => listener,
        Err(err) => {
            error!(bind = %config.bind, port = config.port, error = %err, "bind failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    match serve(listener, ApiState::new(paths), shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "viewer failed");
            ExitCode::FAILURE
        }
    }
}
