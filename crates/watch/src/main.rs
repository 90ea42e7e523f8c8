#![forbid(unsafe_code)]

use clap::Parser;
use st_watch::poll::{poll_once, spawn_pollers};
use st_watch::{Board, Fetch, HttpFetcher, RetryPolicy, Schedule, WatchConfig, render_dashboard};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

const REDRAW_CHECK: Duration = Duration::from_millis(250);

fn print_frame(frame: &str, clear: bool) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    if clear {
        write!(stdout, "\x1b[2J\x1b[H")?;
    }
    stdout.write_all(frame.as_bytes())?;
    stdout.flush()
}

fn main() -> ExitCode {
    let config = WatchConfig::parse();

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.base_url,
        once = config.once,
        "st_watch starting"
    );

    let fetch: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&config.base_url, config.timeout()));
    let board = Arc::new(Board::new());
    let policy = RetryPolicy::STANDARD;

    if config.once {
        poll_once(fetch.as_ref(), &board, config.activity_limit, &policy);
        let view = board.view();
        if let Err(err) = print_frame(&render_dashboard(&view), false) {
            error!(error = %err, "write failed");
            return ExitCode::FAILURE;
        }
        return if view.any_failed() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    let schedule = Schedule {
        activity: config.activity_interval(),
        ecosystem: config.ecosystem_interval(),
        health: config.health_interval(),
        activity_limit: config.activity_limit,
        policy,
    };
    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(err) = spawn_pollers(fetch, Arc::clone(&board), schedule, shutdown) {
        error!(error = %err, "failed to start pollers");
        return ExitCode::FAILURE;
    }

    let mut drawn: Option<u64> = None;
    loop {
        let generation = board.generation();
        if drawn != Some(generation) {
            if let Err(err) = print_frame(&render_dashboard(&board.view()), true) {
                error!(error = %err, "write failed");
                return ExitCode::FAILURE;
            }
            drawn = Some(generation);
        }
        std::thread::sleep(REDRAW_CHECK);
    }
}
