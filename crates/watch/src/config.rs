#![forbid(unsafe_code)]

use clap::Parser;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Clone, Debug, Parser)]
#[command(
    name = "st_watch",
    version,
    about = "Polls the Snow-Town read API and renders the ecosystem as terminal tables."
)]
pub struct WatchConfig {
    /// Base URL of a running st_viewer.
    #[arg(long, env = "ST_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "ST_ACTIVITY_INTERVAL_S", default_value_t = 15)]
    pub activity_interval_s: u64,

    #[arg(long, env = "ST_ECOSYSTEM_INTERVAL_S", default_value_t = 30)]
    pub ecosystem_interval_s: u64,

    #[arg(long, env = "ST_HEALTH_INTERVAL_S", default_value_t = 30)]
    pub health_interval_s: u64,

    /// Number of activity events requested per poll (1..=200).
    #[arg(
        long,
        env = "ST_ACTIVITY_LIMIT",
        default_value_t = 50,
        value_parser = clap::value_parser!(u16).range(1..=200)
    )]
    pub activity_limit: u16,

    /// Per-request timeout in seconds.
    #[arg(long, env = "ST_TIMEOUT_S", default_value_t = 10)]
    pub timeout_s: u64,

    /// Poll every source once, print the tables, exit.
    #[arg(long)]
    pub once: bool,

    /// Log filter directive (tracing-subscriber EnvFilter syntax).
    #[arg(long, env = "ST_LOG", default_value = "warn")]
    pub log: String,
}

impl WatchConfig {
    /// Zero intervals are clamped to one second so a typo cannot spin a thread.
    pub fn activity_interval(&self) -> Duration {
        Duration::from_secs(self.activity_interval_s.max(1))
    }

    pub fn ecosystem_interval(&self) -> Duration {
        Duration::from_secs(self.ecosystem_interval_s.max(1))
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_s.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s.max(1))
    }
}
