#![forbid(unsafe_code)]

//! Terminal client for the Snow-Town read API.
//!
//! Three sources (activity, ecosystem, health) are polled on independent
//! timers. Every frame is rebuilt from the latest values through the `st_core`
//! classifiers; nothing derived is cached between frames.

pub mod client;
pub mod config;
pub mod poll;
pub mod render;

pub use client::{Fetch, FetchError, HttpFetcher};
pub use config::WatchConfig;
pub use poll::{Board, DashboardView, FetchState, RetryPolicy, Schedule, Source};
pub use render::render_dashboard;
