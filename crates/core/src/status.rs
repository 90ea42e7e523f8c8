#![forbid(unsafe_code)]

//! Collapses free-form status strings into the four presentation severities,
//! and per-source health strings into banner dots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Idle,
    Stale,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Idle => "idle",
            Severity::Stale => "stale",
            Severity::Error => "error",
        }
    }
}

pub const STATUS_SEVERITIES: &[(&str, Severity)] = &[
    ("flowing", Severity::Healthy),
    ("healthy", Severity::Healthy),
    ("available", Severity::Healthy),
    ("applied", Severity::Healthy),
    ("published", Severity::Healthy),
    ("approved", Severity::Healthy),
    ("partial", Severity::Stale),
    ("stale", Severity::Stale),
    ("proposed", Severity::Stale),
    ("degraded", Severity::Stale),
    ("pending", Severity::Stale),
    ("idle", Severity::Idle),
    ("rejected", Severity::Idle),
    ("deferred", Severity::Idle),
    ("feature_backlog", Severity::Idle),
    ("error", Severity::Error),
    ("build_failed", Severity::Error),
];

/// Unknown statuses fall back to `Idle`, never to `Error`.
pub fn map_status(raw: &str) -> Severity {
    let key = raw.trim().to_ascii_lowercase();
    match STATUS_SEVERITIES.iter().find(|(status, _)| *status == key) {
        Some((_, severity)) => *severity,
        None => {
            debug!(status = raw, "unmapped status; rendering as idle");
            Severity::Idle
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceDot {
    Ok,
    Degraded,
    Error,
    Unknown,
}

impl SourceDot {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceDot::Ok => "ok",
            SourceDot::Degraded => "degraded",
            SourceDot::Error => "error",
            SourceDot::Unknown => "unknown",
        }
    }
}

pub const CONTRACT_STORE: &str = "contract_store";
pub const ACADEMY_SOURCE: &str = "academy";
pub const ULTRA_MAGNUS_SOURCE: &str = "ultra_magnus";

pub const EXPECTED_SOURCES: [&str; 3] = [CONTRACT_STORE, ACADEMY_SOURCE, ULTRA_MAGNUS_SOURCE];

pub fn source_dot(raw: &str) -> SourceDot {
    let raw = raw.trim();
    if raw.starts_with("ok") {
        SourceDot::Ok
    } else if raw.contains("error") {
        SourceDot::Error
    } else {
        SourceDot::Degraded
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStatus {
    pub name: String,
    pub dot: SourceDot,
    pub detail: Option<String>,
}

/// One entry per expected source, in order, then any extra reported sources.
/// An expected source missing from the report is `Unknown`.
pub fn source_dots(expected: &[&str], sources: &BTreeMap<String, String>) -> Vec<SourceStatus> {
    let mut out: Vec<SourceStatus> = expected
        .iter()
        .map(|name| match sources.get(*name) {
            Some(raw) => SourceStatus {
                name: (*name).to_string(),
                dot: source_dot(raw),
                detail: Some(raw.clone()),
            },
            None => SourceStatus {
                name: (*name).to_string(),
                dot: SourceDot::Unknown,
                detail: None,
            },
        })
        .collect();
    for (name, raw) in sources {
        if expected.contains(&name.as_str()) {
            continue;
        }
        out.push(SourceStatus {
            name: name.clone(),
            dot: source_dot(raw),
            detail: Some(raw.clone()),
        });
    }
    out
}
