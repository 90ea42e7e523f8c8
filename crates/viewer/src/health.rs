#![forbid(unsafe_code)]

use crate::api::ApiState;
use st_core::Timestamp;
use st_core::model::HealthResponse;
use st_core::status::{ACADEMY_SOURCE, CONTRACT_STORE, ULTRA_MAGNUS_SOURCE};
use std::collections::BTreeMap;
use tracing::warn;

fn contract_store_status(state: &ApiState) -> String {
    let checked = state.store().and_then(|store| {
        store.check()?;
        store.read_outcomes().map(|_| ())
    });
    match checked {
        Ok(()) => "ok".to_string(),
        Err(err) => format!("error: {err}"),
    }
}

fn academy_status(state: &ApiState) -> String {
    match state.academy().list_agents() {
        Ok(agents) => format!("ok ({} personas)", agents.len()),
        Err(err) => format!("error: {err}"),
    }
}

fn ideas_status(state: &ApiState) -> String {
    let reader = state.ideas();
    if !reader.available() {
        return "unavailable (db not found)".to_string();
    }
    match reader.probe() {
        Ok(()) => "ok".to_string(),
        Err(err) => format!("error: {err}"),
    }
}

/// Probes every source. Overall status is "ok" only when every source is.
pub fn health_report(state: &ApiState, now: Timestamp) -> HealthResponse {
    let mut sources = BTreeMap::new();
    sources.insert(CONTRACT_STORE.to_string(), contract_store_status(state));
    sources.insert(ACADEMY_SOURCE.to_string(), academy_status(state));
    sources.insert(ULTRA_MAGNUS_SOURCE.to_string(), ideas_status(state));

    let all_ok = sources.values().all(|status| status.starts_with("ok"));
    if !all_ok {
        warn!(?sources, "one or more data sources degraded");
    }
    HealthResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        timestamp: now,
        sources,
    }
}
