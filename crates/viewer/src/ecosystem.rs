#![forbid(unsafe_code)]

//! Node and edge metrics derived from the contract logs.

use st_core::contracts::{ImprovementRecommendation, OutcomeRecord, PersonaUpgradePatch};
use st_core::flow::{EdgeThresholds, loop_health_for_edges};
use st_core::model::{EcosystemSnapshot, EdgeMetrics, NodeHealth, NodeMetrics};
use st_core::topology::{ACADEMY, SKY_LYNX, ULTRA_MAGNUS, node_style};
use st_core::{ContractViolation, Timestamp};
use st_storage::{ContractStore, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use time::Duration;

/// A node whose last record is more than this many whole days old is stale.
pub const STALE_AFTER_DAYS: i64 = 7;
/// Window for an edge's `recent_count`.
pub const RECENT_WINDOW: Duration = Duration::days(7);

/// Every contract record, loaded once per request.
#[derive(Clone, Debug, Default)]
pub struct ContractLogs {
    pub outcomes: Vec<OutcomeRecord>,
    pub recommendations: Vec<ImprovementRecommendation>,
    pub patches: Vec<PersonaUpgradePatch>,
}

impl ContractLogs {
    pub fn load(store: &ContractStore) -> Result<Self, StoreError> {
        Ok(Self {
            outcomes: store.read_outcomes()?,
            recommendations: store.read_recommendations()?,
            patches: store.read_patches()?,
        })
    }
}

pub fn node_health(
    record_count: usize,
    last_activity: Option<Timestamp>,
    now: Timestamp,
) -> NodeHealth {
    if record_count == 0 {
        return NodeHealth::Idle;
    }
    match last_activity {
        Some(last) if last.until(now).whole_days() > STALE_AFTER_DAYS => NodeHealth::Stale,
        _ => NodeHealth::Healthy,
    }
}

fn recent_count(emitted: impl Iterator<Item = Timestamp>, now: Timestamp) -> i64 {
    let cutoff = now.saturating_sub(RECENT_WINDOW);
    emitted.filter(|at| *at >= cutoff).count() as i64
}

fn count_status<'a>(statuses: impl Iterator<Item = &'a str>, wanted: &str) -> i64 {
    statuses.filter(|status| *status == wanted).count() as i64
}

fn node(
    node_id: &str,
    record_count: usize,
    pending_count: i64,
    last_activity: Option<Timestamp>,
    breakdown: BTreeMap<String, i64>,
    now: Timestamp,
) -> NodeMetrics {
    NodeMetrics {
        node_id: node_id.to_string(),
        display_name: node_style(node_id).display_name.to_string(),
        record_count: record_count as i64,
        pending_count,
        last_activity,
        health_status: node_health(record_count, last_activity, now),
        breakdown: (!breakdown.is_empty()).then_some(breakdown),
    }
}

/// Which breakdown a node reports. The ecosystem view shows backlog per
/// target system; the node page shows every target/status pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Breakdown {
    Overview,
    Detail,
}

pub fn ultra_magnus_metrics(logs: &ContractLogs, now: Timestamp) -> NodeMetrics {
    let mut breakdown = BTreeMap::new();
    for outcome in &logs.outcomes {
        *breakdown.entry(outcome.outcome.as_str().to_string()).or_insert(0) += 1;
    }
    let last = logs.outcomes.iter().map(|o| o.emitted_at).max();
    // Outcomes are terminal; nothing waits on this node.
    node(ULTRA_MAGNUS, logs.outcomes.len(), 0, last, breakdown, now)
}

pub fn sky_lynx_metrics(logs: &ContractLogs, now: Timestamp, view: Breakdown) -> NodeMetrics {
    let recs = &logs.recommendations;
    let pending = count_status(recs.iter().map(|r| r.status.as_str()), "pending");
    let mut breakdown = BTreeMap::new();
    match view {
        Breakdown::Overview => {
            for rec in recs.iter().filter(|r| r.status == "pending") {
                *breakdown
                    .entry(format!("pending_{}", rec.target_system))
                    .or_insert(0) += 1;
            }
            let applied = count_status(recs.iter().map(|r| r.status.as_str()), "applied");
            breakdown.insert("applied".to_string(), applied);
        }
        Breakdown::Detail => {
            for rec in recs {
                *breakdown
                    .entry(format!("{}_{}", rec.target_system, rec.status))
                    .or_insert(0) += 1;
            }
        }
    }
    let last = recs.iter().map(|r| r.emitted_at).max();
    node(SKY_LYNX, recs.len(), pending, last, breakdown, now)
}

pub fn academy_metrics(logs: &ContractLogs, now: Timestamp) -> NodeMetrics {
    let patches = &logs.patches;
    let statuses = || patches.iter().map(|p| p.status.as_str());
    let proposed = count_status(statuses(), "proposed");
    let mut breakdown = BTreeMap::new();
    breakdown.insert("proposed".to_string(), proposed);
    breakdown.insert("applied".to_string(), count_status(statuses(), "applied"));
    breakdown.insert("rejected".to_string(), count_status(statuses(), "rejected"));
    let last = patches.iter().map(|p| p.emitted_at).max();
    node(ACADEMY, patches.len(), proposed, last, breakdown, now)
}

pub fn edges(logs: &ContractLogs, now: Timestamp) -> Vec<EdgeMetrics> {
    let edge = |source: &str, target: &str, label: &str, total: usize, recent: i64| EdgeMetrics {
        source: source.to_string(),
        target: target.to_string(),
        label: label.to_string(),
        total_records: total as i64,
        recent_count: recent,
    };
    vec![
        edge(
            ULTRA_MAGNUS,
            SKY_LYNX,
            "OutcomeRecord",
            logs.outcomes.len(),
            recent_count(logs.outcomes.iter().map(|o| o.emitted_at), now),
        ),
        edge(
            SKY_LYNX,
            ACADEMY,
            "ImprovementRecommendation",
            logs.recommendations.len(),
            recent_count(logs.recommendations.iter().map(|r| r.emitted_at), now),
        ),
        edge(
            ACADEMY,
            ULTRA_MAGNUS,
            "PersonaUpgradePatch",
            logs.patches.len(),
            recent_count(logs.patches.iter().map(|p| p.emitted_at), now),
        ),
    ]
}

/// Completed improvement cycles: distinct recommendations that made it into
/// an applied patch.
pub fn cycle_count(logs: &ContractLogs) -> i64 {
    logs.patches
        .iter()
        .filter(|p| p.status == "applied")
        .flat_map(|p| p.source_recommendation_ids.iter())
        .collect::<BTreeSet<_>>()
        .len() as i64
}

pub fn build_snapshot(
    logs: &ContractLogs,
    now: Timestamp,
) -> Result<EcosystemSnapshot, ContractViolation> {
    let edges = edges(logs, now);
    let loop_health = loop_health_for_edges(&edges, &EdgeThresholds::STANDARD)?;
    Ok(EcosystemSnapshot {
        timestamp: now,
        cycle_count: cycle_count(logs),
        nodes: vec![
            ultra_magnus_metrics(logs, now),
            sky_lynx_metrics(logs, now, Breakdown::Overview),
            academy_metrics(logs, now),
        ],
        edges,
        loop_health,
    })
}
