#![forbid(unsafe_code)]

//! Per-render derivation of everything the topology view draws.
//!
//! Nothing here is cached: callers hand in the latest snapshot and get a fresh
//! scene back, so a new snapshot can never be paired with stale tiers.

use crate::error::ContractViolation;
use crate::flow::{EdgeFlowState, EdgeThresholds, aggregate_loop_health};
use crate::growth::{GrowthTier, TierTable};
use crate::model::{EcosystemSnapshot, HealthResponse, NodeHealth};
use crate::status::{EXPECTED_SOURCES, Severity, SourceStatus, map_status, source_dots};
use crate::topology::{NodeStyle, node_style};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub node_id: String,
    pub display_name: String,
    pub style: &'static NodeStyle,
    pub growth: GrowthTier,
    pub health: NodeHealth,
    pub severity: Severity,
    pub record_count: i64,
    pub pending_count: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub flow: EdgeFlowState,
    pub from: [f64; 3],
    pub to: [f64; 3],
}

impl SceneEdge {
    pub fn dashed(&self) -> bool {
        self.flow.dashed()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub loop_health: EdgeFlowState,
    pub cycle_count: i64,
}

pub fn derive_scene(snapshot: &EcosystemSnapshot) -> Result<Scene, ContractViolation> {
    derive_scene_with(snapshot, &TierTable::standard(), &EdgeThresholds::STANDARD)
}

pub fn derive_scene_with(
    snapshot: &EcosystemSnapshot,
    tiers: &TierTable,
    thresholds: &EdgeThresholds,
) -> Result<Scene, ContractViolation> {
    let mut nodes = Vec::with_capacity(snapshot.nodes.len());
    for node in &snapshot.nodes {
        crate::error::ensure_non_negative("pending_count", node.pending_count)?;
        nodes.push(SceneNode {
            node_id: node.node_id.clone(),
            display_name: node.display_name.clone(),
            style: node_style(&node.node_id),
            growth: tiers.classify(node.record_count)?,
            health: node.health_status,
            severity: map_status(node.health_status.as_str()),
            record_count: node.record_count,
            pending_count: node.pending_count,
        });
    }

    let mut edges = Vec::with_capacity(snapshot.edges.len());
    for edge in &snapshot.edges {
        edges.push(SceneEdge {
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
            flow: thresholds.classify(edge.recent_count)?,
            from: node_style(&edge.source).position,
            to: node_style(&edge.target).position,
        });
    }

    let loop_health = aggregate_loop_health(edges.iter().map(|edge| edge.flow));
    Ok(Scene {
        nodes,
        edges,
        loop_health,
        cycle_count: snapshot.cycle_count,
    })
}

/// Top-of-page status strip. Each part is optional so the banner still
/// renders when only some sources have answered.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthBanner {
    pub loop_health: Option<EdgeFlowState>,
    pub cycle_count: Option<i64>,
    pub overall: Option<String>,
    pub sources: Vec<SourceStatus>,
}

impl HealthBanner {
    pub fn build(snapshot: Option<&EcosystemSnapshot>, health: Option<&HealthResponse>) -> Self {
        // A snapshot with a corrupt edge has no loop health; the reported
        // value is never shown in its place.
        let loop_health = snapshot.and_then(|snapshot| {
            let recomputed = snapshot
                .edges
                .iter()
                .map(|edge| EdgeThresholds::STANDARD.classify(edge.recent_count))
                .collect::<Result<Vec<_>, _>>();
            match recomputed {
                Ok(states) => Some(aggregate_loop_health(states)),
                Err(err) => {
                    warn!(error = %err, "loop health unavailable");
                    None
                }
            }
        });
        let empty = BTreeMap::new();
        let reported = health.map(|h| &h.sources).unwrap_or(&empty);
        Self {
            loop_health,
            cycle_count: snapshot.map(|s| s.cycle_count),
            overall: health.map(|h| h.status.clone()),
            sources: source_dots(&EXPECTED_SOURCES, reported),
        }
    }
}
