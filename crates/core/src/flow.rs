#![forbid(unsafe_code)]

use crate::error::{ContractViolation, ensure_non_negative};
use crate::model::EdgeMetrics;
use serde::{Deserialize, Serialize};

/// Flow state of one edge, or of the whole loop. Ordered weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeFlowState {
    Idle,
    Partial,
    Flowing,
}

impl EdgeFlowState {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeFlowState::Idle => "idle",
            EdgeFlowState::Partial => "partial",
            EdgeFlowState::Flowing => "flowing",
        }
    }

    /// Idle edges are drawn dashed; the others solid.
    pub fn dashed(self) -> bool {
        matches!(self, EdgeFlowState::Idle)
    }
}

/// Recent-activity count at which an edge stops being idle.
pub const EDGE_PARTIAL_MIN: i64 = 1;
/// Recent-activity count at which an edge counts as flowing.
pub const EDGE_FLOWING_MIN: i64 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeThresholds {
    low: i64,
    high: i64,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl EdgeThresholds {
    pub const STANDARD: EdgeThresholds = EdgeThresholds {
        low: EDGE_PARTIAL_MIN,
        high: EDGE_FLOWING_MIN,
    };

    pub fn try_new(low: i64, high: i64) -> Result<Self, ContractViolation> {
        if low < 1 || high <= low {
            return Err(ContractViolation::InvalidEdgeThresholds { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn classify(&self, recent_count: i64) -> Result<EdgeFlowState, ContractViolation> {
        ensure_non_negative("recent_count", recent_count)?;
        Ok(if recent_count >= self.high {
            EdgeFlowState::Flowing
        } else if recent_count >= self.low {
            EdgeFlowState::Partial
        } else {
            EdgeFlowState::Idle
        })
    }
}

pub fn classify_edge_state(recent_count: i64) -> Result<EdgeFlowState, ContractViolation> {
    EdgeThresholds::STANDARD.classify(recent_count)
}

/// Worst-case rollup: flowing only if every edge flows, idle only if every
/// edge is idle, partial otherwise. No edges at all means no observed flow.
pub fn aggregate_loop_health<I>(states: I) -> EdgeFlowState
where
    I: IntoIterator<Item = EdgeFlowState>,
{
    let mut any = false;
    let mut all_flowing = true;
    let mut all_idle = true;
    for state in states {
        any = true;
        all_flowing &= state == EdgeFlowState::Flowing;
        all_idle &= state == EdgeFlowState::Idle;
    }
    if !any || all_idle {
        EdgeFlowState::Idle
    } else if all_flowing {
        EdgeFlowState::Flowing
    } else {
        EdgeFlowState::Partial
    }
}

pub fn loop_health_for_edges(
    edges: &[EdgeMetrics],
    thresholds: &EdgeThresholds,
) -> Result<EdgeFlowState, ContractViolation> {
    let states = edges
        .iter()
        .map(|edge| thresholds.classify(edge.recent_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aggregate_loop_health(states))
}
