#![forbid(unsafe_code)]

//! Wire records exchanged between the read API and its consumers.
//!
//! Optional values are always serialized (as `null`) so consumers can branch
//! on presence without guessing whether a key was omitted.

use crate::flow::EdgeFlowState;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    Healthy,
    Idle,
    Stale,
    #[serde(other)]
    Unknown,
}

impl NodeHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeHealth::Healthy => "healthy",
            NodeHealth::Idle => "idle",
            NodeHealth::Stale => "stale",
            NodeHealth::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub node_id: String,
    pub display_name: String,
    pub record_count: i64,
    pub pending_count: i64,
    pub last_activity: Option<Timestamp>,
    pub health_status: NodeHealth,
    pub breakdown: Option<BTreeMap<String, i64>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetrics {
    pub source: String,
    pub target: String,
    pub label: String,
    pub total_records: i64,
    pub recent_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EcosystemSnapshot {
    pub timestamp: Timestamp,
    pub cycle_count: i64,
    pub nodes: Vec<NodeMetrics>,
    pub edges: Vec<EdgeMetrics>,
    pub loop_health: EdgeFlowState,
}

/// Source kind of an activity event. Kinds this build does not know about are
/// carried through verbatim so a newer backend never breaks the feed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Outcome,
    Recommendation,
    Patch,
    Unknown(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Outcome => "outcome",
            EventKind::Recommendation => "recommendation",
            EventKind::Patch => "patch",
            EventKind::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventKind::Outcome => "Outcome",
            EventKind::Recommendation => "Recommendation",
            EventKind::Patch => "Patch",
            EventKind::Unknown(raw) => raw.as_str(),
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "outcome" => EventKind::Outcome,
            "recommendation" => EventKind::Recommendation,
            "patch" => EventKind::Patch,
            _ => EventKind::Unknown(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_type: EventKind,
    pub id: String,
    pub title: String,
    pub status: String,
    pub node_id: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub detail: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecentRecord {
    pub record_type: String,
    pub id: String,
    pub title: String,
    pub status: String,
    pub emitted_at: Timestamp,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl From<ActivityEvent> for RecentRecord {
    fn from(event: ActivityEvent) -> Self {
        Self {
            record_type: String::from(event.event_type),
            id: event.id,
            title: event.title,
            status: event.status,
            emitted_at: event.timestamp,
            extra: event.detail,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDetail {
    pub node_id: String,
    pub display_name: String,
    pub health_status: NodeHealth,
    pub last_activity: Option<Timestamp>,
    pub metrics: NodeMetrics,
    #[serde(default)]
    pub recent_records: Vec<RecentRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

fn default_agent_status() -> String {
    "available".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub role: String,
    pub category: String,
    pub framework_count: usize,
    pub case_study_count: usize,
    #[serde(default = "default_agent_status")]
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub summary: AgentSummary,
    pub background: String,
    pub era: Option<String>,
    #[serde(default)]
    pub notable_works: Vec<String>,
    #[serde(default)]
    pub voice_tone: Vec<String>,
    #[serde(default)]
    pub voice_phrases: Vec<String>,
    #[serde(default)]
    pub voice_style: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub case_studies: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdeaSummary {
    pub id: i64,
    pub title: String,
    pub stage: String,
    pub status: String,
    pub overall_score: Option<f64>,
    pub recommendation: Option<String>,
    pub caught_at: Timestamp,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdeaDetail {
    #[serde(flatten)]
    pub summary: IdeaSummary,
    pub raw_content: String,
    pub source_context: Option<String>,
    pub enrichment_result: Option<Value>,
    pub evaluation_result: Option<Value>,
    pub scaffolding_result: Option<Value>,
    pub build_result: Option<Value>,
    pub review_decision: Option<String>,
    pub review_notes: Option<String>,
    pub github_url: Option<String>,
    pub completed_at: Option<Timestamp>,
}
