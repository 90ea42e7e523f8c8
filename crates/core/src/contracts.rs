#![forbid(unsafe_code)]

//! The three contract records flowing around the loop:
//! ultra_magnus emits outcomes, sky_lynx emits recommendations, academy emits
//! persona patches. Fields this build does not model are kept in `extra`.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Published,
    Rejected,
    Deferred,
    BuildFailed,
    FeatureBacklog,
}

impl TerminalOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalOutcome::Published => "published",
            TerminalOutcome::Rejected => "rejected",
            TerminalOutcome::Deferred => "deferred",
            TerminalOutcome::BuildFailed => "build_failed",
            TerminalOutcome::FeatureBacklog => "feature_backlog",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineTrace {
    pub stage: String,
    pub entered_at: Timestamp,
    #[serde(default)]
    pub exited_at: Option<Timestamp>,
    #[serde(default)]
    pub persona_used: Option<String>,
}

fn outcome_contract_version() -> String {
    "1.1.0".to_string()
}

fn recommendation_contract_version() -> String {
    "1.0.0".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(default = "outcome_contract_version")]
    pub contract_version: String,
    pub idea_id: i64,
    pub idea_title: String,
    pub outcome: TerminalOutcome,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub capabilities_fit: Option<String>,
    #[serde(default)]
    pub build_outcome: Option<String>,
    #[serde(default)]
    pub artifact_count: i64,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub pipeline_trace: Vec<PipelineTrace>,
    #[serde(default)]
    pub total_duration_seconds: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub idea_type: Option<String>,
    pub emitted_at: Timestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutcomeRecord {
    pub fn new(
        idea_id: i64,
        idea_title: impl Into<String>,
        outcome: TerminalOutcome,
        emitted_at: Timestamp,
    ) -> Self {
        Self {
            contract_version: outcome_contract_version(),
            idea_id,
            idea_title: idea_title.into(),
            outcome,
            overall_score: None,
            recommendation: None,
            capabilities_fit: None,
            build_outcome: None,
            artifact_count: 0,
            tech_stack: Vec::new(),
            pipeline_trace: Vec::new(),
            total_duration_seconds: 0.0,
            tags: Vec::new(),
            github_url: None,
            idea_type: None,
            emitted_at,
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBasis {
    #[serde(default)]
    pub outcome_record_ids: Vec<i64>,
    #[serde(default = "default_pattern_frequency")]
    pub pattern_frequency: i64,
    #[serde(default = "default_signal_strength")]
    pub signal_strength: f64,
    #[serde(default)]
    pub description: String,
}

fn default_pattern_frequency() -> i64 {
    1
}

fn default_signal_strength() -> f64 {
    0.5
}

impl Default for EvidenceBasis {
    fn default() -> Self {
        Self {
            outcome_record_ids: Vec::new(),
            pattern_frequency: default_pattern_frequency(),
            signal_strength: default_signal_strength(),
            description: String::new(),
        }
    }
}

fn default_target_system() -> String {
    "persona".to_string()
}

fn default_scope() -> String {
    "all_personas".to_string()
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_reversibility() -> String {
    "high".to_string()
}

fn default_recommendation_status() -> String {
    "pending".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImprovementRecommendation {
    #[serde(default = "recommendation_contract_version")]
    pub contract_version: String,
    pub recommendation_id: String,
    #[serde(default)]
    pub session_id: String,
    pub recommendation_type: String,
    #[serde(default = "default_target_system")]
    pub target_system: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggested_change: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub target_persona_ids: Vec<String>,
    #[serde(default)]
    pub target_department: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default = "default_reversibility")]
    pub reversibility: String,
    #[serde(default)]
    pub evidence: EvidenceBasis,
    #[serde(default = "default_recommendation_status")]
    pub status: String,
    pub emitted_at: Timestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImprovementRecommendation {
    pub fn new(
        recommendation_id: impl Into<String>,
        recommendation_type: impl Into<String>,
        title: impl Into<String>,
        emitted_at: Timestamp,
    ) -> Self {
        Self {
            contract_version: recommendation_contract_version(),
            recommendation_id: recommendation_id.into(),
            session_id: String::new(),
            recommendation_type: recommendation_type.into(),
            target_system: default_target_system(),
            title: title.into(),
            description: String::new(),
            suggested_change: String::new(),
            scope: default_scope(),
            target_persona_ids: Vec::new(),
            target_department: None,
            priority: default_priority(),
            impact: String::new(),
            reversibility: default_reversibility(),
            evidence: EvidenceBasis::default(),
            status: default_recommendation_status(),
            emitted_at,
            extra: Map::new(),
        }
    }
}

fn default_patch_status() -> String {
    "proposed".to_string()
}

fn default_schema_valid() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonaUpgradePatch {
    pub patch_id: String,
    pub persona_id: String,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub from_version: Option<String>,
    #[serde(default)]
    pub to_version: Option<String>,
    #[serde(default = "default_schema_valid")]
    pub schema_valid: bool,
    #[serde(default = "default_patch_status")]
    pub status: String,
    #[serde(default)]
    pub source_recommendation_ids: Vec<String>,
    pub emitted_at: Timestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonaUpgradePatch {
    pub fn new(
        patch_id: impl Into<String>,
        persona_id: impl Into<String>,
        emitted_at: Timestamp,
    ) -> Self {
        Self {
            patch_id: patch_id.into(),
            persona_id: persona_id.into(),
            rationale: None,
            from_version: None,
            to_version: None,
            schema_valid: default_schema_valid(),
            status: default_patch_status(),
            source_recommendation_ids: Vec::new(),
            emitted_at,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_keeps_unmodelled_fields() {
        let record: OutcomeRecord = serde_json::from_value(json!({
            "idea_id": 7,
            "idea_title": "Tide tables",
            "outcome": "build_failed",
            "emitted_at": "2024-05-01T09:00:00",
            "reviewer": "ops"
        }))
        .unwrap();
        assert_eq!(record.outcome, TerminalOutcome::BuildFailed);
        assert_eq!(record.contract_version, "1.1.0");
        assert_eq!(record.extra.get("reviewer"), Some(&json!("ops")));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back.get("reviewer"), Some(&json!("ops")));
    }

    #[test]
    fn recommendation_defaults_match_contract() {
        let rec: ImprovementRecommendation = serde_json::from_value(json!({
            "recommendation_id": "rec-1",
            "recommendation_type": "voice_adjustment",
            "title": "Soften tone",
            "emitted_at": "2024-05-01T09:00:00Z"
        }))
        .unwrap();
        assert_eq!(rec.status, "pending");
        assert_eq!(rec.target_system, "persona");
        assert_eq!(rec.evidence.pattern_frequency, 1);
    }
}
