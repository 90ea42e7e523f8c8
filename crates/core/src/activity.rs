#![forbid(unsafe_code)]

//! Merges the three contract streams into one newest-first activity feed.

use crate::contracts::{ImprovementRecommendation, OutcomeRecord, PersonaUpgradePatch};
use crate::model::{ActivityEvent, EventKind};
use crate::topology::{ACADEMY, SKY_LYNX, ULTRA_MAGNUS};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Serializes a record and drops the keys promoted to common event fields.
/// Everything else lands in `detail` untouched.
fn native_fields<T: Serialize>(record: &T, promoted: &[&str]) -> Map<String, Value> {
    let mut fields = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(err) => {
            warn!(error = %err, "activity record could not be serialized; detail left empty");
            Map::new()
        }
    };
    for key in promoted {
        fields.remove(*key);
    }
    fields
}

fn outcome_event(record: &OutcomeRecord) -> ActivityEvent {
    ActivityEvent {
        event_type: EventKind::Outcome,
        id: record.idea_id.to_string(),
        title: record.idea_title.clone(),
        status: record.outcome.as_str().to_string(),
        node_id: ULTRA_MAGNUS.to_string(),
        timestamp: record.emitted_at,
        detail: native_fields(record, &["idea_title", "outcome", "emitted_at"]),
    }
}

fn recommendation_event(record: &ImprovementRecommendation) -> ActivityEvent {
    ActivityEvent {
        event_type: EventKind::Recommendation,
        id: record.recommendation_id.clone(),
        title: record.title.clone(),
        status: record.status.clone(),
        node_id: SKY_LYNX.to_string(),
        timestamp: record.emitted_at,
        detail: native_fields(
            record,
            &["recommendation_id", "title", "status", "emitted_at"],
        ),
    }
}

fn patch_event(record: &PersonaUpgradePatch) -> ActivityEvent {
    ActivityEvent {
        event_type: EventKind::Patch,
        id: record.patch_id.clone(),
        title: format!("Patch for {}", record.persona_id),
        status: record.status.clone(),
        node_id: ACADEMY.to_string(),
        timestamp: record.emitted_at,
        detail: native_fields(record, &["patch_id", "status", "emitted_at"]),
    }
}

/// Newest first. Equal timestamps keep source order: outcomes, then
/// recommendations, then patches, each in input order.
pub fn normalize_activity(
    outcomes: &[OutcomeRecord],
    recommendations: &[ImprovementRecommendation],
    patches: &[PersonaUpgradePatch],
) -> Vec<ActivityEvent> {
    let mut events = Vec::with_capacity(outcomes.len() + recommendations.len() + patches.len());
    events.extend(outcomes.iter().map(outcome_event));
    events.extend(recommendations.iter().map(recommendation_event));
    events.extend(patches.iter().map(patch_event));
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
}

/// Caps an already sorted feed. `None` keeps everything.
pub fn truncate_feed(
    mut events: Vec<ActivityEvent>,
    max_items: Option<usize>,
) -> Vec<ActivityEvent> {
    if let Some(max_items) = max_items {
        events.truncate(max_items);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::TerminalOutcome;
    use crate::timestamp::Timestamp;
    use serde_json::json;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_seconds(1_700_000_000 + secs)
    }

    #[test]
    fn merges_sources_newest_first() {
        let outcomes = vec![OutcomeRecord::new(1, "Kite", TerminalOutcome::Published, at(10))];
        let recs = vec![ImprovementRecommendation::new("rec-1", "voice", "Tune voice", at(30))];
        let patches = vec![PersonaUpgradePatch::new("p-1", "ada", at(20))];

        let feed = normalize_activity(&outcomes, &recs, &patches);
        let kinds: Vec<_> = feed.iter().map(|e| e.event_type.clone()).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Recommendation, EventKind::Patch, EventKind::Outcome]
        );
        assert_eq!(feed[0].node_id, SKY_LYNX);
        assert_eq!(feed[1].title, "Patch for ada");
        assert_eq!(feed[2].id, "1");
        assert_eq!(feed[2].status, "published");
    }

    #[test]
    fn truncation_happens_after_sorting() {
        let outcomes = vec![
            OutcomeRecord::new(1, "old", TerminalOutcome::Rejected, at(1)),
            OutcomeRecord::new(2, "newest", TerminalOutcome::Published, at(50)),
        ];
        let recs = vec![ImprovementRecommendation::new("rec-1", "voice", "mid", at(40))];
        let patches = vec![PersonaUpgradePatch::new("p-1", "ada", at(2))];

        let feed = truncate_feed(normalize_activity(&outcomes, &recs, &patches), Some(2));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].title, "newest");
        assert_eq!(feed[1].title, "mid");
        assert_eq!(truncate_feed(feed.clone(), None), feed);
    }

    #[test]
    fn ties_keep_source_order() {
        let outcomes = vec![
            OutcomeRecord::new(1, "a", TerminalOutcome::Published, at(5)),
            OutcomeRecord::new(2, "b", TerminalOutcome::Published, at(5)),
        ];
        let recs = vec![ImprovementRecommendation::new("rec-1", "voice", "c", at(5))];
        let patches = vec![PersonaUpgradePatch::new("p-1", "ada", at(5))];

        let feed = normalize_activity(&outcomes, &recs, &patches);
        let ids: Vec<_> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "rec-1", "p-1"]);
    }

    #[test]
    fn detail_keeps_native_fields() {
        let mut outcome = OutcomeRecord::new(42, "Kite", TerminalOutcome::BuildFailed, at(0));
        outcome.tags = vec!["cli".to_string()];
        outcome.extra.insert("reviewer".to_string(), json!("ops"));
        let mut patch = PersonaUpgradePatch::new("p-9", "ada", at(1));
        patch.source_recommendation_ids = vec!["rec-3".to_string()];

        let feed = normalize_activity(&[outcome], &[], &[patch]);
        let patch_event = &feed[0];
        assert_eq!(patch_event.detail.get("persona_id"), Some(&json!("ada")));
        assert_eq!(
            patch_event.detail.get("source_recommendation_ids"),
            Some(&json!(["rec-3"]))
        );
        assert!(patch_event.detail.get("patch_id").is_none());

        let outcome_event = &feed[1];
        assert_eq!(outcome_event.detail.get("idea_id"), Some(&json!(42)));
        assert_eq!(outcome_event.detail.get("tags"), Some(&json!(["cli"])));
        assert_eq!(outcome_event.detail.get("reviewer"), Some(&json!("ops")));
        assert!(outcome_event.detail.get("idea_title").is_none());
    }
}
