#![forbid(unsafe_code)]

use crate::model::{ActivityEvent, EventKind};
use crate::topology::{ACADEMY, SKY_LYNX, ULTRA_MAGNUS};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Where clicking an activity event takes the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavTarget {
    IdeaDetail(String),
    NodeDetail(&'static str),
}

impl NavTarget {
    pub fn path(&self) -> String {
        match self {
            NavTarget::IdeaDetail(id) => format!("/pipeline/{id}"),
            NavTarget::NodeDetail(node_id) => format!("/nodes/{node_id}"),
        }
    }
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Integers and non-empty strings both count; anything else (null and
/// fractional numbers included) means the outcome has no idea to link to.
fn idea_ref(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => n.as_i64().map(|id| id.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

pub fn route_event(event: &ActivityEvent) -> Option<NavTarget> {
    match &event.event_type {
        EventKind::Outcome => Some(match idea_ref(event.detail.get("idea_id")) {
            Some(id) => NavTarget::IdeaDetail(id),
            None => NavTarget::NodeDetail(ULTRA_MAGNUS),
        }),
        EventKind::Recommendation => Some(NavTarget::NodeDetail(SKY_LYNX)),
        EventKind::Patch => Some(NavTarget::NodeDetail(ACADEMY)),
        EventKind::Unknown(kind) => {
            warn!(event_type = %kind, event_id = %event.id, "no route for activity event");
            None
        }
    }
}
