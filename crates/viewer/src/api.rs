#![forbid(unsafe_code)]

//! `/api/v1/*` dispatch. Every handler returns a JSON value or an [`ApiError`].

use crate::config::SourcePaths;
use crate::ecosystem::{ContractLogs, build_snapshot};
use crate::error::ApiError;
use crate::health::health_report;
use crate::http::query_param;
use crate::nodes::node_detail;
use serde::Serialize;
use serde_json::Value;
use st_core::Timestamp;
use st_core::activity::{normalize_activity, truncate_feed};
use st_core::topology::NODE_IDS;
use st_storage::{AcademyReader, ContractStore, IdeaFilter, IdeaReader, StoreError};

pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;
pub const DEFAULT_IDEA_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

/// Source locations. Readers are opened per request and never write.
#[derive(Clone, Debug)]
pub struct ApiState {
    paths: SourcePaths,
}

impl ApiState {
    pub fn new(paths: SourcePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &SourcePaths {
        &self.paths
    }

    pub(crate) fn store(&self) -> Result<ContractStore, StoreError> {
        ContractStore::open(&self.paths.data_dir)
    }

    pub(crate) fn academy(&self) -> AcademyReader {
        AcademyReader::new(&self.paths.personas_dir)
    }

    pub(crate) fn ideas(&self) -> IdeaReader {
        IdeaReader::new(&self.paths.ideas_db)
    }

    fn logs(&self) -> Result<ContractLogs, ApiError> {
        let store = self.store()?;
        Ok(ContractLogs::load(&store)?)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

fn parse_limit(target: &str, default: usize) -> Result<usize, ApiError> {
    let Some(raw) = query_param(target, "limit") else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(ApiError::bad_request(
            "INVALID_LIMIT",
            format!("limit: expected an integer between 1 and {MAX_LIMIT} (got {raw:?})."),
            "Omit limit for the default of 50, or pass a value in range.",
        )),
    }
}

pub fn dispatch(state: &ApiState, path: &str, target: &str) -> Result<Value, ApiError> {
    let now = Timestamp::now();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["api", "v1", "ecosystem"] => to_json(&build_snapshot(&state.logs()?, now)?),
        ["api", "v1", "nodes", node_id] => {
            let logs = state.logs()?;
            match node_detail(&logs, node_id, now) {
                Some(detail) => to_json(&detail),
                None => Err(ApiError::not_found(
                    "UNKNOWN_NODE",
                    format!("Unknown node: '{node_id}'."),
                    &format!("Valid nodes: {}.", NODE_IDS.join(", ")),
                )),
            }
        }
        ["api", "v1", "health"] => to_json(&health_report(state, now)),
        ["api", "v1", "activity"] => {
            let limit = parse_limit(target, DEFAULT_ACTIVITY_LIMIT)?;
            let logs = state.logs()?;
            let feed = normalize_activity(&logs.outcomes, &logs.recommendations, &logs.patches);
            to_json(&truncate_feed(feed, Some(limit)))
        }
        ["api", "v1", "agents"] => to_json(&state.academy().list_agents()?),
        ["api", "v1", "agents", agent_id] => match state.academy().get_agent(agent_id)? {
            Some(agent) => to_json(&agent),
            None => Err(ApiError::not_found(
                "UNKNOWN_AGENT",
                format!("Agent not found: '{agent_id}'."),
                "List personas with /api/v1/agents.",
            )),
        },
        ["api", "v1", "pipeline", "ideas"] => {
            let filter = IdeaFilter {
                stage: query_param(target, "stage"),
                status: query_param(target, "status"),
                limit: parse_limit(target, DEFAULT_IDEA_LIMIT)?,
            };
            to_json(&state.ideas().list_ideas(&filter)?)
        }
        ["api", "v1", "pipeline", "ideas", raw_id] => {
            let Ok(idea_id) = raw_id.parse::<i64>() else {
                return Err(ApiError::bad_request(
                    "INVALID_IDEA_ID",
                    format!("idea id: expected an integer (got {raw_id:?})."),
                    "Use a numeric id from /api/v1/pipeline/ideas.",
                ));
            };
            match state.ideas().get_idea(idea_id)? {
                Some(idea) => to_json(&idea),
                None => Err(ApiError::not_found(
                    "UNKNOWN_IDEA",
                    format!("Idea not found: {idea_id}."),
                    "List ideas with /api/v1/pipeline/ideas.",
                )),
            }
        }
        ["api", "v1", "pipeline", "stages"] => to_json(&state.ideas().count_by_stage()?),
        _ => Err(ApiError::not_found(
            "NOT_FOUND",
            format!("No route for {path}."),
            "See /api/v1/health for a liveness check.",
        )),
    }
}
