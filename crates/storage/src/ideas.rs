#![forbid(unsafe_code)]

//! Read-only view over the idea pipeline database (`caught_ideas` table).
//!
//! Older databases predate the pipeline columns (`stage`, the per-stage result
//! blobs, review fields); those read as "captured" with no results.

use crate::error::StoreError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};
use serde_json::Value;
use st_core::Timestamp;
use st_core::model::{IdeaDetail, IdeaSummary};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const DEFAULT_STAGE: &str = "captured";
const DEFAULT_STATUS: &str = "pending";
pub const MAX_IDEA_LIMIT: usize = 200;

#[derive(Clone, Debug, Default)]
pub struct IdeaFilter {
    pub stage: Option<String>,
    pub status: Option<String>,
    pub limit: usize,
}

#[derive(Clone, Debug)]
pub struct IdeaReader {
    db_path: PathBuf,
}

impl IdeaReader {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn available(&self) -> bool {
        self.db_path.is_file()
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Opens the database and runs a trivial query against the ideas table.
    pub fn probe(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM caught_ideas", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn list_ideas(&self, filter: &IdeaFilter) -> Result<Vec<IdeaSummary>, StoreError> {
        if filter.limit == 0 || filter.limit > MAX_IDEA_LIMIT {
            return Err(StoreError::InvalidInput("limit must be between 1 and 200"));
        }
        if !self.available() {
            debug!(path = %self.db_path.display(), "ideas db not found");
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let pipeline = has_pipeline_columns(&conn)?;

        let mut sql = if pipeline {
            "SELECT id, title, stage, status, caught_at, tags, evaluation_result FROM caught_ideas"
                .to_string()
        } else {
            "SELECT id, title, status, caught_at, tags FROM caught_ideas".to_string()
        };
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(stage) = filter.stage.as_deref().filter(|_| pipeline) {
            conditions.push("stage = ?");
            values.push(SqlValue::Text(stage.to_string()));
        }
        if let Some(status) = filter.status.as_deref() {
            conditions.push("status = ?");
            values.push(SqlValue::Text(status.to_string()));
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY caught_at DESC LIMIT ?");
        values.push(SqlValue::Integer(filter.limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            summary_from_row(row, pipeline)
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_idea(&self, idea_id: i64) -> Result<Option<IdeaDetail>, StoreError> {
        if !self.available() {
            return Ok(None);
        }
        let conn = self.connect()?;
        let pipeline = has_pipeline_columns(&conn)?;
        let sql = if pipeline {
            "SELECT id, title, stage, status, caught_at, tags, raw_content, source_context, \
             enrichment_result, evaluation_result, scaffolding_result, build_result, \
             review_decision, review_notes, github_url, completed_at \
             FROM caught_ideas WHERE id = ?1"
        } else {
            "SELECT id, title, status, caught_at, tags, raw_content, source_context \
             FROM caught_ideas WHERE id = ?1"
        };
        let detail = conn
            .query_row(sql, params![idea_id], |row| detail_from_row(row, pipeline))
            .optional()?;
        Ok(detail)
    }

    /// Idea counts per pipeline stage, for the funnel view.
    pub fn count_by_stage(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut counts = BTreeMap::new();
        if !self.available() {
            return Ok(counts);
        }
        let conn = self.connect()?;
        if !has_pipeline_columns(&conn)? {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM caught_ideas", [], |row| row.get(0))?;
            counts.insert(DEFAULT_STAGE.to_string(), total);
            return Ok(counts);
        }
        let mut stmt = conn.prepare(
            "SELECT COALESCE(stage, 'captured') AS stage, COUNT(*) FROM caught_ideas GROUP BY stage",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (stage, count) = row?;
            *counts.entry(stage).or_insert(0) += count;
        }
        Ok(counts)
    }
}

fn has_pipeline_columns(conn: &Connection) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare("PRAGMA table_info(caught_ideas)")?;
    let names = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    for name in names {
        if name? == "stage" {
            return Ok(true);
        }
    }
    Ok(false)
}

fn parse_json(raw: Option<String>) -> Option<Value> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(&raw).ok()
}

fn parse_tags(raw: Option<String>) -> Vec<String> {
    raw.and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: Option<String>) -> Option<Timestamp> {
    raw.and_then(|raw| Timestamp::parse(&raw).ok())
}

fn overall_score(evaluation: Option<&Value>) -> Option<f64> {
    evaluation?.get("scores")?.get("overall_score")?.as_f64()
}

fn recommendation(evaluation: Option<&Value>) -> Option<String> {
    evaluation?
        .get("recommendation")?
        .as_str()
        .map(str::to_string)
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn summary_from_row(row: &Row<'_>, pipeline: bool) -> rusqlite::Result<IdeaSummary> {
    let evaluation = if pipeline {
        parse_json(row.get("evaluation_result")?)
    } else {
        None
    };
    summary_with(row, pipeline, evaluation.as_ref())
}

fn summary_with(
    row: &Row<'_>,
    pipeline: bool,
    evaluation: Option<&Value>,
) -> rusqlite::Result<IdeaSummary> {
    let stage = if pipeline { row.get("stage")? } else { None };
    Ok(IdeaSummary {
        id: row.get("id")?,
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        stage: non_empty_or(stage, DEFAULT_STAGE),
        status: non_empty_or(row.get("status")?, DEFAULT_STATUS),
        overall_score: overall_score(evaluation),
        recommendation: recommendation(evaluation),
        caught_at: parse_timestamp(row.get("caught_at")?).unwrap_or_else(Timestamp::now),
        tags: parse_tags(row.get("tags")?),
    })
}

fn detail_from_row(row: &Row<'_>, pipeline: bool) -> rusqlite::Result<IdeaDetail> {
    let text = |name: &str| -> rusqlite::Result<Option<String>> {
        if pipeline { row.get(name) } else { Ok(None) }
    };
    let evaluation = parse_json(text("evaluation_result")?);
    Ok(IdeaDetail {
        summary: summary_with(row, pipeline, evaluation.as_ref())?,
        raw_content: row.get::<_, Option<String>>("raw_content")?.unwrap_or_default(),
        source_context: row.get("source_context")?,
        enrichment_result: parse_json(text("enrichment_result")?),
        evaluation_result: evaluation,
        scaffolding_result: parse_json(text("scaffolding_result")?),
        build_result: parse_json(text("build_result")?),
        review_decision: text("review_decision")?,
        review_notes: text("review_notes")?,
        github_url: text("github_url")?,
        completed_at: parse_timestamp(text("completed_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(test_name: &str) -> PathBuf {
        let base = std::env::temp_dir();
        let pid = std::process::id();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = base.join(format!("st_storage_{test_name}_{pid}_{nonce}"));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir.join("caught_ideas.db")
    }

    #[test]
    fn missing_db_reads_empty() {
        let reader = IdeaReader::new(temp_db("missing_db").with_file_name("absent.db"));
        assert!(!reader.available());
        let filter = IdeaFilter {
            limit: 10,
            ..IdeaFilter::default()
        };
        assert!(reader.list_ideas(&filter).expect("list").is_empty());
        assert!(reader.get_idea(1).expect("get").is_none());
        assert!(reader.count_by_stage().expect("count").is_empty());
    }

    #[test]
    fn limit_is_validated() {
        let reader = IdeaReader::new(temp_db("limit"));
        let filter = IdeaFilter {
            limit: 0,
            ..IdeaFilter::default()
        };
        assert!(matches!(
            reader.list_ideas(&filter),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn score_and_recommendation_come_from_evaluation() {
        let eval = serde_json::json!({"scores": {"overall_score": 7.5}, "recommendation": "build"});
        assert_eq!(overall_score(Some(&eval)), Some(7.5));
        assert_eq!(recommendation(Some(&eval)).as_deref(), Some("build"));
        assert_eq!(overall_score(None), None);
        assert_eq!(parse_tags(Some("not json".to_string())), Vec::<String>::new());
    }
}
