#![forbid(unsafe_code)]

use crate::error::StoreError;
use serde::Deserialize;
use serde_json::{Map, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use st_core::model::{AgentDetail, AgentSummary};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

const PERSONA_FILE: &str = "persona.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PersonaFile {
    identity: Identity,
    voice: Voice,
    metadata: PersonaMetadata,
    frameworks: Option<Mapping>,
    case_studies: Option<Mapping>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Identity {
    name: Option<String>,
    role: String,
    background: String,
    era: Option<String>,
    notable_works: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Voice {
    tone: Vec<String>,
    phrases: Vec<String>,
    style: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PersonaMetadata {
    category: String,
    version: Option<YamlValue>,
    author: Option<YamlValue>,
    created: Option<YamlValue>,
    updated: Option<YamlValue>,
    tags: Vec<String>,
}

fn scalar_text(value: Option<&YamlValue>) -> String {
    match value {
        Some(YamlValue::String(s)) => s.clone(),
        Some(YamlValue::Number(n)) => n.to_string(),
        Some(YamlValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn mapping_keys(mapping: Option<&Mapping>) -> Vec<String> {
    mapping
        .map(|m| m.keys().map(|key| scalar_text(Some(key))).collect())
        .unwrap_or_default()
}

/// Persona ids are directory names; anything that could escape the personas
/// dir is rejected outright.
fn valid_persona_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\'])
}

#[derive(Clone, Debug)]
pub struct AcademyReader {
    personas_dir: PathBuf,
}

impl AcademyReader {
    pub fn new(personas_dir: impl AsRef<Path>) -> Self {
        Self {
            personas_dir: personas_dir.as_ref().to_path_buf(),
        }
    }

    pub fn personas_dir(&self) -> &Path {
        &self.personas_dir
    }

    /// Sorted ids of every directory holding a `persona.yaml`.
    pub fn persona_ids(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.personas_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.personas_dir)(err)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.personas_dir))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(PERSONA_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, persona_id: &str) -> Result<Option<PersonaFile>, StoreError> {
        if !valid_persona_id(persona_id) {
            return Ok(None);
        }
        let path = self.personas_dir.join(persona_id).join(PERSONA_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(path)(err)),
        };
        // An empty file parses as null; treat it as a persona with no fields.
        let parsed: Option<PersonaFile> =
            serde_yaml::from_str(&raw).map_err(|source| StoreError::Yaml { path, source })?;
        Ok(Some(parsed.unwrap_or_default()))
    }

    /// Personas whose YAML fails to parse are skipped with a warning.
    pub fn list_agents(&self) -> Result<Vec<AgentSummary>, StoreError> {
        let mut agents = Vec::new();
        for id in self.persona_ids()? {
            match self.load(&id) {
                Ok(Some(persona)) => agents.push(summary(&id, &persona)),
                Ok(None) => {}
                Err(err) => warn!(persona = %id, error = %err, "skipping unreadable persona"),
            }
        }
        Ok(agents)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<AgentDetail>, StoreError> {
        let Some(persona) = self.load(agent_id)? else {
            return Ok(None);
        };
        let mut metadata = Map::new();
        let meta = &persona.metadata;
        metadata.insert("version".into(), Value::String(scalar_text(meta.version.as_ref())));
        metadata.insert("author".into(), Value::String(scalar_text(meta.author.as_ref())));
        metadata.insert("created".into(), Value::String(scalar_text(meta.created.as_ref())));
        metadata.insert("updated".into(), Value::String(scalar_text(meta.updated.as_ref())));
        metadata.insert(
            "tags".into(),
            Value::Array(meta.tags.iter().cloned().map(Value::String).collect()),
        );

        Ok(Some(AgentDetail {
            summary: summary(agent_id, &persona),
            background: persona.identity.background.clone(),
            era: persona.identity.era.clone(),
            notable_works: persona.identity.notable_works.clone(),
            voice_tone: persona.voice.tone.clone(),
            voice_phrases: persona.voice.phrases.clone(),
            voice_style: persona.voice.style.clone(),
            frameworks: mapping_keys(persona.frameworks.as_ref()),
            case_studies: mapping_keys(persona.case_studies.as_ref()),
            metadata,
        }))
    }
}

fn summary(id: &str, persona: &PersonaFile) -> AgentSummary {
    AgentSummary {
        id: id.to_string(),
        name: persona
            .identity
            .name
            .clone()
            .unwrap_or_else(|| id.to_string()),
        role: persona.identity.role.clone(),
        category: persona.metadata.category.clone(),
        framework_count: persona.frameworks.as_ref().map_or(0, Mapping::len),
        case_study_count: persona.case_studies.as_ref().map_or(0, Mapping::len),
        status: "available".to_string(),
    }
}
