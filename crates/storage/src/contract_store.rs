#![forbid(unsafe_code)]

use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use st_core::contracts::{ImprovementRecommendation, OutcomeRecord, PersonaUpgradePatch};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Outcome,
    Recommendation,
    Patch,
}

impl ContractKind {
    pub const ALL: [ContractKind; 3] = [
        ContractKind::Outcome,
        ContractKind::Recommendation,
        ContractKind::Patch,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ContractKind::Outcome => "outcome_records.jsonl",
            ContractKind::Recommendation => "improvement_recommendations.jsonl",
            ContractKind::Patch => "persona_patches.jsonl",
        }
    }
}

/// Append-only contract log. Each kind lives in its own JSONL file under
/// `data_dir`; a missing file reads as an empty log.
#[derive(Clone, Debug)]
pub struct ContractStore {
    data_dir: PathBuf,
}

impl ContractStore {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(StoreError::io(&data_dir))?;
        Ok(Self { data_dir })
    }

    pub fn path(&self, kind: ContractKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// Succeeds when every log is either absent or readable.
    pub fn check(&self) -> Result<(), StoreError> {
        let meta = fs::metadata(&self.data_dir).map_err(StoreError::io(&self.data_dir))?;
        if !meta.is_dir() {
            return Err(StoreError::InvalidInput("data dir is not a directory"));
        }
        for kind in ContractKind::ALL {
            let path = self.path(kind);
            match fs::File::open(&path) {
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io(path)(err)),
            }
        }
        Ok(())
    }

    pub fn read_outcomes(&self) -> Result<Vec<OutcomeRecord>, StoreError> {
        read_jsonl(&self.path(ContractKind::Outcome))
    }

    pub fn read_recommendations(&self) -> Result<Vec<ImprovementRecommendation>, StoreError> {
        read_jsonl(&self.path(ContractKind::Recommendation))
    }

    pub fn read_patches(&self) -> Result<Vec<PersonaUpgradePatch>, StoreError> {
        read_jsonl(&self.path(ContractKind::Patch))
    }

    pub fn append_outcome(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        append_jsonl(&self.path(ContractKind::Outcome), record)
    }

    pub fn append_recommendation(
        &self,
        record: &ImprovementRecommendation,
    ) -> Result<(), StoreError> {
        append_jsonl(&self.path(ContractKind::Recommendation), record)
    }

    pub fn append_patch(&self, record: &PersonaUpgradePatch) -> Result<(), StoreError> {
        append_jsonl(&self.path(ContractKind::Patch), record)
    }
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "contract log absent; treating as empty");
            return Ok(Vec::new());
        }
        Err(err) => return Err(StoreError::io(path)(err)),
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(StoreError::io(path))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) => warn!(
                path = %path.display(),
                line = index + 1,
                error = %err,
                "skipping malformed contract record"
            ),
        }
    }
    Ok(records)
}

fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(StoreError::io(path))?;
    file.write_all(line.as_bytes()).map_err(StoreError::io(path))?;
    Ok(())
}
