#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Clone, Debug, Parser)]
#[command(
    name = "st_viewer",
    version,
    about = "Read-only JSON API over the Snow-Town ecosystem (contracts, personas, ideas)."
)]
pub struct ViewerConfig {
    /// Address to bind.
    #[arg(long, env = "ST_VIEWER_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(long, env = "ST_VIEWER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Contract store directory (JSONL logs). Defaults to ~/projects/snow-town/data.
    #[arg(long, env = "SNOW_TOWN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Persona academy directory. Defaults to ~/projects/agent-persona-academy/personas.
    #[arg(long, env = "ACADEMY_PERSONAS_DIR")]
    pub personas_dir: Option<PathBuf>,

    /// Idea pipeline database. Defaults to ~/incoming/caught_ideas.db.
    #[arg(long, env = "UM_DB_PATH")]
    pub ideas_db: Option<PathBuf>,

    /// Log filter directive (tracing-subscriber EnvFilter syntax).
    #[arg(long, env = "ST_LOG", default_value = "info")]
    pub log: String,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where each data source lives once defaults are filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePaths {
    pub data_dir: PathBuf,
    pub personas_dir: PathBuf,
    pub ideas_db: PathBuf,
}

impl ViewerConfig {
    pub fn source_paths(&self) -> SourcePaths {
        let home = home_dir();
        SourcePaths {
            data_dir: self
                .data_dir
                .clone()
                .unwrap_or_else(|| home.join("projects").join("snow-town").join("data")),
            personas_dir: self.personas_dir.clone().unwrap_or_else(|| {
                home.join("projects")
                    .join("agent-persona-academy")
                    .join("personas")
            }),
            ideas_db: self
                .ideas_db
                .clone()
                .unwrap_or_else(|| home.join("incoming").join("caught_ideas.db")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_win_over_defaults() {
        let config = ViewerConfig::parse_from([
            "st_viewer",
            "--port",
            "9100",
            "--data-dir",
            "/srv/data",
            "--ideas-db",
            "/srv/ideas.db",
        ]);
        assert_eq!(config.port, 9100);
        let paths = config.source_paths();
        assert_eq!(paths.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(paths.ideas_db, PathBuf::from("/srv/ideas.db"));
        assert!(paths.personas_dir.ends_with("agent-persona-academy/personas"));
    }
}
