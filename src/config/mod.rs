use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::DEFAULT_PATTERN;
use crate::transform::StageKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub database: DatabaseConfig,
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    /// Where to write the run summary, if anywhere.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub create_schema: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub kind: StageKind,
    pub path: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

/// What the driver does when a file fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failed file.
    #[default]
    Abort,
    /// Roll back the failed file, record it and continue.
    Skip,
}

fn default_true() -> bool {
    true
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "sparkify".to_string(),
            database: DatabaseConfig {
                path: PathBuf::from("sparkify.db"),
                create_schema: true,
            },
            stages: vec![
                StageConfig {
                    name: "songs".to_string(),
                    kind: StageKind::Song,
                    path: PathBuf::from("data/song_data"),
                    pattern: default_pattern(),
                },
                StageConfig {
                    name: "logs".to_string(),
                    kind: StageKind::Log,
                    path: PathBuf::from("data/log_data"),
                    pattern: default_pattern(),
                },
            ],
            on_error: ErrorPolicy::Abort,
            show_progress: true,
            manifest: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            anyhow::bail!("Pipeline '{}' has no stages", self.name);
        }

        let mut stage_names = std::collections::HashSet::new();
        for stage in &self.stages {
            if !stage_names.insert(&stage.name) {
                anyhow::bail!("Duplicate stage name: {}", stage.name);
            }
            glob::Pattern::new(&stage.pattern).with_context(|| {
                format!(
                    "Stage '{}' has an invalid file pattern: {}",
                    stage.name, stage.pattern
                )
            })?;
        }

        Ok(())
    }

    /// Points every stage of `kind` at `path`.
    pub fn override_stage_path(&mut self, kind: StageKind, path: &Path) {
        for stage in self.stages.iter_mut().filter(|s| s.kind == kind) {
            stage.path = path.to_path_buf();
        }
    }
}
