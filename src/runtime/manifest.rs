use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::db::RowCounts;
use crate::transform::StageKind;

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub pipeline_name: String,
    pub database: PathBuf,
    pub stages: Vec<StageManifest>,
    /// Rows in each table once the run finished.
    pub table_counts: Option<RowCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageManifest {
    pub name: String,
    pub kind: StageKind,
    pub root: PathBuf,
    pub files_found: usize,
    pub files_loaded: usize,
    pub commits: usize,
    pub rows: RowCounts,
    pub failures: Vec<FailedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl RunManifest {
    pub fn new(pipeline_name: String, database: &Path) -> Self {
        Self {
            pipeline_name,
            database: database.to_path_buf(),
            stages: Vec::new(),
            table_counts: None,
        }
    }

    pub fn add_stage(&mut self, stage: StageManifest) {
        self.stages.push(stage);
    }

    pub fn total_commits(&self) -> usize {
        self.stages.iter().map(|s| s.commits).sum()
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl StageManifest {
    pub fn new(name: String, kind: StageKind, root: PathBuf, files_found: usize) -> Self {
        Self {
            name,
            kind,
            root,
            files_found,
            files_loaded: 0,
            commits: 0,
            rows: RowCounts::default(),
            failures: Vec::new(),
        }
    }
}
