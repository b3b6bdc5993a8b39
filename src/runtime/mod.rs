use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{ErrorPolicy, PipelineConfig, StageConfig};
use crate::db::{Database, Loader, RowCounts};
use crate::error::{EtlError, EtlResult};
use crate::io;
use crate::transform::{self, FileProcessor};

mod manifest;
pub use manifest::{FailedFile, RunManifest, StageManifest};

/// Result of loading one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Parsed, inserted and committed.
    Loaded(RowCounts),
    /// Rolled back; nothing from this file is in the database.
    Failed(EtlError),
}

impl From<EtlResult<RowCounts>> for FileOutcome {
    fn from(result: EtlResult<RowCounts>) -> Self {
        match result {
            Ok(counts) => FileOutcome::Loaded(counts),
            Err(err) => FileOutcome::Failed(err),
        }
    }
}

/// How the driver behaves while walking one stage.
#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub on_error: ErrorPolicy,
    pub show_progress: bool,
}

impl From<&PipelineConfig> for DriverOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            on_error: config.on_error,
            show_progress: config.show_progress,
        }
    }
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<RunManifest> {
    info!("Running pipeline: {}", config.name);

    let mut db = Database::open(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    if config.database.create_schema {
        db.create_schema().context("Failed to create star schema")?;
    }

    let options = DriverOptions::from(config);
    let mut manifest = RunManifest::new(config.name.clone(), db.location());

    for (stage_idx, stage) in config.stages.iter().enumerate() {
        let processor = transform::create_processor(stage.kind);
        info!(
            "[Stage {}/{}] {} ({} files)",
            stage_idx + 1,
            config.stages.len(),
            stage.name,
            processor.name()
        );
        let stage_manifest = process_data(&mut db, stage, processor.as_ref(), options)
            .with_context(|| format!("Stage '{}' failed", stage.name))?;
        manifest.add_stage(stage_manifest);
    }

    let counts = db.table_counts()?;
    info!(
        "Database contains {} songs, {} artists, {} time rows, {} users, {} songplays",
        counts.songs, counts.artists, counts.time, counts.users, counts.songplays
    );
    manifest.table_counts = Some(counts);
    db.close()?;

    if let Some(path) = &config.manifest {
        manifest.write_to_file(path)?;
        info!("Manifest written to: {}", path.display());
    }

    info!("Pipeline completed: {} commits", manifest.total_commits());
    Ok(manifest)
}

/// Discovers the stage's files and loads them one at a time, committing
/// after every file.
pub fn process_data(
    db: &mut Database,
    stage: &StageConfig,
    processor: &dyn FileProcessor,
    options: DriverOptions,
) -> Result<StageManifest> {
    let files = io::discover_files(&stage.path, &stage.pattern)?;
    let num_files = files.len();
    info!("{} files found in {}", num_files, stage.path.display());

    let mut report = StageManifest::new(
        stage.name.clone(),
        stage.kind,
        stage.path.clone(),
        num_files,
    );

    let pb = progress_bar(num_files, options.show_progress)?;

    for (i, datafile) in files.into_iter().enumerate() {
        match FileOutcome::from(load_file(db, processor, &datafile)) {
            FileOutcome::Loaded(counts) => {
                report.commits += 1;
                report.files_loaded += 1;
                report.rows.add(&counts);
                pb.suspend(|| info!("{}/{} files processed.", i + 1, num_files));
            }
            FileOutcome::Failed(err) => match options.on_error {
                ErrorPolicy::Abort => {
                    pb.abandon();
                    return Err(anyhow::Error::new(err)
                        .context(format!("Failed to process {}", datafile.display())));
                }
                ErrorPolicy::Skip => {
                    pb.suspend(|| {
                        warn!(
                            "{}/{} skipped {}: {}",
                            i + 1,
                            num_files,
                            datafile.display(),
                            err
                        )
                    });
                    report.failures.push(FailedFile {
                        path: datafile,
                        reason: err.to_string(),
                    });
                }
            },
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Stage {} loaded {}/{} files ({} rows, {} failed)",
        stage.name,
        report.files_loaded,
        num_files,
        report.rows.total(),
        report.failures.len()
    );
    Ok(report)
}

/// pending -> parsed -> inserted -> committed. Any error before the commit
/// drops the transaction, which rolls the file back.
fn load_file(
    db: &mut Database,
    processor: &dyn FileProcessor,
    path: &Path,
) -> EtlResult<RowCounts> {
    let tx = db.begin()?;
    let counts = {
        let mut loader = Loader::new(&tx);
        processor.process(&mut loader, path)?;
        loader.counts()
    };
    tx.commit()?;
    Ok(counts)
}

fn progress_bar(len: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)",
    )?);
    Ok(pb)
}
