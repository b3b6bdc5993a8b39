use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod io;
mod records;
mod runtime;
mod transform;

use config::{ErrorPolicy, PipelineConfig};
use transform::StageKind;

#[derive(Parser)]
#[command(name = "sparkify-etl")]
#[command(about = "Load song metadata and listening logs into a star schema", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ETL pipeline
    Run {
        /// Path to pipeline YAML file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Database file, overrides `database.path`
        #[arg(long)]
        database: Option<PathBuf>,
        /// Root of the song metadata files
        #[arg(long)]
        song_data: Option<PathBuf>,
        /// Root of the activity log files
        #[arg(long)]
        log_data: Option<PathBuf>,
        /// What to do when a file fails to load
        #[arg(long, value_enum)]
        on_error: Option<ErrorPolicy>,
        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Validate a pipeline configuration
    Validate {
        /// Path to pipeline YAML file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            database,
            song_data,
            log_data,
            on_error,
            no_progress,
        } => {
            let mut pipeline = match config {
                Some(path) => PipelineConfig::from_yaml_file(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(path) = database {
                pipeline.database.path = path;
            }
            if let Some(path) = song_data {
                pipeline.override_stage_path(StageKind::Song, &path);
            }
            if let Some(path) = log_data {
                pipeline.override_stage_path(StageKind::Log, &path);
            }
            if let Some(policy) = on_error {
                pipeline.on_error = policy;
            }
            if no_progress {
                pipeline.show_progress = false;
            }
            runtime::run_pipeline(&pipeline)?;
        }
        Commands::Validate { config } => {
            let pipeline = PipelineConfig::from_yaml_file(&config)?;
            for stage in &pipeline.stages {
                println!(
                    "  {} ({}): {} [{}]",
                    stage.name,
                    stage.kind,
                    stage.path.display(),
                    stage.pattern
                );
            }
            println!("✓ Pipeline configuration is valid");
        }
        Commands::Version => {
            println!("sparkify-etl version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
