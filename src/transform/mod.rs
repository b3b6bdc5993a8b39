use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::db::Loader;
use crate::error::EtlResult;

pub mod log;
pub mod song;

pub use log::LogFileProcessor;
pub use song::SongFileProcessor;

/// Turns one input file into rows and hands them to the loader.
///
/// Implementations run inside the caller's transaction and must not commit.
pub trait FileProcessor {
    fn name(&self) -> &str;
    fn process(&self, loader: &mut Loader<'_>, path: &Path) -> EtlResult<()>;
}

/// Which kind of input a stage reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Song,
    Log,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Song => write!(f, "song"),
            StageKind::Log => write!(f, "log"),
        }
    }
}

pub fn create_processor(kind: StageKind) -> Box<dyn FileProcessor> {
    match kind {
        StageKind::Song => Box::new(SongFileProcessor),
        StageKind::Log => Box::new(LogFileProcessor),
    }
}
