use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{EtlError, EtlResult};

pub mod jsonl;

pub use jsonl::{read_all, JsonlReader};

pub const DEFAULT_PATTERN: &str = "*.json";

/// Recursively collect files under `root` whose file name matches `pattern`.
///
/// Returned paths are absolute and sorted, so two runs over the same tree
/// process files in the same order. A root that does not exist yields no
/// files; an unreadable entry below an existing root is an error.
pub fn discover_files(root: &Path, pattern: &str) -> EtlResult<Vec<PathBuf>> {
    let pattern = Pattern::new(pattern).map_err(|source| EtlError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    if !root.exists() {
        warn!("Input directory {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let root = std::path::absolute(root).map_err(|source| EtlError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = entry.map_err(|source| EtlError::Walk {
            root: root.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.matches_with(name, options));
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("Discovered {} files under {}", files.len(), root.display());
    Ok(files)
}
