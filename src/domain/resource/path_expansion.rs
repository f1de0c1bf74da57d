//! Turns user supplied paths and glob patterns into manifest file lists.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::ResourceError;

/// Extensions picked up when walking a directory.
pub const FILE_EXTENSIONS: [&str; 3] = [".json", ".yaml", ".yml"];

/// Returns `pattern` itself when it names an existing path, otherwise the
/// paths it matches as a glob.
pub fn expand_if_file_pattern(pattern: &str) -> Result<Vec<String>, ResourceError> {
    if Path::new(pattern).exists() {
        return Ok(vec![pattern.to_string()]);
    }

    let paths = glob::glob(pattern).map_err(|e| ResourceError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let matches: Vec<String> = paths
        .filter_map(Result::ok)
        .map(|p| p.display().to_string())
        .collect();
    if matches.is_empty() {
        return Err(ResourceError::PathNotExist(pattern.to_string()));
    }
    Ok(matches)
}

/// Manifest files under `root`, in lexical order.
///
/// `root` itself is always included when it is a file. Inside a directory only
/// files with a recognized extension are kept, and subdirectories are entered
/// only when `recursive` is set.
pub fn expand_path(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, ResourceError> {
    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            ResourceError::io(path, io)
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.depth() > 0 && !has_manifest_extension(entry.path()) {
            debug!("Skipping {}: unrecognized extension", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FILE_EXTENSIONS.iter().any(|known| known[1..] == *ext))
}
