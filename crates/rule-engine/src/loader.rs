//! Rule source: enumerate rule-definition files in a directory and return
//! their raw text.
//!
//! Files are returned in lexical file-name order, which fixes the engine's
//! tie-breaking order between rules. Only `.md` files are considered; other
//! files in the directory are not candidates and produce no diagnostics.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// The whole rule directory could not be read. The engine degrades this to an
/// allow decision with one diagnostic.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read rule directory '{path}': {source}")]
    DirUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One candidate rule file, read into memory.
#[derive(Debug, Clone)]
pub struct RuleFile {
    /// File name without the `.md` extension, used in diagnostics.
    pub stem: String,
    /// Full file name, used for ordering and diagnostics.
    pub file_name: String,
    pub text: String,
}

/// Enumerate and read every `.md` file in `dir`, sorted by file name.
///
/// Per-file read failures are recovered as diagnostics; only an unreadable
/// directory is an error.
pub fn load_rule_files(
    dir: &Path,
    diagnostics: &mut Vec<String>,
) -> Result<Vec<RuleFile>, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|source| SourceError::DirUnreadable {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map(|ext| ext == "md").unwrap_or(false)
        })
        .collect();
    paths.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.clone());
                files.push(RuleFile {
                    stem,
                    file_name,
                    text,
                });
            }
            Err(e) => {
                diagnostics.push(format!("failed to read rule file '{file_name}': {e}"));
            }
        }
    }

    debug!(dir = %dir.display(), count = files.len(), "loaded rule files");
    Ok(files)
}
