//! Build entry maps.
//!
//! An entry map keys every discovered command source by its logical path:
//! the file's path relative to the command root with the extension stripped
//! and separators normalized, prefixed with `commands/`. Compiled artifacts
//! mirror the same layout under the dist directory with a `.json` extension,
//! so `artifact_path(dist, entry_key(root, src))` locates the output for any
//! source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::COMMANDS_DIR_NAME;

/// Extension of compiled command artifacts.
pub const ARTIFACT_EXT: &str = "json";

/// Map from logical command path to absolute source file. Rebuilt from
/// scratch on every compilation pass; never persisted.
pub type BuildEntryMap = BTreeMap<String, PathBuf>;

/// Computes the logical entry key for a command source under
/// `commands_dir`. Returns `None` when the path is not inside the command
/// root.
pub fn entry_key(commands_dir: &Path, source: &Path) -> Option<String> {
    let relative = source.strip_prefix(commands_dir).ok()?;
    let stem = relative.with_extension("");
    let mut key = String::from(COMMANDS_DIR_NAME);
    for component in stem.components() {
        key.push('/');
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(key)
}

/// Resolves the compiled artifact location for an entry key.
pub fn artifact_path(dist_dir: &Path, key: &str) -> PathBuf {
    let mut path = dist_dir.to_path_buf();
    for segment in key.split('/') {
        path.push(segment);
    }
    path.set_extension(ARTIFACT_EXT);
    path
}

/// Builds the entry map for a set of scanned sources.
pub fn build_entry_map(commands_dir: &Path, sources: &[PathBuf]) -> BuildEntryMap {
    sources
        .iter()
        .filter_map(|source| entry_key(commands_dir, source).map(|key| (key, source.clone())))
        .collect()
}
