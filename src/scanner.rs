//! Command source discovery.
//!
//! Walks the `commands/` tree looking for the reserved command-definition
//! file name, mirroring the directory convention
//! `commands/<root>[/<sub>[/<subsub>]]/command.json5`.

use std::path::{Path, PathBuf};

/// Reserved file name for command sources.
pub const COMMAND_FILE_NAME: &str = "command.json5";

/// Maximum directory depth below the scan root that is descended into.
const MAX_SCAN_DEPTH: usize = 2;

/// Returns every command-definition file under `root`, at most two directory
/// levels deep.
///
/// A missing or unreadable root yields an empty list. Ordering follows
/// directory-entry enumeration order and is not guaranteed to be sorted;
/// callers must not depend on it for correctness.
pub fn scan(root: &Path) -> Vec<PathBuf> {
    scan_dir(root, 0)
}

fn scan_dir(dir: &Path, depth: usize) -> Vec<PathBuf> {
    if depth > MAX_SCAN_DEPTH {
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(scan_dir(&path, depth + 1));
        } else if entry.file_name() == COMMAND_FILE_NAME {
            found.push(path);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_scan_missing_directory_is_empty() {
        assert!(scan(Path::new("/nonexistent/commands")).is_empty());
    }

    #[test]
    fn test_scan_finds_root_and_sub_commands() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("ping/command.json5"));
        touch(&tmp.path().join("config/command.json5"));
        touch(&tmp.path().join("config/set/command.json5"));

        let mut found = scan(tmp.path());
        found.sort();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| p.ends_with(COMMAND_FILE_NAME)));
    }

    #[test]
    fn test_scan_depth_limit() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a/command.json5"));
        touch(&tmp.path().join("a/b/command.json5"));
        // Three levels down is beyond the recursion limit.
        touch(&tmp.path().join("a/b/c/command.json5"));

        let found = scan(tmp.path());
        assert_eq!(found.len(), 2);
        assert!(!found.iter().any(|p| p.to_string_lossy().contains("/c/")));
    }

    #[test]
    fn test_scan_ignores_other_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("ping/command.json5"));
        touch(&tmp.path().join("ping/notes.md"));
        touch(&tmp.path().join("ping/command.json"));

        let found = scan(tmp.path());
        assert_eq!(found.len(), 1);
    }
}
