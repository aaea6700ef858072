//! Package inventory scanner.
//!
//! Walks a directory tree and yields one record per directory containing a
//! package manifest. Version-control metadata, dependency caches and build
//! output directories are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::error::Result;
use crate::domain::package::MANIFEST_FILE;

/// Directory names never descended into.
const IGNORED_DIRS: [&str; 4] = ["node_modules", "bower_components", "dist", "build"];

/// A directory found to contain a package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDir {
    /// Absolute directory path.
    pub path: PathBuf,

    /// Path relative to the scanned root.
    pub relative_path: PathBuf,

    /// Names of the directory's immediate entries.
    pub entries: Vec<String>,
}

/// Recursively discover manifest-bearing directories under `root`.
///
/// An unreadable root is a fatal error; unreadable subdirectories are
/// skipped with a warning so one bad directory cannot sink the run.
pub fn scan_packages(root: &Path) -> Result<Vec<ScannedDir>> {
    let mut found = Vec::new();
    let entries = read_entry_names(root)?;
    visit(root, root, entries, &mut found);
    debug!(root = %root.display(), count = found.len(), "directory scan complete");
    Ok(found)
}

fn visit(root: &Path, dir: &Path, entries: Vec<String>, found: &mut Vec<ScannedDir>) {
    if entries.iter().any(|e| e == MANIFEST_FILE) {
        found.push(ScannedDir {
            path: dir.to_path_buf(),
            relative_path: dir.strip_prefix(root).unwrap_or(dir).to_path_buf(),
            entries: entries.clone(),
        });
    }

    for name in entries {
        if is_ignored(&name) {
            continue;
        }
        let child = dir.join(&name);
        if !child.is_dir() {
            continue;
        }
        match read_entry_names(&child) {
            Ok(child_entries) => visit(root, &child, child_entries, found),
            Err(e) => warn!(dir = %child.display(), error = %e, "skipping unreadable directory"),
        }
    }
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

fn read_entry_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Default scan root: `cwd` itself when it holds a manifest, otherwise the
/// nearest ancestor that does, otherwise `cwd` unchanged.
pub fn default_root(cwd: &Path) -> PathBuf {
    let mut candidate = Some(cwd);
    while let Some(dir) = candidate {
        if dir.join(MANIFEST_FILE).is_file() {
            return dir.to_path_buf();
        }
        candidate = dir.parent();
    }
    cwd.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"{}").unwrap();
    }

    #[test]
    fn test_finds_nested_packages() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("pkg-a")).unwrap();
        fs::create_dir_all(root.path().join("group/pkg-b")).unwrap();
        touch(&root.path().join("pkg-a/package.json"));
        touch(&root.path().join("group/pkg-b/package.json"));

        let dirs = scan_packages(root.path()).unwrap();
        let mut rels: Vec<_> = dirs
            .iter()
            .map(|d| d.relative_path.to_string_lossy().into_owned())
            .collect();
        rels.sort();
        assert_eq!(rels, vec!["group/pkg-b", "pkg-a"]);
    }

    #[test]
    fn test_root_itself_can_be_a_package() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("package.json"));

        let dirs = scan_packages(root.path()).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].relative_path, PathBuf::from(""));
        assert!(dirs[0].entries.iter().any(|e| e == "package.json"));
    }

    #[test]
    fn test_ignores_dependency_and_build_dirs() {
        let root = tempfile::tempdir().unwrap();
        for ignored in ["node_modules/dep", "dist/pkg", "build/pkg", ".hidden/pkg"] {
            fs::create_dir_all(root.path().join(ignored)).unwrap();
            touch(&root.path().join(ignored).join("package.json"));
        }
        fs::create_dir_all(root.path().join("real-pkg")).unwrap();
        touch(&root.path().join("real-pkg/package.json"));

        let dirs = scan_packages(root.path()).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].relative_path, PathBuf::from("real-pkg"));
    }

    #[test]
    fn test_entries_include_lockfiles() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("pkg")).unwrap();
        touch(&root.path().join("pkg/package.json"));
        touch(&root.path().join("pkg/package-lock.json"));

        let dirs = scan_packages(root.path()).unwrap();
        assert!(dirs[0].entries.iter().any(|e| e == "package-lock.json"));
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let missing = PathBuf::from("/definitely/not/a/real/path");
        assert!(scan_packages(&missing).is_err());
    }

    #[test]
    fn test_default_root_walks_up_to_manifest() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("package.json"));
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(default_root(&nested), root.path());
    }

    #[test]
    fn test_default_root_falls_back_to_cwd() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(default_root(&nested), nested);
    }
}
