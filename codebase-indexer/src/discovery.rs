use crate::filter::PathFilterSet;
use ignore::WalkBuilder;
use log::debug;
use log::info;
use log::warn;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// A root (or an entry under it) that could not be walked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryError {
    pub root: PathBuf,
    pub message: String,
}

/// Files found under the roots, plus per-root problems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub errors: Vec<DiscoveryError>,
}

/// Walks every root and returns the files that pass `filters`.
///
/// A missing or unreadable root is recorded in [`Discovery::errors`]; the
/// other roots are still walked. Output is sorted and de-duplicated.
pub fn discover(roots: &[PathBuf], filters: &Arc<PathFilterSet>) -> Discovery {
    let mut discovery = Discovery::default();

    for root in roots {
        if !root.is_dir() {
            warn!("Skipping root {}: not a readable directory", root.display());
            discovery.errors.push(DiscoveryError {
                root: root.clone(),
                message: "not a readable directory".to_string(),
            });
            continue;
        }
        walk_root(root, filters, &mut discovery);
    }

    discovery.files.sort();
    discovery.files.dedup();
    info!(
        "Discovered {} files under {} roots ({} errors)",
        discovery.files.len(),
        roots.len(),
        discovery.errors.len()
    );
    discovery
}

fn walk_root(root: &Path, filters: &Arc<PathFilterSet>, discovery: &mut Discovery) {
    let entry_filters = Arc::clone(filters);
    let mut builder = WalkBuilder::new(root);
    // All exclusion goes through the filter set so discovery and the
    // incremental updater agree on what is indexed.
    builder
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|ft| ft.is_dir());
            entry.depth() == 0 || !entry_filters.is_ignored(entry.path(), is_dir)
        });

    for entry in builder.build() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    discovery.files.push(entry.into_path());
                }
            }
            Err(err) => {
                debug!("Walk error under {}: {err}", root.display());
                discovery.errors.push(DiscoveryError {
                    root: root.to_path_buf(),
                    message: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create dir");
        }
        fs::write(&path, content).expect("Failed to write");
        path
    }

    fn filters(roots: &[PathBuf]) -> Arc<PathFilterSet> {
        Arc::new(PathFilterSet::new(roots, &[], true).expect("Failed to build filters"))
    }

    #[test]
    fn test_discovery_applies_filters() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = dunce::canonicalize(temp_dir.path()).expect("Failed to canonicalize");
        let lib = write(&root, "src/lib.rs", "pub fn a() {}");
        let readme = write(&root, "README.md", "# readme");
        write(&root, "target/debug/build.rs", "fn b() {}");
        write(&root, "node_modules/pkg/index.js", "module.exports = {}");
        write(&root, "assets/logo.png", "not really a png");
        write(&root, "generated/api.rs", "fn c() {}");
        write(&root, ".codescopeignore", "generated/\n");

        let roots = vec![root.clone()];
        let discovery = discover(&roots, &filters(&roots));

        let ignore_file = root.join(".codescopeignore");
        assert_eq!(discovery.files, vec![ignore_file, readme, lib]);
        assert!(discovery.errors.is_empty());
    }

    #[test]
    fn test_missing_root_is_recorded_and_others_continue() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = dunce::canonicalize(temp_dir.path()).expect("Failed to canonicalize");
        let main = write(&root, "main.go", "package main");
        let missing = root.join("does-not-exist");

        let roots = vec![missing.clone(), root.clone()];
        let discovery = discover(&roots, &filters(&roots));

        assert_eq!(discovery.files, vec![main]);
        assert_eq!(discovery.errors.len(), 1);
        assert_eq!(discovery.errors[0].root, missing);
    }
}
