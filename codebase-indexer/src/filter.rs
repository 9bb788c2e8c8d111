use crate::error::Result;
use ignore::Match;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use log::debug;
use log::warn;
use std::path::Path;
use std::path::PathBuf;

/// Project-local ignore file, gitignore syntax.
pub const IGNORE_FILE_NAME: &str = ".codescopeignore";

const DEFAULT_PATTERNS: &[&str] = &[
    "target/",
    "build/",
    "dist/",
    "out/",
    "node_modules/",
    ".git/",
    ".hg/",
    ".svn/",
    "*.log",
    "logs/",
];

/// Never indexed, whatever the ignore rules say.
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "psd",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war",
    // executables and objects
    "exe", "dll", "so", "dylib", "o", "a", "lib", "obj", "class", "pyc", "pyo", "rlib", "wasm",
    "bin", "dat",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // media
    "mp3", "mp4", "wav", "ogg", "flac", "avi", "mov", "mkv", "webm",
    // documents and databases
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "sqlite", "db",
];

pub fn is_binary_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Exclude rules for one root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    matcher: Gitignore,
}

impl PathFilter {
    /// Compiles the built-in defaults, `.codescopeignore`, optionally the
    /// root `.gitignore`, and `extra_patterns`.
    pub fn new(root: &Path, extra_patterns: &[String], respect_gitignore: bool) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_PATTERNS {
            builder.add_line(None, pattern)?;
        }
        if respect_gitignore {
            add_ignore_file(&mut builder, root.join(".gitignore"));
        }
        add_ignore_file(&mut builder, root.join(IGNORE_FILE_NAME));
        for pattern in extra_patterns {
            builder.add_line(None, pattern)?;
        }
        let matcher = builder.build()?;
        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    pub fn is_ignored_path(&self, path: &Path, is_dir_hint: Option<bool>) -> bool {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if !abs.starts_with(&self.root) {
            return true;
        }
        let is_dir = is_dir_hint.unwrap_or_else(|| abs.is_dir());
        if !is_dir && is_binary_path(&abs) {
            return true;
        }
        matches!(
            self.matcher.matched_path_or_any_parents(&abs, is_dir),
            Match::Ignore(_)
        )
    }
}

fn add_ignore_file(builder: &mut GitignoreBuilder, path: PathBuf) {
    if path.exists() {
        if let Some(err) = builder.add(&path) {
            warn!("Failed to read ignore file {}: {err}", path.display());
        } else {
            debug!("Loaded ignore rules from {}", path.display());
        }
    }
}

/// Filters for every configured root.
#[derive(Debug, Clone, Default)]
pub struct PathFilterSet {
    filters: Vec<PathFilter>,
}

impl PathFilterSet {
    pub fn new(roots: &[PathBuf], extra_patterns: &[String], respect_gitignore: bool) -> Result<Self> {
        let filters = roots
            .iter()
            .map(|root| PathFilter::new(root, extra_patterns, respect_gitignore))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }

    pub fn for_path(&self, path: &Path) -> Option<&PathFilter> {
        // Deepest root wins when roots nest.
        self.filters
            .iter()
            .filter(|filter| filter.contains(path))
            .max_by_key(|filter| filter.root.components().count())
    }

    /// Paths outside every root count as ignored.
    pub fn is_ignored(&self, path: &Path, is_dir_hint: Option<bool>) -> bool {
        match self.for_path(path) {
            Some(filter) => filter.is_ignored_path(path, is_dir_hint),
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
