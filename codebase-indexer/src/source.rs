use crate::error::Result;
use codescope_symbol_extractor::SourceFile;
use log::debug;
use sha2::Digest;
use sha2::Sha256;
use std::path::Path;
use std::path::PathBuf;

/// Hex SHA-256 of `content`.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Canonical form of `path` used as the store key.
///
/// Deleted files cannot be canonicalized, so their parent is resolved
/// instead and the file name re-attached.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => dunce::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Reads a file for indexing.
///
/// Returns `Ok(None)` for files that should be skipped: larger than
/// `max_file_bytes`, or not valid UTF-8.
pub async fn load_source(path: &Path, max_file_bytes: u64) -> Result<Option<SourceFile>> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > max_file_bytes {
        debug!(
            "Skipping {} ({} bytes > {max_file_bytes})",
            path.display(),
            metadata.len()
        );
        return Ok(None);
    }

    let bytes = tokio::fs::read(path).await?;
    let hash = content_hash(&bytes);
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            debug!("Skipping non-UTF-8 file {}", path.display());
            return Ok(None);
        }
    };

    Ok(Some(
        SourceFile::new(path, content)
            .with_modified(metadata.modified().ok())
            .with_content_hash(hash),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codescope_symbol_extractor::Language;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"fn main() {}");
        assert_eq!(a, content_hash(b"fn main() {}"));
        assert_ne!(a, content_hash(b"fn main() { }"));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_load_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("lib.py");
        fs::write(&path, "def main(): pass\n").expect("Failed to write");

        let file = load_source(&path, 1024)
            .await
            .expect("Failed to load")
            .expect("file should be indexable");
        assert_eq!(file.language, Language::Python);
        assert_eq!(file.content_hash, content_hash(b"def main(): pass\n"));
        assert!(file.modified.is_some());
    }

    #[tokio::test]
    async fn test_oversized_and_binary_files_are_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let big = temp_dir.path().join("big.rs");
        fs::write(&big, "x".repeat(64)).expect("Failed to write");
        assert!(load_source(&big, 32).await.expect("Failed to load").is_none());

        let blob = temp_dir.path().join("blob.rs");
        fs::write(&blob, [0xff, 0xfe, 0x00, 0x01]).expect("Failed to write");
        assert!(load_source(&blob, 1024).await.expect("Failed to load").is_none());
    }

    #[test]
    fn test_normalize_deleted_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let gone = temp_dir.path().join("gone.rs");
        let expected = dunce::canonicalize(temp_dir.path())
            .expect("Failed to canonicalize")
            .join("gone.rs");
        assert_eq!(normalize_path(&gone), expected);
    }
}
