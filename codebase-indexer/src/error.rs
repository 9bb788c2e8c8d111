use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal setup problem; the store is cleared when a build hits it.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Stale symbol handle for {path:?}: generation {handle} but index is at {current}")]
    StaleGeneration {
        path: PathBuf,
        handle: u64,
        current: u64,
    },

    #[error("Stale symbol handle for {path:?}: file revision {handle} but entry is at {current}")]
    StaleRevision {
        path: PathBuf,
        handle: u64,
        current: u64,
    },

    #[error("File not indexed: {0:?}")]
    FileNotIndexed(PathBuf),

    #[error("No symbol in slot {slot} of {path:?}")]
    UnknownSymbol { path: PathBuf, slot: usize },

    #[error("Ignore error: {0}")]
    Ignore(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Task error: {0}")]
    Task(String),
}

impl From<ignore::Error> for IndexerError {
    fn from(err: ignore::Error) -> Self {
        IndexerError::Ignore(err.to_string())
    }
}

impl From<notify::Error> for IndexerError {
    fn from(err: notify::Error) -> Self {
        IndexerError::Watch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
