use crate::position::Position;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Extraction failure recorded on a file's index entry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,

    /// First offending location, when the parser reports one.
    pub position: Option<Position>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    pub fn at(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }
}
