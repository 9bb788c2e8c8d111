//! # Codescope Symbol Extractor
//!
//! The language boundary of the indexer: given a file's text, report the
//! symbols it declares and the places where it uses names.
//!
//! ## Contract
//!
//! - [`SymbolExtractor::extract`] returns an [`Extraction`] (declarations plus
//!   an ordered list of [`Use`]s) or a [`ParseError`].
//! - A [`Use`] carries its own file and range plus a [`UseTarget`]: either a
//!   bare name for the resolver to look up, or a declaration location already
//!   resolved by a language service.
//! - Implementations must be cheap to share across tasks (`Send + Sync`).
//!
//! The crate ships [`TreeSitterExtractor`], covering Rust, Python,
//! JavaScript, TypeScript/TSX and Go.
//!
//! ## Example
//!
//! ```no_run
//! use codescope_symbol_extractor::{SourceFile, SymbolExtractor, TreeSitterExtractor};
//!
//! let file = SourceFile::new("src/lib.rs", "pub fn answer() -> u32 { 42 }");
//! let extraction = TreeSitterExtractor::new().extract(&file).unwrap();
//! assert_eq!(extraction.symbols[0].name, "answer");
//! ```

mod error;
mod language;
mod position;
mod rules;
mod tree_sitter_extractor;

pub use error::ParseError;
pub use language::Language;
pub use position::Position;
pub use position::Range;
pub use tree_sitter_extractor::TreeSitterExtractor;

use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// One indexable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub language: Language,
    pub modified: Option<SystemTime>,
    /// Hex digest of `content`; empty when the caller did not compute one.
    pub content_hash: String,
}

impl SourceFile {
    /// Builds a file record, detecting the language from the extension.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
            modified: None,
            content_hash: String::new(),
        }
    }

    pub fn with_modified(mut self, modified: Option<SystemTime>) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = hash.into();
        self
    }
}

/// Kind of declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Enum,
    TypeAlias,
    Constant,
    Variable,
    Module,
}

impl SymbolKind {
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::TypeAlias => "type",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Module => "module",
        }
    }
}

/// A declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,

    /// Whole declaration, from its first token to the end of its body.
    pub range: Range,

    /// The declared name only.
    pub selection_range: Range,

    /// Byte span of `range` inside the file content.
    pub byte_range: std::ops::Range<usize>,

    /// Name of the enclosing declaration (class, impl target, module).
    pub container: Option<String>,
}

/// A location inside some file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub range: Range,
}

/// What a [`Use`] points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UseTarget {
    /// Textual handle; the resolver matches it against declared names.
    Name(String),

    /// Declaration position already resolved by a language service. May point
    /// outside the indexed tree.
    Declaration(Location),
}

/// A site where a symbol is used rather than declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Use {
    pub file: PathBuf,
    pub range: Range,
    pub target: UseTarget,
}

/// Output of a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub symbols: Vec<Declaration>,
    pub uses: Vec<Use>,
}

/// Pluggable per-language symbol capability.
pub trait SymbolExtractor: Send + Sync {
    /// Whether this extractor understands `language`. Files in unsupported
    /// languages are indexed as text only.
    fn supports(&self, language: Language) -> bool;

    fn extract(&self, file: &SourceFile) -> Result<Extraction, ParseError>;
}
