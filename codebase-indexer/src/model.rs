use codescope_symbol_extractor::Declaration;
use codescope_symbol_extractor::Extraction;
use codescope_symbol_extractor::Language;
use codescope_symbol_extractor::ParseError;
use codescope_symbol_extractor::Position;
use codescope_symbol_extractor::Range;
use codescope_symbol_extractor::SourceFile;
use codescope_symbol_extractor::SymbolKind;
use codescope_symbol_extractor::Use;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

/// Stable identity of a declaration: owning file plus declaration range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId {
    pub path: PathBuf,
    pub range: Range,
}

/// Arena address of a symbol inside one index generation.
///
/// `revision` pins the handle to the entry it was taken from, so a re-index
/// of the file invalidates it even though the generation stays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolHandle {
    pub path: PathBuf,
    pub slot: usize,
    pub generation: u64,
    pub revision: u64,
}

/// A resolved use of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceLocation {
    pub path: PathBuf,
    pub range: Range,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub path: PathBuf,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip)]
    pub byte_range: std::ops::Range<usize>,
    pub container: Option<String>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub references: Vec<ReferenceLocation>,
}

impl Symbol {
    fn from_declaration(path: &Path, declaration: Declaration) -> Self {
        Self {
            name: declaration.name,
            kind: declaration.kind,
            path: path.to_path_buf(),
            range: declaration.range,
            selection_range: declaration.selection_range,
            byte_range: declaration.byte_range,
            container: declaration.container,
            embedding: None,
            references: Vec::new(),
        }
    }

    pub fn id(&self) -> SymbolId {
        SymbolId {
            path: self.path.clone(),
            range: self.range,
        }
    }

    /// Whether a declaration position designates this symbol.
    pub fn declared_at(&self, position: Position) -> bool {
        self.range.start == position || self.selection_range.start == position
    }

    /// `Name` or `Container::name`.
    pub fn qualified_name(&self) -> String {
        match &self.container {
            Some(container) => format!("{container}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Per-file record in the index store. Replaced wholesale on re-index.
#[derive(Debug, Clone, PartialEq)]
pub struct FileIndexEntry {
    pub path: PathBuf,
    pub language: Language,
    pub content: String,
    pub content_hash: String,
    pub modified: Option<SystemTime>,

    /// Symbol arena; a [`SymbolHandle`] addresses it by slot.
    pub symbols: Vec<Symbol>,

    /// Uses awaiting resolution, in source order.
    pub uses: Vec<Use>,

    /// Set when extraction failed; `symbols` is then empty.
    pub parse_error: Option<ParseError>,

    pub embedding: Option<Vec<f32>>,

    /// Stamped by the store on insert; unique within one store.
    pub revision: u64,
}

impl FileIndexEntry {
    /// Builds an entry from a file and its extraction result. `None` means
    /// no extractor supports the language and the file is text-only.
    pub fn new(file: SourceFile, extraction: Option<Result<Extraction, ParseError>>) -> Self {
        let (symbols, uses, parse_error) = match extraction {
            Some(Ok(extraction)) => {
                let symbols = extraction
                    .symbols
                    .into_iter()
                    .map(|declaration| Symbol::from_declaration(&file.path, declaration))
                    .collect();
                (symbols, extraction.uses, None)
            }
            Some(Err(err)) => (Vec::new(), Vec::new(), Some(err)),
            None => (Vec::new(), Vec::new(), None),
        };
        Self {
            path: file.path,
            language: file.language,
            content: file.content,
            content_hash: file.content_hash,
            modified: file.modified,
            symbols,
            uses,
            parse_error,
            embedding: None,
            revision: 0,
        }
    }

    pub fn has_error(&self) -> bool {
        self.parse_error.is_some()
    }

    /// Source text of the symbol in `slot`.
    pub fn symbol_text(&self, slot: usize) -> Option<&str> {
        let symbol = self.symbols.get(slot)?;
        self.content.get(symbol.byte_range.clone())
    }

    /// Slot of the innermost symbol containing `position`.
    pub fn slot_at(&self, position: Position) -> Option<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, symbol)| symbol.range.contains(position))
            .max_by_key(|(_, symbol)| symbol.range.start)
            .map(|(slot, _)| slot)
    }
}

/// What a stored embedding belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKey {
    File { path: PathBuf },
    Symbol { id: SymbolId, name: String },
}

impl EntityKey {
    pub fn path(&self) -> &Path {
        match self {
            EntityKey::File { path } => path,
            EntityKey::Symbol { id, .. } => &id.path,
        }
    }
}

/// Text of an indexed entity, ready to be quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excerpt {
    pub path: PathBuf,
    pub language: Language,
    pub text: String,
    /// Declaration range for symbols, `None` for whole files.
    pub range: Option<Range>,
}
