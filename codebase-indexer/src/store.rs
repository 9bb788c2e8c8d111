use crate::error::IndexerError;
use crate::error::Result;
use crate::model::EntityKey;
use crate::model::Excerpt;
use crate::model::FileIndexEntry;
use crate::model::ReferenceLocation;
use crate::model::Symbol;
use crate::model::SymbolHandle;
use crate::model::SymbolId;
use codescope_symbol_extractor::Position;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Counters over the current store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub generation: u64,
    pub files: usize,
    pub files_with_errors: usize,
    pub symbols: usize,
    pub references: usize,
    pub file_embeddings: usize,
    pub symbol_embeddings: usize,
}

/// The authoritative in-memory index: one entry per file path.
///
/// Entries sit behind `Arc` so readers can hold one while the store moves
/// on. Mutation goes through [`Arc::make_mut`], which never touches other
/// entries.
#[derive(Debug, Default)]
pub struct IndexStore {
    generation: u64,
    /// Last revision handed to an inserted entry.
    revision: u64,
    entries: HashMap<PathBuf, Arc<FileIndexEntry>>,
    /// Symbol name -> (path, slot) of every declaration with that name.
    names: HashMap<String, Vec<(PathBuf, usize)>>,
}

impl IndexStore {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the entry for `entry.path` wholesale and returns the old one.
    /// The new entry gets a fresh revision, so handles into the old one go
    /// stale.
    pub fn insert_entry(&mut self, mut entry: FileIndexEntry) -> Option<Arc<FileIndexEntry>> {
        self.revision += 1;
        entry.revision = self.revision;
        let path = entry.path.clone();
        let previous = self.remove_entry(&path);
        for (slot, symbol) in entry.symbols.iter().enumerate() {
            self.names
                .entry(symbol.name.clone())
                .or_default()
                .push((path.clone(), slot));
        }
        self.entries.insert(path, Arc::new(entry));
        previous
    }

    pub fn remove_entry(&mut self, path: &Path) -> Option<Arc<FileIndexEntry>> {
        let previous = self.entries.remove(path)?;
        for symbol in &previous.symbols {
            if let Some(slots) = self.names.get_mut(&symbol.name) {
                slots.retain(|(owner, _)| owner != path);
                if slots.is_empty() {
                    self.names.remove(&symbol.name);
                }
            }
        }
        Some(previous)
    }

    /// Removes every entry under the directory `dir` and returns how many
    /// went.
    pub fn remove_under(&mut self, dir: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect();
        for path in &doomed {
            self.remove_entry(path);
        }
        doomed.len()
    }

    /// Drops every entry and moves to `generation`, invalidating all handles.
    pub fn clear(&mut self, generation: u64) {
        self.entries.clear();
        self.names.clear();
        self.generation = generation;
    }

    pub fn entry(&self, path: &Path) -> Option<&Arc<FileIndexEntry>> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<FileIndexEntry>> {
        self.entries.values()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn handle(&self, path: &Path, slot: usize) -> SymbolHandle {
        SymbolHandle {
            path: path.to_path_buf(),
            slot,
            generation: self.generation,
            revision: self.entries.get(path).map_or(0, |entry| entry.revision),
        }
    }

    /// Handles of every declaration named `name`.
    pub fn handles_named(&self, name: &str) -> Vec<SymbolHandle> {
        self.names
            .get(name)
            .map(|slots| {
                slots
                    .iter()
                    .map(|(path, slot)| self.handle(path, *slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn symbols_named(&self, name: &str) -> Vec<&Symbol> {
        self.handles_named(name)
            .iter()
            .filter_map(|handle| self.symbol(handle).ok())
            .collect()
    }

    /// Looks a handle up, rejecting handles from an older generation or an
    /// older revision of the file.
    pub fn symbol(&self, handle: &SymbolHandle) -> Result<&Symbol> {
        self.check_generation(handle)?;
        let entry = self
            .entries
            .get(&handle.path)
            .ok_or_else(|| IndexerError::FileNotIndexed(handle.path.clone()))?;
        check_revision(entry, handle)?;
        entry
            .symbols
            .get(handle.slot)
            .ok_or_else(|| IndexerError::UnknownSymbol {
                path: handle.path.clone(),
                slot: handle.slot,
            })
    }

    pub fn symbol_by_id(&self, id: &SymbolId) -> Option<&Symbol> {
        self.entries
            .get(&id.path)?
            .symbols
            .iter()
            .find(|symbol| symbol.range == id.range)
    }

    /// Innermost (latest-starting) symbol whose range contains `position`.
    pub fn find_symbol_at(&self, path: &Path, position: Position) -> Option<&Symbol> {
        let entry = self.entries.get(path)?;
        entry.slot_at(position).map(|slot| &entry.symbols[slot])
    }

    pub fn handle_at(&self, path: &Path, position: Position) -> Option<SymbolHandle> {
        let slot = self.entries.get(path)?.slot_at(position)?;
        Some(self.handle(path, slot))
    }

    pub fn references_of(&self, id: &SymbolId) -> &[ReferenceLocation] {
        self.symbol_by_id(id)
            .map(|symbol| symbol.references.as_slice())
            .unwrap_or_default()
    }

    /// Appends a reference to the symbol behind `handle`.
    pub fn attach_reference(&mut self, handle: &SymbolHandle, location: ReferenceLocation) -> Result<()> {
        self.check_generation(handle)?;
        let entry = self
            .entries
            .get_mut(&handle.path)
            .ok_or_else(|| IndexerError::FileNotIndexed(handle.path.clone()))?;
        check_revision(entry, handle)?;
        let symbol = Arc::make_mut(entry)
            .symbols
            .get_mut(handle.slot)
            .ok_or_else(|| IndexerError::UnknownSymbol {
                path: handle.path.clone(),
                slot: handle.slot,
            })?;
        symbol.references.push(location);
        Ok(())
    }

    /// Mutable access for post-processing passes such as embedding.
    pub(crate) fn entry_mut(&mut self, path: &Path) -> Option<&mut FileIndexEntry> {
        self.entries.get_mut(path).map(Arc::make_mut)
    }

    /// Every stored embedding with its owner.
    pub fn embeddings(&self, files: bool, symbols: bool) -> Vec<(EntityKey, &[f32])> {
        let mut out = Vec::new();
        let mut entries: Vec<(&PathBuf, &Arc<FileIndexEntry>)> = self.entries.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (_, entry) in entries {
            if let Some(vector) = entry.embedding.as_ref().filter(|_| files) {
                out.push((
                    EntityKey::File {
                        path: entry.path.clone(),
                    },
                    vector.as_slice(),
                ));
            }
            if symbols {
                for symbol in &entry.symbols {
                    if let Some(vector) = &symbol.embedding {
                        out.push((
                            EntityKey::Symbol {
                                id: symbol.id(),
                                name: symbol.qualified_name(),
                            },
                            vector.as_slice(),
                        ));
                    }
                }
            }
        }
        out
    }

    /// Source text for a search hit.
    pub fn excerpt(&self, key: &EntityKey) -> Option<Excerpt> {
        match key {
            EntityKey::File { path } => {
                let entry = self.entries.get(path)?;
                Some(Excerpt {
                    path: entry.path.clone(),
                    language: entry.language,
                    text: entry.content.clone(),
                    range: None,
                })
            }
            EntityKey::Symbol { id, .. } => {
                let entry = self.entries.get(&id.path)?;
                let symbol = entry.symbols.iter().find(|s| s.range == id.range)?;
                let text = symbol_lines(&entry.content, symbol);
                Some(Excerpt {
                    path: entry.path.clone(),
                    language: entry.language,
                    text,
                    range: Some(symbol.range),
                })
            }
        }
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            generation: self.generation,
            files: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            if entry.has_error() {
                stats.files_with_errors += 1;
            }
            if entry.embedding.is_some() {
                stats.file_embeddings += 1;
            }
            stats.symbols += entry.symbols.len();
            for symbol in &entry.symbols {
                stats.references += symbol.references.len();
                if symbol.embedding.is_some() {
                    stats.symbol_embeddings += 1;
                }
            }
        }
        stats
    }

    fn check_generation(&self, handle: &SymbolHandle) -> Result<()> {
        if handle.generation != self.generation {
            return Err(IndexerError::StaleGeneration {
                path: handle.path.clone(),
                handle: handle.generation,
                current: self.generation,
            });
        }
        Ok(())
    }
}

fn check_revision(entry: &FileIndexEntry, handle: &SymbolHandle) -> Result<()> {
    if handle.revision != entry.revision {
        return Err(IndexerError::StaleRevision {
            path: handle.path.clone(),
            handle: handle.revision,
            current: entry.revision,
        });
    }
    Ok(())
}

/// Whole source lines spanned by `symbol`.
fn symbol_lines(content: &str, symbol: &Symbol) -> String {
    let start = symbol.range.start.line as usize;
    let count = symbol.range.line_count() as usize;
    content
        .lines()
        .skip(start)
        .take(count)
        .collect::<Vec<_>>()
        .join("\n")
}
