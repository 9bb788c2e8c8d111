use crate::config::IndexerConfig;
use crate::discovery::DiscoveryError;
use crate::discovery::discover;
use crate::error::IndexerError;
use crate::error::Result;
use crate::filter::PathFilterSet;
use crate::model::EntityKey;
use crate::model::Excerpt;
use crate::model::FileIndexEntry;
use crate::model::ReferenceLocation;
use crate::model::Symbol;
use crate::model::SymbolHandle;
use crate::model::SymbolId;
use crate::resolver;
use crate::source::load_source;
use crate::source::normalize_path;
use crate::state::BuildGate;
use crate::state::BuildState;
use crate::store::IndexStore;
use crate::store::StoreStats;
use codescope_embeddings::EmbeddingManager;
use codescope_symbol_extractor::Position;
use codescope_symbol_extractor::SourceFile;
use codescope_symbol_extractor::SymbolExtractor;
use codescope_symbol_extractor::TreeSitterExtractor;
use codescope_vector_store::SimilarityResult;
use futures::StreamExt;
use futures::stream;
use log::debug;
use log::info;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::sync::Semaphore;

/// Progress callback for indexing operations
pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

/// Indexing progress information
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub phase: IndexPhase,
    pub current: usize,
    pub total: usize,
    pub current_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Discovering,
    Extracting,
    Resolving,
    Embedding,
    Complete,
}

/// Statistics about one full build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub generation: u64,
    pub files_indexed: usize,
    pub files_with_errors: usize,
    pub files_skipped: usize,
    pub symbols: usize,
    pub references_resolved: usize,
    pub uses_dropped: usize,
    pub embeddings_computed: usize,
    pub embeddings_failed: usize,
    pub discovery_errors: Vec<DiscoveryError>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// Another build was running; nothing was touched.
    Busy,
    Completed(BuildReport),
}

impl BuildOutcome {
    pub fn report(&self) -> Option<&BuildReport> {
        match self {
            BuildOutcome::Busy => None,
            BuildOutcome::Completed(report) => Some(report),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, BuildOutcome::Busy)
    }
}

/// File-system notification, keyed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileChange {
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
    /// The editor switched to this file.
    ActiveFileChanged(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Created(path)
            | FileChange::Changed(path)
            | FileChange::Deleted(path)
            | FileChange::ActiveFileChanged(path) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Reindexed,
    Removed,
    /// Content hash matches the stored entry, or nothing was stored.
    Unchanged,
    SkippedBuildInProgress,
    /// Filtered out, too large, or not text.
    Ignored,
    /// Re-index failed and the previous healthy entry was kept.
    KeptLastGood,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Files,
    Symbols,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub scope: SearchScope,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

fn default_top_n() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.7
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            scope: SearchScope::default(),
            top_n: default_top_n(),
            min_similarity: default_min_similarity(),
        }
    }
}

/// Builder for [`CodebaseIndexer`]
pub struct IndexerBuilder {
    config: IndexerConfig,
    extractors: Vec<Arc<dyn SymbolExtractor>>,
    embeddings: Option<EmbeddingManager>,
}

impl IndexerBuilder {
    /// Adds an extractor. Extractors added later win over earlier ones and
    /// over the built-in tree-sitter extractor for languages they support.
    pub fn extractor(mut self, extractor: Arc<dyn SymbolExtractor>) -> Self {
        self.extractors.insert(0, extractor);
        self
    }

    pub fn embeddings(mut self, manager: EmbeddingManager) -> Self {
        self.embeddings = Some(manager);
        self
    }

    pub fn build(self) -> Result<CodebaseIndexer> {
        self.config
            .validate()
            .map_err(IndexerError::Configuration)?;
        Ok(CodebaseIndexer {
            inner: Arc::new(Inner {
                config: self.config,
                extractors: self.extractors,
                embeddings: self.embeddings,
                store: RwLock::new(IndexStore::new(0)),
                filters: RwLock::new(Arc::new(PathFilterSet::default())),
                gate: BuildGate::new(),
                generation: AtomicU64::new(0),
            }),
        })
    }
}

/// In-memory codebase index with two-phase builds and incremental updates.
///
/// Cheap to clone; clones share one store.
#[derive(Clone)]
pub struct CodebaseIndexer {
    inner: Arc<Inner>,
}

struct Inner {
    config: IndexerConfig,
    extractors: Vec<Arc<dyn SymbolExtractor>>,
    embeddings: Option<EmbeddingManager>,
    store: RwLock<IndexStore>,
    filters: RwLock<Arc<PathFilterSet>>,
    gate: BuildGate,
    generation: AtomicU64,
}

/// Embeddings computed for one entry, applied after the fact.
#[derive(Default)]
struct EntryEmbeddings {
    file: Option<Vec<f32>>,
    symbols: Vec<(usize, Vec<f32>)>,
    computed: usize,
    failed: usize,
}

impl EntryEmbeddings {
    fn apply(self, entry: &mut FileIndexEntry) {
        if self.file.is_some() {
            entry.embedding = self.file;
        }
        for (slot, vector) in self.symbols {
            if let Some(symbol) = entry.symbols.get_mut(slot) {
                symbol.embedding = Some(vector);
            }
        }
    }
}

impl CodebaseIndexer {
    /// Indexer with the built-in tree-sitter extractor and no embeddings.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: IndexerConfig) -> IndexerBuilder {
        IndexerBuilder {
            config,
            extractors: vec![Arc::new(TreeSitterExtractor::new())],
            embeddings: None,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.inner.config
    }

    pub fn embeddings(&self) -> Option<&EmbeddingManager> {
        self.inner.embeddings.as_ref()
    }

    pub fn state(&self) -> BuildState {
        self.inner.gate.state()
    }

    /// Runs a full two-phase build and installs the result as a new
    /// generation.
    ///
    /// Returns [`BuildOutcome::Busy`] without touching the store when a
    /// build or an incremental update is already running. A configuration
    /// error clears the store.
    pub async fn build(&self, progress: Option<ProgressCallback>) -> Result<BuildOutcome> {
        let Some(_guard) = self.inner.gate.try_begin() else {
            info!(
                "Index busy ({} updates in flight); build request ignored",
                self.inner.gate.updates_in_flight()
            );
            return Ok(BuildOutcome::Busy);
        };

        let started = Instant::now();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Starting full build (generation {generation})");

        report_progress(&progress, IndexPhase::Discovering, 0, 0, None);

        let (roots, filters) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!("Build aborted: {err}");
                self.inner.store.write().await.clear(generation);
                return Err(err);
            }
        };

        let discovery = {
            let filters = Arc::clone(&filters);
            tokio::task::spawn_blocking(move || discover(&roots, &filters))
                .await
                .map_err(|e| IndexerError::Task(e.to_string()))?
        };

        // Phase 1: extraction, into a store nobody else can see yet.
        let total = discovery.files.len();
        let (entries, files_skipped) = self.extract_files(discovery.files, &progress).await?;
        let mut fresh = IndexStore::new(generation);
        for entry in entries {
            fresh.insert_entry(entry);
        }

        // Phase 2: every file is in the symbol table now.
        report_progress(&progress, IndexPhase::Resolving, 0, total, None);
        let resolved = resolver::resolve_all(&mut fresh);

        let (embeddings_computed, embeddings_failed) =
            self.embed_store(&mut fresh, &progress).await;

        let stats = fresh.stats();
        *self.inner.store.write().await = fresh;
        *self.inner.filters.write().await = filters;

        let report = BuildReport {
            generation,
            files_indexed: stats.files,
            files_with_errors: stats.files_with_errors,
            files_skipped,
            symbols: stats.symbols,
            references_resolved: resolved.resolved,
            uses_dropped: resolved.dropped,
            embeddings_computed,
            embeddings_failed,
            discovery_errors: discovery.errors,
            elapsed: started.elapsed(),
        };

        report_progress(&progress, IndexPhase::Complete, total, total, None);
        info!(
            "Build complete: {} files, {} symbols, {} references, {} parse errors in {:?}",
            report.files_indexed,
            report.symbols,
            report.references_resolved,
            report.files_with_errors,
            report.elapsed
        );

        Ok(BuildOutcome::Completed(report))
    }

    /// Re-indexes, or removes, a single file or a directory tree.
    ///
    /// Only the changed entries are replaced; references held by other files
    /// are not recomputed until the next full build. The update holds a
    /// share of the build gate until its store write, so no full build can
    /// start underneath it.
    pub async fn update(&self, change: FileChange) -> Result<UpdateOutcome> {
        let path = normalize_path(change.path());

        let Some(_update) = self.inner.gate.try_begin_update() else {
            warn!(
                "Skipping update of {}: full build in progress",
                path.display()
            );
            return Ok(UpdateOutcome::SkippedBuildInProgress);
        };

        if let FileChange::Deleted(_) = change {
            return Ok(self.remove(&path).await);
        }

        let filters = self.current_filters().await?;
        if path.is_dir() {
            return self.update_directory(&path, &filters).await;
        }
        self.update_file(&path, &filters).await
    }

    /// Indexes every file under a directory that appeared in the tree.
    async fn update_directory(
        &self,
        dir: &Path,
        filters: &Arc<PathFilterSet>,
    ) -> Result<UpdateOutcome> {
        if filters.is_ignored(dir, Some(true)) {
            debug!("Ignoring change to {}", dir.display());
            return Ok(UpdateOutcome::Ignored);
        }

        let discovery = {
            let roots = vec![dir.to_path_buf()];
            let filters = Arc::clone(filters);
            tokio::task::spawn_blocking(move || discover(&roots, &filters))
                .await
                .map_err(|e| IndexerError::Task(e.to_string()))?
        };

        let mut reindexed = 0;
        for file in &discovery.files {
            match self.update_file(file, filters).await {
                Ok(UpdateOutcome::Reindexed) => reindexed += 1,
                Ok(_) => {}
                Err(err) => warn!("Failed to update {}: {err}", file.display()),
            }
        }
        info!(
            "Re-indexed {reindexed} of {} files under {}",
            discovery.files.len(),
            dir.display()
        );

        if reindexed == 0 {
            Ok(UpdateOutcome::Unchanged)
        } else {
            Ok(UpdateOutcome::Reindexed)
        }
    }

    async fn update_file(&self, path: &Path, filters: &PathFilterSet) -> Result<UpdateOutcome> {
        if filters.is_ignored(path, Some(false)) {
            debug!("Ignoring change to {}", path.display());
            return Ok(UpdateOutcome::Ignored);
        }

        let file = match load_source(path, self.inner.config.max_file_bytes).await {
            Ok(Some(file)) => file,
            Ok(None) => return Ok(UpdateOutcome::Ignored),
            Err(IndexerError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(self.remove(path).await);
            }
            Err(err) => return Err(err),
        };

        let previous = self.inner.store.read().await.entry(path).cloned();
        if previous
            .as_ref()
            .is_some_and(|prev| prev.content_hash == file.content_hash)
        {
            debug!("{} unchanged", path.display());
            return Ok(UpdateOutcome::Unchanged);
        }

        let mut entry = self.inner.extract_entry(file);

        let previous_healthy = previous.as_ref().is_some_and(|prev| !prev.has_error());
        if entry.has_error() && previous_healthy && self.inner.config.retain_last_good_on_error {
            warn!(
                "Keeping last good index of {} after failed re-index",
                path.display()
            );
            return Ok(UpdateOutcome::KeptLastGood);
        }

        if let Some(manager) = &self.inner.embeddings {
            let embeddings = compute_embeddings(
                manager,
                &entry,
                self.inner.config.embed_files,
                self.inner.config.embed_symbols,
            )
            .await;
            embeddings.apply(&mut entry);
        }

        self.inner.store.write().await.insert_entry(entry);
        info!("Re-indexed {}", path.display());
        Ok(UpdateOutcome::Reindexed)
    }

    /// Drops every entry and invalidates all handles.
    pub async fn clear(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.store.write().await.clear(generation);
    }

    pub async fn generation(&self) -> u64 {
        self.inner.store.read().await.generation()
    }

    pub async fn stats(&self) -> StoreStats {
        self.inner.store.read().await.stats()
    }

    pub async fn paths(&self) -> Vec<PathBuf> {
        self.inner.store.read().await.paths()
    }

    pub async fn entry(&self, path: &Path) -> Option<Arc<FileIndexEntry>> {
        let path = normalize_path(path);
        self.inner.store.read().await.entry(&path).cloned()
    }

    pub async fn symbols_named(&self, name: &str) -> Vec<Symbol> {
        self.inner
            .store
            .read()
            .await
            .symbols_named(name)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Innermost symbol enclosing `position` in `path`.
    pub async fn find_symbol_at(&self, path: &Path, position: Position) -> Option<Symbol> {
        let path = normalize_path(path);
        self.inner
            .store
            .read()
            .await
            .find_symbol_at(&path, position)
            .cloned()
    }

    pub async fn symbol_handle_at(&self, path: &Path, position: Position) -> Option<SymbolHandle> {
        let path = normalize_path(path);
        self.inner.store.read().await.handle_at(&path, position)
    }

    pub async fn references_of(&self, id: &SymbolId) -> Vec<ReferenceLocation> {
        self.inner.store.read().await.references_of(id).to_vec()
    }

    /// Attaches a reference through a handle of the current generation.
    pub async fn attach_reference(
        &self,
        handle: &SymbolHandle,
        location: ReferenceLocation,
    ) -> Result<()> {
        self.inner
            .store
            .write()
            .await
            .attach_reference(handle, location)
    }

    /// Ranks stored embeddings against `query`.
    pub async fn search_similar(
        &self,
        query: &[f32],
        options: SearchOptions,
    ) -> Vec<SimilarityResult<EntityKey>> {
        let (files, symbols) = match options.scope {
            SearchScope::Files => (true, false),
            SearchScope::Symbols => (false, true),
            SearchScope::All => (true, true),
        };
        let store = self.inner.store.read().await;
        codescope_vector_store::search(
            query,
            store.embeddings(files, symbols),
            options.top_n,
            options.min_similarity,
        )
    }

    pub async fn excerpt(&self, key: &EntityKey) -> Option<Excerpt> {
        self.inner.store.read().await.excerpt(key)
    }

    /// Configured roots that currently exist, in canonical form.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.inner
            .config
            .roots
            .iter()
            .map(|root| normalize_path(root.as_path()))
            .filter(|root| root.is_dir())
            .collect()
    }

    /// Drops the entry for `path`, or every entry under it when `path` was
    /// a directory.
    async fn remove(&self, path: &Path) -> UpdateOutcome {
        let mut store = self.inner.store.write().await;
        if store.remove_entry(path).is_some() {
            info!("Removed {} from index", path.display());
            return UpdateOutcome::Removed;
        }
        match store.remove_under(path) {
            0 => UpdateOutcome::Unchanged,
            removed => {
                info!("Removed {removed} files under {} from index", path.display());
                UpdateOutcome::Removed
            }
        }
    }

    /// Canonical roots plus fresh filters; fails when no root is usable.
    fn prepare(&self) -> Result<(Vec<PathBuf>, Arc<PathFilterSet>)> {
        let config = &self.inner.config;
        config.validate().map_err(IndexerError::Configuration)?;

        let roots = canonical_roots(config);
        if !roots.iter().any(|root| root.is_dir()) {
            return Err(IndexerError::Configuration(format!(
                "no root is a readable directory: {roots:?}"
            )));
        }

        let filters = PathFilterSet::new(&roots, &config.ignore_patterns, config.respect_gitignore)
            .map_err(|err| IndexerError::Configuration(err.to_string()))?;
        Ok((roots, Arc::new(filters)))
    }

    async fn current_filters(&self) -> Result<Arc<PathFilterSet>> {
        {
            let filters = self.inner.filters.read().await;
            if !filters.is_empty() {
                return Ok(Arc::clone(&filters));
            }
        }
        let config = &self.inner.config;
        let roots = canonical_roots(config);
        let filters = Arc::new(PathFilterSet::new(
            &roots,
            &config.ignore_patterns,
            config.respect_gitignore,
        )?);
        *self.inner.filters.write().await = Arc::clone(&filters);
        Ok(filters)
    }

    /// Phase 1 over `files` with bounded concurrency. Returns the entries and
    /// the number of files that were skipped.
    async fn extract_files(
        &self,
        files: Vec<PathBuf>,
        progress: &Option<ProgressCallback>,
    ) -> Result<(Vec<FileIndexEntry>, usize)> {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.inner.config.max_concurrent));
        let done = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::with_capacity(total);

        for path in files {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| IndexerError::Task(format!("Semaphore error: {e}")))?;
            let inner = Arc::clone(&self.inner);
            let done = Arc::clone(&done);
            let progress = progress.clone();

            tasks.push(tokio::spawn(async move {
                let result = inner.index_file(&path).await;
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                report_progress(
                    &progress,
                    IndexPhase::Extracting,
                    current,
                    total,
                    Some(path.to_string_lossy().to_string()),
                );
                drop(permit);
                (path, result)
            }));
        }

        // Barrier: resolution must not start before every file is in.
        let mut entries = Vec::with_capacity(total);
        let mut skipped = 0;
        for task in tasks {
            match task.await {
                Ok((_, Ok(Some(entry)))) => entries.push(entry),
                Ok((path, Ok(None))) => {
                    debug!("Skipped {}", path.display());
                    skipped += 1;
                }
                Ok((path, Err(e))) => {
                    warn!("Failed to index {}: {e}", path.display());
                    skipped += 1;
                }
                Err(e) => {
                    warn!("Task join error: {e}");
                    skipped += 1;
                }
            }
        }

        Ok((entries, skipped))
    }

    /// Optional embedding pass over a freshly built store.
    async fn embed_store(
        &self,
        store: &mut IndexStore,
        progress: &Option<ProgressCallback>,
    ) -> (usize, usize) {
        let Some(manager) = &self.inner.embeddings else {
            return (0, 0);
        };
        let config = &self.inner.config;
        if !config.embed_files && !config.embed_symbols {
            return (0, 0);
        }

        let entries: Vec<Arc<FileIndexEntry>> = store.entries().cloned().collect();
        let total = entries.len();
        info!(
            "Embedding {total} files with {} (dimension {})",
            manager.provider_name(),
            manager.dimension()
        );
        report_progress(progress, IndexPhase::Embedding, 0, total, None);

        let done = AtomicUsize::new(0);
        let results: Vec<(PathBuf, EntryEmbeddings)> = stream::iter(entries)
            .map(|entry| {
                let done = &done;
                async move {
                    let embeddings =
                        compute_embeddings(manager, &entry, config.embed_files, config.embed_symbols)
                            .await;
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    report_progress(
                        progress,
                        IndexPhase::Embedding,
                        current,
                        total,
                        Some(entry.path.to_string_lossy().to_string()),
                    );
                    (entry.path.clone(), embeddings)
                }
            })
            .buffer_unordered(config.max_concurrent)
            .collect()
            .await;

        let mut computed = 0;
        let mut failed = 0;
        for (path, embeddings) in results {
            computed += embeddings.computed;
            failed += embeddings.failed;
            if let Some(entry) = store.entry_mut(&path) {
                embeddings.apply(entry);
            }
        }

        if failed > 0 {
            warn!("{failed} embeddings failed; affected entries have none");
        }
        (computed, failed)
    }
}

impl Inner {
    async fn index_file(&self, path: &Path) -> Result<Option<FileIndexEntry>> {
        let Some(file) = load_source(path, self.config.max_file_bytes).await? else {
            return Ok(None);
        };
        Ok(Some(self.extract_entry(file)))
    }

    /// Runs the first extractor that supports the file's language. No
    /// extractor means a text-only entry.
    fn extract_entry(&self, file: SourceFile) -> FileIndexEntry {
        let extraction = self
            .extractors
            .iter()
            .find(|extractor| extractor.supports(file.language))
            .map(|extractor| extractor.extract(&file));
        if let Some(Err(err)) = &extraction {
            warn!("Failed to extract symbols from {}: {err}", file.path.display());
        }
        FileIndexEntry::new(file, extraction)
    }
}

async fn compute_embeddings(
    manager: &EmbeddingManager,
    entry: &FileIndexEntry,
    files: bool,
    symbols: bool,
) -> EntryEmbeddings {
    let mut out = EntryEmbeddings::default();

    if files && !entry.content.trim().is_empty() {
        match manager.embed_file(&entry.content).await {
            Some(vector) => {
                out.file = Some(vector);
                out.computed += 1;
            }
            None => out.failed += 1,
        }
    }

    if symbols {
        for slot in 0..entry.symbols.len() {
            let Some(text) = entry.symbol_text(slot) else {
                continue;
            };
            match manager.embed_symbol(text).await {
                Some(vector) => {
                    out.symbols.push((slot, vector));
                    out.computed += 1;
                }
                None => out.failed += 1,
            }
        }
    }

    out
}

fn canonical_roots(config: &IndexerConfig) -> Vec<PathBuf> {
    config
        .roots
        .iter()
        .map(|root| normalize_path(root.as_path()))
        .collect()
}

fn report_progress(
    callback: &Option<ProgressCallback>,
    phase: IndexPhase,
    current: usize,
    total: usize,
    current_file: Option<String>,
) {
    if let Some(cb) = callback {
        cb(IndexProgress {
            phase,
            current,
            total,
            current_file,
        });
    }
}
