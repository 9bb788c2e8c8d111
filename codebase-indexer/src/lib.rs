/*!
# Codebase Indexer

In-memory symbol index over one or more source trees.

## Pipeline

1. **Discovery**: walk the roots, applying built-in excludes,
   `.codescopeignore`, `.gitignore` and configured patterns.
2. **Extraction**: each file goes through a [`SymbolExtractor`]
   (tree-sitter by default) with bounded concurrency. Failures are
   recorded on the file's entry and never abort the build.
3. **Resolution**: once every file is in, each recorded use is linked to
   its declaration, possibly in another file.
4. **Embedding** (optional): files and symbols get vectors through an
   [`EmbeddingManager`](codescope_embeddings::EmbeddingManager).

The result is installed as a new generation in one step. Single files are
kept fresh through [`CodebaseIndexer::update`], usually driven by a
[`FileWatcher`].

## Example

```rust,no_run
use codescope_codebase_indexer::{CodebaseIndexer, IndexerConfig};
use codescope_symbol_extractor::Position;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let indexer = CodebaseIndexer::new(IndexerConfig::with_roots(["./my-project"]))?;
    let outcome = indexer.build(None).await?;
    if let Some(report) = outcome.report() {
        println!("Indexed {} files, {} symbols", report.files_indexed, report.symbols);
    }

    let symbol = indexer
        .find_symbol_at(Path::new("./my-project/src/main.rs"), Position::new(10, 4))
        .await;
    println!("{symbol:?}");
    Ok(())
}
```

[`SymbolExtractor`]: codescope_symbol_extractor::SymbolExtractor
*/

mod config;
mod discovery;
mod error;
mod filter;
mod indexer;
mod model;
mod resolver;
mod source;
mod state;
mod store;
mod watcher;

pub use config::IndexerConfig;
pub use discovery::Discovery;
pub use discovery::DiscoveryError;
pub use discovery::discover;
pub use error::IndexerError;
pub use error::Result;
pub use filter::IGNORE_FILE_NAME;
pub use filter::PathFilter;
pub use filter::PathFilterSet;
pub use filter::is_binary_path;
pub use indexer::BuildOutcome;
pub use indexer::BuildReport;
pub use indexer::CodebaseIndexer;
pub use indexer::FileChange;
pub use indexer::IndexPhase;
pub use indexer::IndexProgress;
pub use indexer::IndexerBuilder;
pub use indexer::ProgressCallback;
pub use indexer::SearchOptions;
pub use indexer::SearchScope;
pub use indexer::UpdateOutcome;
pub use model::EntityKey;
pub use model::Excerpt;
pub use model::FileIndexEntry;
pub use model::ReferenceLocation;
pub use model::Symbol;
pub use model::SymbolHandle;
pub use model::SymbolId;
pub use resolver::ResolveStats;
pub use resolver::resolve_all;
pub use resolver::resolve_use;
pub use source::content_hash;
pub use source::load_source;
pub use source::normalize_path;
pub use state::BuildState;
pub use store::IndexStore;
pub use store::StoreStats;
pub use watcher::FileWatcher;
pub use watcher::changes_for_event;
