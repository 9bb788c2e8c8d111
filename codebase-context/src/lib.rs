/*!
# Codescope Codebase Context

Retrieval-augmented context for a text-generation model: embed the user's
query, rank indexed files and symbols by cosine similarity, and quote the best
matches as fenced excerpts.

```text
query
  └─> query embedding (cached per query text)
        └─> similarity search over the index (top_n, min_similarity)
              └─> excerpts, truncated to max_chunk_chars
                    └─> "# Relevant code context" block
```

An empty `context_text` means "no enhancement": retrieval is off, no provider
is configured, the query could not be embedded, or nothing was similar enough.

## Example

```rust,no_run
use codescope_codebase_context::{ContextBuilder, ContextConfig};
use codescope_codebase_indexer::CodebaseIndexer;

# async fn run(indexer: CodebaseIndexer) -> anyhow::Result<()> {
let builder = ContextBuilder::new(ContextConfig::default(), indexer)?;
let context = builder.enhance("How is the config file parsed?").await?;
if !context.is_empty() {
    println!("{}", context.context_text);
}
# Ok(())
# }
```
*/

mod builder;
mod config;
mod error;
mod format;

pub use builder::CacheStats;
pub use builder::ContextBuilder;
pub use builder::ContextItem;
pub use builder::EnhancedContext;
pub use config::ContextConfig;
pub use error::ContextError;
pub use error::Result;
pub use format::CONTEXT_HEADER;
pub use format::TRUNCATION_MARKER;
pub use format::truncate_excerpt;
