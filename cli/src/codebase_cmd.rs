use crate::settings::SETTINGS_FILE_NAME;
use crate::settings::Settings;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use codescope_codebase_context::ContextBuilder;
use codescope_codebase_context::truncate_excerpt;
use codescope_codebase_indexer::BuildOutcome;
use codescope_codebase_indexer::BuildReport;
use codescope_codebase_indexer::CodebaseIndexer;
use codescope_codebase_indexer::EntityKey;
use codescope_codebase_indexer::FileWatcher;
use codescope_codebase_indexer::IndexProgress;
use codescope_codebase_indexer::ProgressCallback;
use codescope_codebase_indexer::SearchOptions;
use codescope_codebase_indexer::SearchScope;
use codescope_embeddings::EmbeddingManager;
use codescope_embeddings::build_embedder;
use codescope_symbol_extractor::Position;
use log::debug;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "codescope", version)]
#[command(about = "Index a codebase and retrieve the code relevant to a question")]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Settings file (defaults to <root>/codescope.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Index without computing embeddings
    #[arg(long, global = true)]
    pub no_embeddings: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index the codebase and print build statistics
    Index(IndexArgs),

    /// Rank files and symbols by similarity to a query
    Search(SearchArgs),

    /// Print the context block a model would receive for a query
    Context(ContextArgs),

    /// List declarations with the given name
    Symbols(NameArgs),

    /// List references to declarations with the given name
    Refs(NameArgs),

    /// Keep the index current as files change
    Watch,
}

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Extra gitignore-style exclude pattern (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Minimum cosine similarity
    #[arg(long, value_name = "SCORE")]
    pub min_similarity: Option<f32>,

    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Show the matching code
    #[arg(long)]
    pub show_code: bool,
}

#[derive(Debug, Parser)]
pub struct ContextArgs {
    /// Question to gather context for
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of excerpts to include
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Per-excerpt character limit
    #[arg(long, value_name = "CHARS")]
    pub max_chunk_chars: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct NameArgs {
    /// Declared name, e.g. `load_config`
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Files,
    Symbols,
    All,
}

impl From<ScopeArg> for SearchScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Files => SearchScope::Files,
            ScopeArg::Symbols => SearchScope::Symbols,
            ScopeArg::All => SearchScope::All,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let root = dunce::canonicalize(&root)
            .with_context(|| format!("Project root {} not found", root.display()))?;
        let settings_path = self
            .config
            .clone()
            .unwrap_or_else(|| root.join(SETTINGS_FILE_NAME));
        let mut settings = Settings::load(&settings_path)?;
        settings.resolve_roots(&root);
        if self.no_embeddings {
            settings.embedding.enabled = false;
        }

        let session = Session {
            root,
            settings,
            json: self.json,
        };
        match self.command {
            Command::Index(args) => session.index(args).await,
            Command::Search(args) => session.search(args).await,
            Command::Context(args) => session.context(args).await,
            Command::Symbols(args) => session.symbols(args).await,
            Command::Refs(args) => session.refs(args).await,
            Command::Watch => session.watch().await,
        }
    }
}

struct Session {
    root: PathBuf,
    settings: Settings,
    json: bool,
}

impl Session {
    async fn index(mut self, args: IndexArgs) -> Result<()> {
        self.settings.indexer.ignore_patterns.extend(args.ignore);
        let (_, report) = self.open(true).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "{} Indexed {} files in {:.2?}",
            "✓".bright_green(),
            report.files_indexed.bright_cyan(),
            report.elapsed
        );
        println!("  Symbols: {}", report.symbols.bright_cyan());
        println!(
            "  References resolved: {}",
            report.references_resolved.bright_cyan()
        );
        println!("  Parse errors: {}", report.files_with_errors.bright_cyan());
        println!("  Files skipped: {}", report.files_skipped.bright_cyan());
        if report.embeddings_computed + report.embeddings_failed > 0 {
            println!(
                "  Embeddings: {} ({} failed)",
                report.embeddings_computed.bright_cyan(),
                report.embeddings_failed
            );
        }
        for error in &report.discovery_errors {
            println!(
                "{} {}: {}",
                "✗".bright_red(),
                error.root.display(),
                error.message
            );
        }
        Ok(())
    }

    async fn search(self, args: SearchArgs) -> Result<()> {
        let (indexer, _) = self.open(true).await?;
        let manager = indexer.embeddings().context(
            "Embeddings are disabled; enable [embedding] in codescope.toml to search",
        )?;
        let query = manager
            .embed_query(&args.query)
            .await
            .context("Failed to embed the query")?;

        let context = &self.settings.context;
        let options = SearchOptions {
            scope: args.scope.map(Into::into).unwrap_or(context.scope),
            top_n: args.limit.unwrap_or(context.top_n),
            min_similarity: args.min_similarity.unwrap_or(context.min_similarity),
        };
        let results = indexer.search_similar(&query, options).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }
        if results.is_empty() {
            println!("{} No results found", "✗".bright_red());
            return Ok(());
        }

        for (rank, result) in results.iter().enumerate() {
            let label = match &result.key {
                EntityKey::File { path } => self.relative(path),
                EntityKey::Symbol { id, name } => format!(
                    "{}:{} {}",
                    self.relative(&id.path),
                    id.range.start.line + 1,
                    name.bold()
                ),
            };
            println!(
                "{}. {} {}",
                rank + 1,
                label,
                format!("({:.2})", result.score).dimmed()
            );
            if !args.show_code {
                continue;
            }
            let Some(excerpt) = indexer.excerpt(&result.key).await else {
                continue;
            };
            let (text, _) = truncate_excerpt(&excerpt.text, 600);
            println!("{text}\n");
        }
        Ok(())
    }

    async fn context(mut self, args: ContextArgs) -> Result<()> {
        if let Some(limit) = args.limit {
            self.settings.context.top_n = limit;
        }
        if let Some(max) = args.max_chunk_chars {
            self.settings.context.max_chunk_chars = max;
        }
        let (indexer, _) = self.open(true).await?;
        let builder = ContextBuilder::new(self.settings.context.clone(), indexer)
            .context("Invalid [context] settings")?;
        let context = builder.enhance(&args.query).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&context)?);
        } else if context.is_empty() {
            println!("{} No relevant context", "✗".bright_red());
        } else {
            print!("{}", context.context_text);
        }
        Ok(())
    }

    async fn symbols(self, args: NameArgs) -> Result<()> {
        let (indexer, _) = self.open(false).await?;
        let symbols = indexer.symbols_named(&args.name).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&symbols)?);
            return Ok(());
        }
        if symbols.is_empty() {
            println!("{} No symbol named {}", "✗".bright_red(), args.name);
            return Ok(());
        }
        for symbol in &symbols {
            println!(
                "{:<9} {} {}",
                symbol.kind.label().dimmed(),
                symbol.qualified_name().bold(),
                self.location(&symbol.path, symbol.selection_range.start)
            );
        }
        Ok(())
    }

    async fn refs(self, args: NameArgs) -> Result<()> {
        let (indexer, _) = self.open(false).await?;
        let symbols = indexer.symbols_named(&args.name).await;

        if self.json {
            let out: Vec<_> = symbols
                .iter()
                .map(|symbol| {
                    json!({
                        "symbol": symbol.qualified_name(),
                        "path": symbol.path,
                        "range": symbol.range,
                        "references": symbol.references,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }
        if symbols.is_empty() {
            println!("{} No symbol named {}", "✗".bright_red(), args.name);
            return Ok(());
        }
        for symbol in &symbols {
            println!(
                "{} {} ({} references)",
                symbol.qualified_name().bold(),
                self.location(&symbol.path, symbol.selection_range.start),
                symbol.references.len()
            );
            for reference in &symbol.references {
                println!("  {}", self.location(&reference.path, reference.range.start));
            }
        }
        Ok(())
    }

    async fn watch(self) -> Result<()> {
        let (indexer, report) = self.open(true).await?;
        println!(
            "{} Indexed {} files; watching for changes (Ctrl-C to stop)",
            "▶".bright_blue(),
            report.files_indexed
        );
        let watcher = FileWatcher::spawn(indexer).context("Failed to start file watcher")?;
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        watcher.shutdown().await;
        println!("{} Stopped", "✓".bright_green());
        Ok(())
    }

    /// Constructs the indexer and runs one full build.
    async fn open(&self, with_embeddings: bool) -> Result<(CodebaseIndexer, BuildReport)> {
        let mut builder = CodebaseIndexer::builder(self.settings.indexer.clone());
        let embedding = &self.settings.embedding;
        if with_embeddings && embedding.enabled {
            let embedder = build_embedder(embedding)
                .await
                .context("Failed to initialize embedding provider")?;
            builder = builder.embeddings(EmbeddingManager::new(embedder, embedding));
        }
        let indexer = builder.build().context("Invalid [indexer] settings")?;

        let progress: ProgressCallback = Arc::new(|progress: IndexProgress| {
            debug!(
                "{:?} {}/{} {}",
                progress.phase,
                progress.current,
                progress.total,
                progress.current_file.unwrap_or_default()
            );
        });
        let outcome = indexer
            .build(Some(progress))
            .await
            .context("Failed to index codebase")?;
        match outcome {
            BuildOutcome::Completed(report) => Ok((indexer, report)),
            BuildOutcome::Busy => anyhow::bail!("A build is already running"),
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// `path:line:column`, one-based.
    fn location(&self, path: &Path, position: Position) -> String {
        format!(
            "{}:{}:{}",
            self.relative(path),
            position.line + 1,
            position.character + 1
        )
    }
}
