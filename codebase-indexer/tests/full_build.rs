mod common;

use codescope_codebase_indexer::BuildOutcome;
use codescope_codebase_indexer::CodebaseIndexer;
use codescope_codebase_indexer::FileChange;
use codescope_codebase_indexer::IndexerConfig;
use codescope_codebase_indexer::IndexerError;
use codescope_codebase_indexer::PathFilterSet;
use codescope_codebase_indexer::ReferenceLocation;
use codescope_codebase_indexer::UpdateOutcome;
use codescope_codebase_indexer::discover;
use codescope_embeddings::EmbeddingManager;
use codescope_symbol_extractor::Position;
use codescope_symbol_extractor::Range;
use common::GatedEmbedder;
use common::UnreliableEmbedder;
use common::manager;
use common::write_file;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn root_of(temp_dir: &TempDir) -> std::path::PathBuf {
    dunce::canonicalize(temp_dir.path()).expect("Failed to canonicalize")
}

#[tokio::test]
async fn broken_file_does_not_abort_the_build() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let config_rs = write_file(
        &root,
        "src/config.rs",
        "pub fn load_config(path: &str) -> String {\n    path.to_string()\n}\n",
    );
    let broken_rs = write_file(&root, "src/broken.rs", "fn broken( {\n");
    let main_rs = write_file(
        &root,
        "src/main.rs",
        "fn main() {\n    let cfg = load_config(\"app.toml\");\n    println!(\"{}\", cfg);\n}\n",
    );

    let indexer = CodebaseIndexer::new(IndexerConfig::with_roots([&root]))
        .expect("Failed to create indexer");
    let outcome = indexer.build(None).await.expect("Failed to build");
    let report = outcome.report().expect("build should complete");

    assert_eq!(report.files_indexed, 3);
    assert_eq!(report.files_with_errors, 1);

    let config_entry = indexer.entry(&config_rs).await.expect("config indexed");
    assert!(config_entry.parse_error.is_none());
    assert_eq!(config_entry.symbols.len(), 1);
    assert_eq!(config_entry.symbols[0].name, "load_config");

    let broken_entry = indexer.entry(&broken_rs).await.expect("broken indexed");
    assert!(broken_entry.symbols.is_empty());
    assert!(broken_entry.parse_error.is_some());

    let main_entry = indexer.entry(&main_rs).await.expect("main indexed");
    assert!(main_entry.parse_error.is_none());
    assert_eq!(main_entry.symbols[0].name, "main");

    let load_config = &config_entry.symbols[0];
    let refs = indexer.references_of(&load_config.id()).await;
    assert_eq!(
        refs,
        vec![ReferenceLocation {
            path: main_rs.clone(),
            range: Range::new(Position::new(1, 14), Position::new(1, 25)),
            symbol: load_config.id(),
        }]
    );
}

#[tokio::test]
async fn one_entry_per_discovered_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    write_file(&root, "lib.rs", "pub mod util;\n");
    write_file(&root, "util.rs", "pub fn helper() {}\n");
    write_file(&root, "scripts/run.py", "def run():\n    pass\n");
    write_file(&root, "web/app.ts", "export function start(): void {}\n");
    write_file(&root, "README.md", "# project\n");
    write_file(&root, "target/debug/out.rs", "fn generated() {}\n");
    write_file(&root, "dist/bundle.js", "function bundled() {}\n");

    let indexer = CodebaseIndexer::new(IndexerConfig::with_roots([&root]))
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");

    let filters = Arc::new(PathFilterSet::new(&[root.clone()], &[], true).expect("filters"));
    let discovered = discover(&[root.clone()], &filters).files;

    assert_eq!(indexer.paths().await, discovered);
    assert_eq!(discovered.len(), 5);

    // Markdown has no extractor: indexed as text, no error.
    let readme = indexer
        .entry(&root.join("README.md"))
        .await
        .expect("readme indexed");
    assert!(readme.symbols.is_empty());
    assert!(readme.parse_error.is_none());
}

#[tokio::test]
async fn find_symbol_at_returns_innermost() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let net = write_file(
        &root,
        "net.rs",
        "mod net {\n    pub fn connect() {\n        let retries = 3;\n    }\n}\n",
    );

    let indexer = CodebaseIndexer::new(IndexerConfig::with_roots([&root]))
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");

    let inner = indexer
        .find_symbol_at(&net, Position::new(2, 8))
        .await
        .expect("symbol at position");
    assert_eq!(inner.name, "connect");
    assert_eq!(inner.container.as_deref(), Some("net"));

    let outer = indexer
        .find_symbol_at(&net, Position::new(0, 4))
        .await
        .expect("symbol at position");
    assert_eq!(outer.name, "net");

    assert!(indexer.find_symbol_at(&net, Position::new(9, 0)).await.is_none());
}

#[tokio::test]
async fn second_build_while_building_is_busy_and_changes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let lib = write_file(&root, "lib.rs", "pub fn stable() {}\n");

    let (embedder, gate) = GatedEmbedder::new();
    let indexer = CodebaseIndexer::builder(IndexerConfig::with_roots([&root]))
        .embeddings(manager(embedder.clone()))
        .build()
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");

    let generation = indexer.generation().await;
    let stats = indexer.stats().await;
    let lib_entry = indexer.entry(&lib).await.expect("lib indexed");

    gate.send_replace(false);
    write_file(&root, "extra.rs", "pub fn extra() {}\n");
    let background = {
        let indexer = indexer.clone();
        tokio::spawn(async move { indexer.build(None).await })
    };
    embedder.entered.notified().await;

    let outcome = indexer.build(None).await.expect("busy is not an error");
    assert_eq!(outcome, BuildOutcome::Busy);
    assert_eq!(
        indexer.update(FileChange::Changed(lib.clone())).await.expect("update"),
        UpdateOutcome::SkippedBuildInProgress
    );

    assert_eq!(indexer.generation().await, generation);
    assert_eq!(indexer.stats().await, stats);
    let unchanged = indexer.entry(&lib).await.expect("lib indexed");
    assert!(Arc::ptr_eq(&lib_entry, &unchanged));
    assert!(indexer.symbols_named("extra").await.is_empty());

    gate.send_replace(true);
    let finished = background
        .await
        .expect("build task panicked")
        .expect("Failed to build");
    assert!(!finished.is_busy());
    assert!(indexer.generation().await > generation);
    assert_eq!(indexer.symbols_named("extra").await.len(), 1);
}

#[tokio::test]
async fn build_is_busy_while_an_update_is_in_flight() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let lib = write_file(&root, "lib.rs", "pub fn original() {}\n");

    let (embedder, gate) = GatedEmbedder::new();
    let indexer = CodebaseIndexer::builder(IndexerConfig::with_roots([&root]))
        .embeddings(manager(embedder.clone()))
        .build()
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");
    let generation = indexer.generation().await;

    gate.send_replace(false);
    write_file(&root, "lib.rs", "pub fn edited() {}\n");
    let pending_update = {
        let indexer = indexer.clone();
        let lib = lib.clone();
        tokio::spawn(async move { indexer.update(FileChange::Changed(lib)).await })
    };
    embedder.entered.notified().await;

    // The build must not slip in under the update and be overwritten by it.
    write_file(&root, "lib.rs", "pub fn newest() {}\n");
    let outcome = indexer.build(None).await.expect("busy is not an error");
    assert_eq!(outcome, BuildOutcome::Busy);
    assert_eq!(indexer.generation().await, generation);

    gate.send_replace(true);
    let updated = pending_update
        .await
        .expect("update task panicked")
        .expect("Failed to update");
    assert_eq!(updated, UpdateOutcome::Reindexed);
    assert_eq!(indexer.symbols_named("edited").await.len(), 1);

    let rebuilt = indexer.build(None).await.expect("Failed to build");
    assert!(!rebuilt.is_busy());
    assert_eq!(indexer.symbols_named("newest").await.len(), 1);
    assert!(indexer.symbols_named("edited").await.is_empty());
    let entry = indexer.entry(&lib).await.expect("lib indexed");
    assert_eq!(entry.content, "pub fn newest() {}\n");
}

#[tokio::test]
async fn delete_during_build_is_skipped() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let lib = write_file(&root, "lib.rs", "pub fn kept() {}\n");

    let (embedder, gate) = GatedEmbedder::new();
    let indexer = CodebaseIndexer::builder(IndexerConfig::with_roots([&root]))
        .embeddings(manager(embedder.clone()))
        .build()
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");

    gate.send_replace(false);
    let background = {
        let indexer = indexer.clone();
        tokio::spawn(async move { indexer.build(None).await })
    };
    embedder.entered.notified().await;

    assert_eq!(
        indexer.update(FileChange::Deleted(lib.clone())).await.expect("update"),
        UpdateOutcome::SkippedBuildInProgress
    );
    assert!(indexer.entry(&lib).await.is_some());

    gate.send_replace(true);
    background
        .await
        .expect("build task panicked")
        .expect("Failed to build");
    assert_eq!(indexer.symbols_named("kept").await.len(), 1);
}

#[tokio::test]
async fn embedding_failures_and_timeouts_do_not_fail_the_build() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let fine = write_file(&root, "fine.rs", "pub fn healthy() {}\n");
    let failing = write_file(&root, "failing.rs", "pub fn explode() {}\n");
    let hanging = write_file(&root, "hanging.rs", "pub fn stall() {}\n");

    let embedder = Arc::new(UnreliableEmbedder::new("explode", "stall"));
    let embeddings = EmbeddingManager::with_limits(embedder, 1000, Duration::from_millis(200));
    let indexer = CodebaseIndexer::builder(IndexerConfig::with_roots([&root]))
        .embeddings(embeddings)
        .build()
        .expect("Failed to create indexer");

    let outcome = tokio::time::timeout(Duration::from_secs(30), indexer.build(None))
        .await
        .expect("build must not wait on a hung provider")
        .expect("Failed to build");
    let report = outcome.report().expect("build should complete");

    assert_eq!(report.files_indexed, 3);
    assert_eq!(report.files_with_errors, 0);
    // File and symbol embeddings of `fine.rs`.
    assert_eq!(report.embeddings_computed, 2);
    // One file and one symbol embedding each for the other two files.
    assert_eq!(report.embeddings_failed, 4);

    for path in [&failing, &hanging] {
        let entry = indexer.entry(path).await.expect("entry indexed");
        assert!(entry.embedding.is_none());
        assert_eq!(entry.symbols.len(), 1);
        assert!(entry.symbols[0].embedding.is_none());
    }

    let entry = indexer.entry(&fine).await.expect("entry indexed");
    assert_eq!(entry.embedding, Some(vec![1.0, 0.0]));
    assert_eq!(entry.symbols[0].embedding, Some(vec![1.0, 0.0]));

    let stats = indexer.stats().await;
    assert_eq!(stats.file_embeddings, 1);
    assert_eq!(stats.symbol_embeddings, 1);
}

#[tokio::test]
async fn handles_from_an_old_generation_are_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = root_of(&temp_dir);
    let lib = write_file(&root, "lib.rs", "pub fn target() {}\n");

    let indexer = CodebaseIndexer::new(IndexerConfig::with_roots([&root]))
        .expect("Failed to create indexer");
    indexer.build(None).await.expect("Failed to build");

    let handle = indexer
        .symbol_handle_at(&lib, Position::new(0, 8))
        .await
        .expect("handle");
    let symbol = indexer
        .find_symbol_at(&lib, Position::new(0, 8))
        .await
        .expect("symbol");
    let location = ReferenceLocation {
        path: root.join("other.rs"),
        range: Range::new(Position::new(3, 0), Position::new(3, 6)),
        symbol: symbol.id(),
    };

    indexer
        .attach_reference(&handle, location.clone())
        .await
        .expect("current handle is accepted");

    indexer.build(None).await.expect("Failed to rebuild");
    let err = indexer
        .attach_reference(&handle, location)
        .await
        .expect_err("stale handle must fail");
    assert!(matches!(err, IndexerError::StaleGeneration { .. }));
    assert!(indexer.references_of(&symbol.id()).await.is_empty());
}
