mod common;

use codescope_codebase_indexer::CodebaseIndexer;
use codescope_codebase_indexer::EntityKey;
use codescope_codebase_indexer::IndexerConfig;
use codescope_codebase_indexer::SearchOptions;
use codescope_codebase_indexer::SearchScope;
use common::KeywordEmbedder;
use common::at_similarity;
use common::manager;
use common::write_file;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

const QUERY: &str = "parse configuration file";

async fn project() -> (TempDir, CodebaseIndexer) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = dunce::canonicalize(temp_dir.path()).expect("Failed to canonicalize");
    write_file(
        &root,
        "config.rs",
        "pub fn load_config(path: &str) -> String {\n    path.to_string()\n}\n",
    );
    write_file(
        &root,
        "view.rs",
        "pub fn render_page(title: &str) -> String {\n    title.to_uppercase()\n}\n",
    );

    let embedder = Arc::new(KeywordEmbedder::new(vec![
        (QUERY, vec![1.0, 0.0]),
        ("load_config", at_similarity(0.82)),
        ("render_page", at_similarity(0.55)),
    ]));
    let indexer = CodebaseIndexer::builder(IndexerConfig::with_roots([&root]))
        .embeddings(manager(embedder))
        .build()
        .expect("Failed to create indexer");
    let outcome = indexer.build(None).await.expect("Failed to build");
    let report = outcome.report().expect("build should complete");
    assert_eq!(report.embeddings_failed, 0);
    (temp_dir, indexer)
}

#[tokio::test]
async fn only_results_above_threshold_are_returned() {
    let (temp_dir, indexer) = project().await;
    let root = dunce::canonicalize(temp_dir.path()).expect("Failed to canonicalize");
    let query = indexer
        .embeddings()
        .expect("embeddings configured")
        .embed_query(QUERY)
        .await
        .expect("query embedded");

    let results = indexer
        .search_similar(
            &query,
            SearchOptions {
                scope: SearchScope::Files,
                top_n: 5,
                min_similarity: 0.7,
            },
        )
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].key,
        EntityKey::File {
            path: root.join("config.rs")
        }
    );
    assert!((results[0].score - 0.82).abs() < 1e-4);
}

#[tokio::test]
async fn lower_threshold_ranks_by_score() {
    let (_temp_dir, indexer) = project().await;
    let query = at_similarity(1.0);

    let results = indexer
        .search_similar(
            &query,
            SearchOptions {
                scope: SearchScope::Symbols,
                top_n: 5,
                min_similarity: 0.5,
            },
        )
        .await;

    let names: Vec<String> = results
        .iter()
        .filter_map(|result| match &result.key {
            EntityKey::Symbol { name, .. } => Some(name.clone()),
            EntityKey::File { .. } => None,
        })
        .collect();
    assert_eq!(
        names,
        vec!["load_config".to_string(), "render_page".to_string()]
    );
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn excerpts_cover_whole_symbol_lines() {
    let (_temp_dir, indexer) = project().await;
    let symbol = indexer
        .symbols_named("load_config")
        .await
        .into_iter()
        .next()
        .expect("symbol indexed");

    let excerpt = indexer
        .excerpt(&EntityKey::Symbol {
            id: symbol.id(),
            name: symbol.name.clone(),
        })
        .await
        .expect("excerpt");
    assert_eq!(
        excerpt.text,
        "pub fn load_config(path: &str) -> String {\n    path.to_string()\n}"
    );
    assert_eq!(excerpt.range, Some(symbol.range));
}
