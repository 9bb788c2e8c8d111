use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(dir.path().join("src")).expect("Failed to create src");
    fs::write(
        dir.path().join("src/config.rs"),
        "pub fn load_config(path: &str) -> String {\n    path.to_string()\n}\n",
    )
    .expect("Failed to write config.rs");
    fs::write(
        dir.path().join("src/main.rs"),
        "fn main() {\n    let cfg = load_config(\"app.toml\");\n    drop(cfg);\n}\n",
    )
    .expect("Failed to write main.rs");
    dir
}

fn codescope(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("codescope").expect("binary built");
    cmd.arg("--root").arg(root).arg("--no-embeddings");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn index_reports_file_count() {
    let dir = project();
    codescope(dir.path())
        .arg("index")
        .assert()
        .success()
        .stdout(contains("Indexed"))
        .stdout(contains("Symbols:"));
}

#[test]
fn index_json_is_machine_readable() {
    let dir = project();
    let output = codescope(dir.path())
        .args(["index", "--json"])
        .output()
        .expect("run codescope");
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["files_indexed"], 2);
    assert_eq!(report["files_with_errors"], 0);
}

#[test]
fn symbols_prints_location() {
    let dir = project();
    codescope(dir.path())
        .args(["symbols", "load_config"])
        .assert()
        .success()
        .stdout(contains("load_config"))
        .stdout(contains("src/config.rs:1:8"));
}

#[test]
fn refs_lists_call_sites() {
    let dir = project();
    codescope(dir.path())
        .args(["refs", "load_config"])
        .assert()
        .success()
        .stdout(contains("(1 references)"))
        .stdout(contains("src/main.rs:2:15"));
}

#[test]
fn search_requires_embeddings() {
    let dir = project();
    codescope(dir.path())
        .args(["search", "configuration"])
        .assert()
        .failure()
        .stderr(contains("Embeddings are disabled"));
}

#[test]
fn context_without_embeddings_is_empty() {
    let dir = project();
    codescope(dir.path())
        .args(["context", "where is the config loaded"])
        .assert()
        .success()
        .stdout(contains("No relevant context"));
}

#[test]
fn settings_file_patterns_are_applied() {
    let dir = project();
    fs::write(
        dir.path().join("codescope.toml"),
        "[indexer]\nignore_patterns = [\"src/main.rs\"]\n",
    )
    .expect("Failed to write settings");

    codescope(dir.path())
        .args(["refs", "load_config"])
        .assert()
        .success()
        .stdout(contains("(0 references)"));
}

#[test]
fn malformed_settings_fail_with_context() {
    let dir = project();
    fs::write(dir.path().join("codescope.toml"), "[indexer\nroots = 3\n")
        .expect("Failed to write settings");

    codescope(dir.path())
        .arg("index")
        .assert()
        .failure()
        .stderr(contains("Failed to parse"));
}
