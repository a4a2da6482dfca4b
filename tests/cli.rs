use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docqa_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docqa"))
}

const POLICY: &str =
    "The privacy policy requires encryption of all user data at rest and in transit.";

fn write_config(root: &Path) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/docqa.sqlite"

[chunking]
window_size = 1000
overlap = 200

[retrieval]
top_k = 5
min_score = 0.1
"#,
        root.display()
    );

    let config_path = config_dir.join("docqa.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("notes")).unwrap();
    fs::write(files_dir.join("policy.txt"), POLICY).unwrap();
    fs::write(
        files_dir.join("handbook.md"),
        "# Handbook\n\nNew hires receive laptops during their first week.",
    )
    .unwrap();
    fs::write(
        files_dir.join("notes/deploy.html"),
        "<html><body><h1>Deploy</h1><p>Kubernetes clusters run in two regions.</p></body></html>",
    )
    .unwrap();
    fs::write(files_dir.join("notes/diagram.png"), [0u8, 1, 2, 3]).unwrap();

    let config_path = write_config(&root);
    (tmp, config_path, files_dir)
}

fn run_docqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docqa_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docqa binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Upload the test files as `user` and return (id, title) pairs.
fn upload_all(config_path: &Path, files_dir: &Path, user: &str) -> Vec<(String, String)> {
    let (stdout, stderr, success) = run_docqa(
        config_path,
        &["upload", files_dir.to_str().unwrap(), "--user", user],
    );
    assert!(success, "upload failed: {}", stderr);
    assert!(stdout.contains("documents: 3"), "stdout: {}", stdout);
    assert!(stdout.contains("ok"));

    stdout
        .lines()
        .filter(|l| l.contains("chunks)"))
        .map(|l| {
            let mut parts = l.split("  ");
            let id = parts.next().unwrap().to_string();
            let title = parts.next().unwrap().to_string();
            (id, title)
        })
        .collect()
}

fn id_for(docs: &[(String, String)], title: &str) -> String {
    docs.iter()
        .find(|(_, t)| t == title)
        .map(|(id, _)| id.clone())
        .unwrap_or_else(|| panic!("no document titled {}", title))
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path, _files) = setup_test_env();

    let (stdout, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));

    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_degenerate_overlap_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        format!(
            "[db]\npath = \"{}/db.sqlite\"\n\n[chunking]\nwindow_size = 100\noverlap = 100\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_docqa(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr: {}", stderr);
}

#[test]
fn test_upload_walks_directories_and_lists() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    run_docqa(&config_path, &["init"]);

    let docs = upload_all(&config_path, &files_dir, "alice");
    let mut titles: Vec<&str> = docs.iter().map(|(_, t)| t.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["deploy", "handbook", "policy"]);

    let (stdout, _, success) = run_docqa(&config_path, &["list", "--user", "alice"]);
    assert!(success);
    assert!(stdout.contains("policy"));
    assert!(stdout.contains("handbook"));
    assert!(stdout.contains("html"));

    let (stdout, _, success) = run_docqa(&config_path, &["list", "--user", "bob"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_upload_with_title_and_declared_type() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    let path = files_dir.join("policy.txt");

    let (stdout, stderr, success) = run_docqa(
        &config_path,
        &[
            "upload",
            path.to_str().unwrap(),
            "--user",
            "alice",
            "--title",
            "Privacy Policy",
            "--type",
            "text/plain",
        ],
    );
    assert!(success, "upload failed: {}", stderr);
    assert!(stdout.contains("Privacy Policy  (1 chunks)"), "stdout: {}", stdout);
}

#[test]
fn test_sources_ranks_matching_chunk() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    let docs = upload_all(&config_path, &files_dir, "alice");
    let policy_id = id_for(&docs, "policy");

    let (stdout, stderr, success) = run_docqa(
        &config_path,
        &[
            "sources",
            "What does the policy say about encryption?",
            "--user",
            "alice",
        ],
    );
    assert!(success, "sources failed: {}", stderr);
    assert!(stdout.contains("1. [0.14] policy"), "stdout: {}", stdout);
    assert!(stdout.contains(&policy_id));
    assert!(!stdout.contains("2. "), "expected a single source: {}", stdout);

    let (stdout, _, success) = run_docqa(
        &config_path,
        &["sources", "weather forecast tomorrow", "--user", "alice"],
    );
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_sources_without_documents_fails() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    upload_all(&config_path, &files_dir, "alice");

    let (_, stderr, success) = run_docqa(
        &config_path,
        &["sources", "encryption policy", "--user", "bob"],
    );
    assert!(!success);
    assert!(stderr.contains("no documents available"), "stderr: {}", stderr);
}

#[test]
fn test_get_process_and_delete_respect_ownership() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    let docs = upload_all(&config_path, &files_dir, "alice");
    let policy_id = id_for(&docs, "policy");

    let (stdout, _, success) = run_docqa(&config_path, &["get", &policy_id, "--user", "alice"]);
    assert!(success);
    assert!(stdout.contains("--- Chunks (1) ---"));
    assert!(stdout.contains("[chunk 0] chars 0..79"));
    assert!(stdout.contains(POLICY));

    let (_, stderr, success) = run_docqa(&config_path, &["get", &policy_id, "--user", "bob"]);
    assert!(!success);
    assert!(stderr.contains("document not found"));

    let (stdout, _, success) =
        run_docqa(&config_path, &["process", &policy_id, "--user", "alice"]);
    assert!(success);
    assert!(stdout.contains(&format!("processed {}: 1 chunks", policy_id)));

    let (_, _, success) = run_docqa(&config_path, &["delete", &policy_id, "--user", "bob"]);
    assert!(!success);

    let (stdout, _, success) = run_docqa(&config_path, &["delete", &policy_id, "--user", "alice"]);
    assert!(success);
    assert!(stdout.contains("deleted"));

    let (stdout, _, _) = run_docqa(&config_path, &["list", "--user", "alice"]);
    assert!(!stdout.contains("policy"));
    assert!(stdout.contains("handbook"));
}

#[test]
fn test_ask_with_disabled_llm_records_nothing() {
    let (_tmp, config_path, files_dir) = setup_test_env();
    upload_all(&config_path, &files_dir, "alice");

    let (_, stderr, success) = run_docqa(
        &config_path,
        &["ask", "What does the policy say about encryption?", "--user", "alice"],
    );
    assert!(!success);
    assert!(stderr.contains("text generation failed"), "stderr: {}", stderr);

    let (stdout, _, success) = run_docqa(&config_path, &["history", "--user", "alice"]);
    assert!(success);
    assert!(stdout.contains("No queries yet."));
}
