//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end against a stub catalog
//! served from a local TCP listener.

use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Get the binary to test, isolated from the caller's config and proxies.
fn dashplug(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dashplug").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env_remove("DASHPLUG_PLUGINS_DIR")
        .env_remove("DASHPLUG_REPO")
        .env_remove("RUST_LOG");
    for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Stub catalog
// ============================================================================

struct StubCatalog {
    repo_url: String,
    downloads: Arc<AtomicUsize>,
}

const CLOCK_VERSIONS: &str = r#"[{"version":"1.0.0","commit":"abcdef"},{"version":"0.9.0"}]"#;

/// Zip archive shaped like a VCS export: a single `repo-clock-panel-abcdef/` root.
fn clock_archive(version: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.add_directory("repo-clock-panel-abcdef/", options).unwrap();
    writer.start_file("repo-clock-panel-abcdef/plugin.json", options).unwrap();
    write!(
        writer,
        r#"{{"type":"panel","name":"Clock","id":"clock-panel","info":{{"version":"{version}"}}}}"#
    )
    .unwrap();
    writer.add_directory("repo-clock-panel-abcdef/dist/", options).unwrap();
    writer.start_file("repo-clock-panel-abcdef/dist/module.js", options).unwrap();
    writer.write_all(b"define([], function () {});").unwrap();
    writer.finish().unwrap().into_inner()
}

/// Serve the catalog; the first `failing_downloads` downloads answer HTTP 500.
fn start_catalog(failing_downloads: usize) -> StubCatalog {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let downloads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&downloads);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Some(path) = read_request_path(&stream) else { continue };
            let (status, body) = route(&path, &counter, failing_downloads);
            respond(&mut stream, status, &body);
        }
    });

    StubCatalog { repo_url: format!("http://{addr}/api/plugins"), downloads }
}

fn read_request_path(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) if header == "\r\n" || header == "\n" => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    request_line.split_whitespace().nth(1).map(str::to_string)
}

fn route(path: &str, downloads: &AtomicUsize, failing_downloads: usize) -> (u16, Vec<u8>) {
    match path {
        "/api/plugins" => (
            200,
            format!(r#"{{"plugins":[{{"id":"clock-panel","versions":{CLOCK_VERSIONS}}}]}}"#)
                .into_bytes(),
        ),
        "/api/plugins/clock-panel" => (
            200,
            format!(r#"{{"id":"clock-panel","category":"panel","versions":{CLOCK_VERSIONS}}}"#)
                .into_bytes(),
        ),
        p if p.starts_with("/api/plugins/clock-panel/versions/") && p.ends_with("/download") => {
            let attempt = downloads.fetch_add(1, Ordering::SeqCst);
            if attempt < failing_downloads {
                return (500, b"upstream unavailable".to_vec());
            }
            let version = p.split('/').nth(5).unwrap_or_default();
            (200, clock_archive(version))
        }
        _ => (404, b"not found".to_vec()),
    }
}

fn respond(stream: &mut TcpStream, status: u16, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Install and manage dashboard plugins"))
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_install_accepts_version_flag() {
    let home = TempDir::new().unwrap();
    dashplug(&home).args(["install", "--version"]).assert().success();
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_install_help_lists_version_argument() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[VERSION]"));
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dashplug"));
}

// ============================================================================
// Precondition Tests
// ============================================================================

#[test]
fn test_install_requires_plugin_argument() {
    let home = TempDir::new().unwrap();
    dashplug(&home).args(["--path", "plugins", "install"]).assert().failure();
}

#[test]
fn test_install_requires_path() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .args(["--repo", "http://127.0.0.1:9/api/plugins", "install", "clock-panel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing path flag"));
}

#[test]
fn test_install_path_is_a_file() {
    let home = TempDir::new().unwrap();
    let file = home.child("plugins");
    file.write_str("not a directory").unwrap();

    dashplug(&home)
        .arg("--path")
        .arg(file.path())
        .args(["--repo", "http://127.0.0.1:9/api/plugins", "install", "clock-panel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_install_rejects_path_like_plugin_id() {
    let home = TempDir::new().unwrap();
    dashplug(&home)
        .args(["--path", "plugins", "--repo", "http://127.0.0.1:9/api/plugins"])
        .args(["install", "../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid plugin id"));
}

#[test]
fn test_path_from_config_file() {
    let home = TempDir::new().unwrap();
    let plugins = home.child("from-config");
    home.child(".dashplug.toml")
        .write_str(&format!("[plugins]\npath = {:?}\n", plugins.path().display().to_string()))
        .unwrap();

    dashplug(&home)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins installed"));
}

// ============================================================================
// Install Tests
// ============================================================================

#[test]
fn test_install_latest_version() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url, "install", "clock-panel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed clock-panel @ 1.0.0 successfully"));

    home.child("plugins/clock-panel/plugin.json").assert(predicate::str::contains("1.0.0"));
    home.child("plugins/clock-panel/dist/module.js").assert(predicate::path::is_file());
    home.child("plugins/repo-clock-panel-abcdef").assert(predicate::path::missing());
}

#[test]
fn test_install_pinned_version() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url])
        .args(["install", "clock-panel", "0.9.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed clock-panel @ 0.9.0 successfully"));

    home.child("plugins/clock-panel/plugin.json").assert(predicate::str::contains("0.9.0"));
    assert_eq!(catalog.downloads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_install_unknown_version() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url])
        .args(["install", "clock-panel", "2.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find version 2.0.0"));

    assert_eq!(catalog.downloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_install_unknown_plugin() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url, "install", "missing-panel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plugin with id missing-panel not found"));
}

#[test]
fn test_install_retries_failed_download_once() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(1);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url, "install", "clock-panel"])
        .assert()
        .success();

    assert_eq!(catalog.downloads.load(Ordering::SeqCst), 2);
    home.child("plugins/clock-panel/plugin.json").assert(predicate::path::is_file());
}

#[test]
fn test_install_fails_after_second_download_failure() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(2);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url, "install", "clock-panel"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 500"));

    assert_eq!(catalog.downloads.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Listing & Removal Tests
// ============================================================================

#[test]
fn test_list_versions() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--repo", &catalog.repo_url, "list-versions", "clock-panel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0\n0.9.0"));
}

#[test]
fn test_list_remote() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--repo", &catalog.repo_url, "list-remote"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id: clock-panel version: 1.0.0"));
}

#[test]
fn test_ls_and_uninstall() {
    let home = TempDir::new().unwrap();
    let catalog = start_catalog(0);

    dashplug(&home)
        .args(["--path", "plugins", "--repo", &catalog.repo_url, "install", "clock-panel"])
        .assert()
        .success();

    dashplug(&home)
        .args(["--path", "plugins", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clock-panel @ 1.0.0 (Panel)"));

    dashplug(&home)
        .args(["--path", "plugins", "uninstall", "clock-panel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed clock-panel"));

    home.child("plugins/clock-panel").assert(predicate::path::missing());
}
