//! Shared test infrastructure for integration tests.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Directory holding the named fixture under `tests/fixtures/`.
pub fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Run the built `ocdsmerge` binary with logging pinned for stable output.
#[allow(dead_code)]
pub fn run_ocdsmerge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ocdsmerge"))
        .args(args)
        .env("RUST_LOG", "ocds_merge=warn")
        .output()
        .expect("spawn ocdsmerge")
}

/// Assert success, surfacing stderr on failure.
#[allow(dead_code)]
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "ocdsmerge failed ({:?}):\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[allow(dead_code)]
pub fn read_json(path: &Path) -> Value {
    let bytes = std::fs::read(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
    serde_json::from_slice(&bytes).unwrap_or_else(|err| panic!("parse {}: {err}", path.display()))
}

#[allow(dead_code)]
pub fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}
