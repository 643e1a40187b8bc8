use clap::Parser;
use filesame::cli::Cli;
use filesame::error::ExitCode;
use filesame::run_with_output;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use crate::ENV_MUTEX;

fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Run with a config path that does not exist, so no user file is read.
fn run(dir: &Path, args: &[&str]) -> (anyhow::Result<ExitCode>, String) {
    let config = dir.join("no-config.toml");
    let mut argv = vec!["filesame", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();

    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut out = Vec::new();
    let result = run_with_output(cli, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_group_prints_duplicate_lines() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"one");
    let b = write(&dir, "b", b"two");
    let c = write(&dir, "c", b"one");

    let (result, out) = run(
        dir.path(),
        &["group", a.to_str().unwrap(), b.to_str().unwrap(), c.to_str().unwrap()],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(out, format!("{} {}\n", a.display(), c.display()));
}

#[test]
fn test_group_digest_and_separator() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"hello");
    let b = write(&dir, "b", b"HELLO");

    let (result, out) = run(
        dir.path(),
        &["group", "-i", "-p", "-s", ",", a.to_str().unwrap(), b.to_str().unwrap()],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(
        out,
        format!(
            "5d41402abc4b2a76b9719d911017c592,{},{}\n",
            a.display(),
            b.display()
        )
    );
}

#[test]
fn test_group_no_duplicates_exit_code() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"x");
    let b = write(&dir, "b", b"yy");

    let (result, out) = run(dir.path(), &["group", a.to_str().unwrap(), b.to_str().unwrap()]);
    assert_eq!(result.unwrap(), ExitCode::NoMatches);
    assert!(out.is_empty());
}

#[test]
fn test_group_skipped_file_is_partial_success() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"x");
    let b = write(&dir, "b", b"x");
    let missing = dir.path().join("missing");

    let (result, out) = run(
        dir.path(),
        &[
            "group",
            a.to_str().unwrap(),
            missing.to_str().unwrap(),
            b.to_str().unwrap(),
        ],
    );
    assert_eq!(result.unwrap(), ExitCode::PartialSuccess);
    assert_eq!(out.lines().count(), 1);
}

#[test]
fn test_group_two_stage_without_cap_is_an_error() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"x");
    let (result, _) = run(dir.path(), &["group", "-2", a.to_str().unwrap()]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(err.to_string().contains("max bytes"));
}

#[test]
fn test_group_json_output() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"same");
    let b = write(&dir, "b", b"same");

    let (result, out) = run(
        dir.path(),
        &["group", "-o", "json", a.to_str().unwrap(), b.to_str().unwrap()],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["classes"][0]["files"].as_array().unwrap().len(), 2);
    assert_eq!(value["summary"]["exit_code"], 0);
}

#[test]
fn test_dash_mixed_with_paths_is_an_error() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"x");
    let (result, _) = run(dir.path(), &["group", "-", a.to_str().unwrap()]);
    assert!(result.is_err());
}

#[test]
fn test_match_prints_in_input_order() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref", b"payload");
    let x = write(&dir, "x", b"payload");
    let y = write(&dir, "y", b"other!!");
    let z = write(&dir, "z", b"payload");

    let (result, out) = run(
        dir.path(),
        &[
            "match",
            "-f",
            reference.to_str().unwrap(),
            z.to_str().unwrap(),
            y.to_str().unwrap(),
            x.to_str().unwrap(),
        ],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(out, format!("{}\n{}\n", z.display(), x.display()));
}

#[test]
fn test_match_without_matches() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref", b"payload");
    let y = write(&dir, "y", b"other!!");

    let (result, out) = run(
        dir.path(),
        &["match", "-f", reference.to_str().unwrap(), y.to_str().unwrap()],
    );
    assert_eq!(result.unwrap(), ExitCode::NoMatches);
    assert!(out.is_empty());
}
