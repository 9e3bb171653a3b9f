#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable
#![allow(missing_docs)] // integration test crate

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a small, valid two-node story and return its path.
fn story_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("gate.json");
    fs::write(
        &path,
        r#"{
    "id": "the-gate",
    "title": "The Gate",
    "genre": "fantasy",
    "start": "intro",
    "nodes": [
        {
            "id": "intro",
            "segments": [{ "text": "A gate stands before you." }],
            "choices": [
                { "id": "enter", "text": "Enter", "next_node": "finale" },
                { "id": "linger", "text": "Linger outside", "next_node": "intro" }
            ]
        },
        {
            "id": "finale",
            "segments": [{ "text": "You are inside." }]
        }
    ]
}"#,
    )
    .unwrap();
    path
}

/// A story whose only choice points at a missing node.
fn broken_story_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("broken.json");
    fs::write(
        &path,
        r#"{
    "id": "broken",
    "title": "Broken",
    "genre": "fantasy",
    "start": "start",
    "nodes": [
        {
            "id": "start",
            "segments": [{ "text": "..." }],
            "choices": [{ "id": "leap", "text": "Leap", "next_node": "void" }]
        }
    ]
}"#,
    )
    .unwrap();
    path
}

#[test]
fn check_passes_valid_story() {
    let dir = TempDir::new().unwrap();
    let story = story_file(&dir);

    Command::cargo_bin("fw")
        .unwrap()
        .arg("check")
        .arg(&story)
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"))
        .stdout(predicate::str::contains("2 nodes, 1 endings"));
}

#[test]
fn check_rejects_dangling_target() {
    let dir = TempDir::new().unwrap();
    let story = broken_story_file(&dir);

    Command::cargo_bin("fw")
        .unwrap()
        .arg("check")
        .arg(&story)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing node void"))
        .stderr(predicate::str::contains("1 integrity issue(s)"));
}

#[test]
fn check_rejects_unreadable_file() {
    Command::cargo_bin("fw")
        .unwrap()
        .arg("check")
        .arg("no-such-file.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn show_summarizes_story() {
    let dir = TempDir::new().unwrap();
    let story = story_file(&dir);

    Command::cargo_bin("fw")
        .unwrap()
        .arg("show")
        .arg(&story)
        .assert()
        .success()
        .stdout(predicate::str::contains("The Gate"))
        .stdout(predicate::str::contains("start: intro"))
        .stdout(predicate::str::contains("ending"));
}

#[test]
fn play_walks_to_an_ending() {
    let dir = TempDir::new().unwrap();
    let story = story_file(&dir);

    Command::cargo_bin("fw")
        .unwrap()
        .arg("play")
        .arg(&story)
        .write_stdin("1\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("A gate stands before you."))
        .stdout(predicate::str::contains("[1] Enter"))
        .stdout(predicate::str::contains("You are inside."))
        .stdout(predicate::str::contains("THE END"));
}

#[test]
fn play_balance_command_reports_credits() {
    let dir = TempDir::new().unwrap();
    let story = story_file(&dir);

    Command::cargo_bin("fw")
        .unwrap()
        .arg("play")
        .arg(&story)
        .write_stdin("balance\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("credits: 10/10"));
}

#[test]
fn play_rejects_missing_story() {
    Command::cargo_bin("fw")
        .unwrap()
        .arg("play")
        .arg("no-such-file.json")
        .assert()
        .failure();
}
