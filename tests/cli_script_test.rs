//! Integration tests for practice scripts, lines and rehearsal via CLI.
//!
//! These tests verify that:
//! - lines are appended in order and renumbered on delete
//! - replacing lines drops empty ones without reusing their position
//! - deleting a script removes its lines
//! - `mg rehearse` walks a script from stdin and counts a finished run

mod common;

use common::TestEnv;
use predicates::prelude::*;

fn script(env: &TestEnv) -> String {
    env.create(&["script", "add", "First handshake", "--event-type", "handshake"])
}

#[test]
fn test_script_add_defaults() {
    let env = TestEnv::init();
    let script = env.json(&["script", "add", "Signing"]);
    assert_eq!(script["event_type"], "meet_and_greet");
    assert_eq!(script["practice_count"], 0);
    assert_eq!(script["is_favorite"], false);
    assert_eq!(script["lines"].as_array().unwrap().len(), 0);
}

#[test]
fn test_lines_append_and_renumber() {
    let env = TestEnv::init();
    let id = script(&env);

    let first = env.create(&["line", "add", &id, "Hi! I came from Sapporo."]);
    let second = env.json(&["line", "add", &id, "Thank you!", "--speaker", "counterpart"]);
    assert_eq!(second["order"], 1);
    assert_eq!(second["speaker"], "counterpart");
    env.create(&["line", "add", &id, "See you next time!"]);

    env.mg().args(["line", "delete", &first]).assert().success();

    let shown = env.json(&["script", "show", &id]);
    let lines = shown["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["order"], 0);
    assert_eq!(lines[0]["content"], "Thank you!");
    assert_eq!(lines[1]["order"], 1);
}

#[test]
fn test_replace_lines_keeps_gaps() {
    let env = TestEnv::init();
    let id = script(&env);

    let shown = env.json(&[
        "script", "lines", &id, "-l", "self: Hi!", "-l", "counterpart: ", "-l",
        "counterpart: Hello!",
    ]);
    let orders: Vec<u64> = shown["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["order"].as_u64().unwrap())
        .collect();
    assert_eq!(orders, vec![0, 2]);

    let appended = env.json(&["line", "add", &id, "Bye!"]);
    assert_eq!(appended["order"], 3);
}

#[test]
fn test_line_add_to_missing_script() {
    let env = TestEnv::init();

    env.mg()
        .args(["line", "add", "00000000-0000-0000-0000-000000000000", "Hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_script_delete_cascades() {
    let env = TestEnv::init();
    let id = script(&env);
    let line = env.create(&["line", "add", &id, "Hi!"]);
    env.create(&["line", "add", &id, "Bye!"]);

    let deleted = env.json(&["script", "delete", &id]);
    assert_eq!(deleted["children_deleted"], 2);

    env.mg().args(["script", "show", &id]).assert().failure();
    env.mg()
        .args(["line", "delete", &line[..8]])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_script_favorite_sorts_first() {
    let env = TestEnv::init();
    env.create(&["script", "add", "A plain"]);
    let fav = env.create(&["script", "add", "Z favorite"]);
    env.json(&["script", "favorite", &fav]);

    let list = env.json(&["script", "list"]);
    assert_eq!(list["scripts"][0]["title"], "Z favorite");
    assert_eq!(env.json(&["script", "list", "--favorites"])["count"], 1);
}

#[test]
fn test_rehearse_full_run() {
    let env = TestEnv::init();
    let id = script(&env);
    env.json(&[
        "script", "lines", &id, "-l", "self: Hi!", "-l", "counterpart: Welcome!", "-l",
        "self: Bye!",
    ]);

    env.mg()
        .args(["rehearse", &id, "--grace-ms", "0", "-H"])
        .write_stdin("\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/3] you: Hi!"))
        .stdout(predicate::str::contains("♪ Welcome!"))
        .stdout(predicate::str::contains("Practiced 1 time(s)"));

    let shown = env.json(&["script", "show", &id]);
    assert_eq!(shown["practice_count"], 1);
    assert!(shown["last_practiced_at"].is_string());
}

#[test]
fn test_rehearse_quit_early_json() {
    let env = TestEnv::init();
    let id = script(&env);
    env.json(&["script", "lines", &id, "-l", "self: Hi!", "-l", "self: Bye!"]);

    let output = env
        .mg()
        .args(["rehearse", &id])
        .write_stdin("q\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["completed"], false);
    assert_eq!(summary["practice_count"], 0);
    // Transcript goes to stderr in JSON mode
    assert!(String::from_utf8_lossy(&output.stderr).contains("you: Hi!"));
}

#[test]
fn test_rehearse_empty_script_completes() {
    let env = TestEnv::init();
    let id = script(&env);

    let summary = env.json(&["rehearse", &id]);
    assert_eq!(summary["completed"], true);
    assert_eq!(summary["lines"], 0);
    assert_eq!(summary["practice_count"], 1);
}
