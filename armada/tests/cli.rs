//! CLI tests exercising the armada binary end to end.
//!
//! Commands that only touch local state run against a seeded temp root; no
//! hosting-provider tool is spawned.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use armada::core::selection::Selection;
use armada::exit_codes;
use armada::io::paths::ArmadaPaths;
use armada::io::state_store;

fn seed_state(root: &Path, selection: &Selection) {
    state_store::save(&ArmadaPaths::new(root).state_path, selection).expect("seed state");
}

fn armada(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armada"))
        .current_dir(root)
        .args(args)
        .output()
        .expect("run armada")
}

#[test]
fn modified_prints_the_modified_set() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut selection = Selection::new("octo");
    selection.modified = vec!["octo/api".parse().expect("id")];
    seed_state(temp.path(), &selection);

    let output = armada(temp.path(), &["modified"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "octo/api\n");
}

#[test]
fn add_appends_to_the_cloned_set_and_persists() {
    let temp = tempfile::tempdir().expect("tempdir");
    seed_state(temp.path(), &Selection::new("octo"));

    let output = armada(temp.path(), &["add", "octo/api"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let paths = ArmadaPaths::new(temp.path());
    let reloaded = state_store::load(&paths.state_path).expect("reload");
    assert_eq!(reloaded.cloned, vec!["octo/api".parse().expect("id")]);
}

#[test]
fn removing_an_absent_repository_is_not_an_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    seed_state(temp.path(), &Selection::new("octo"));

    let output = armada(temp.path(), &["remove", "octo/api"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("not in the cloned set"));
}

#[test]
fn corrupt_state_aborts_before_any_work() {
    let temp = tempfile::tempdir().expect("tempdir");
    let paths = ArmadaPaths::new(temp.path());
    fs::create_dir_all(&paths.armada_dir).expect("mkdir");
    fs::write(&paths.state_path, "not json").expect("write");

    let output = armada(temp.path(), &["modified"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("corrupt"));
}

#[test]
fn a_batch_with_failures_exits_partial() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut selection = Selection::new("octo");
    // Cloned entry with no working copy on disk: the shell cannot even start.
    selection.cloned = vec!["octo/ghost".parse().expect("id")];
    seed_state(temp.path(), &selection);

    let output = armada(temp.path(), &["run", "true"]);
    assert_eq!(output.status.code(), Some(exit_codes::PARTIAL));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("attempted 1, succeeded 0, failed 1"));
    assert!(stdout.contains("failed octo/ghost"));
}

#[test]
fn a_clean_batch_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut selection = Selection::new("octo");
    selection.cloned = vec!["octo/api".parse().expect("id")];
    seed_state(temp.path(), &selection);
    fs::create_dir_all(temp.path().join("repos/octo/api")).expect("mkdir");

    let output = armada(temp.path(), &["run", "echo hello"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello"));
    assert!(stdout.contains("attempted 1, succeeded 1, failed 0"));
}
