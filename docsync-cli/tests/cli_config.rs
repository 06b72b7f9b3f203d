use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ROOT: &str = "0123456789abcdef0123456789abcdef";

/// `docsync` with a scrubbed environment and an empty config directory.
fn docsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("docsync").expect("docsync binary");
    cmd.env_clear()
        .env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    docsync(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync").and(predicate::str::contains("plan")));
}

#[test]
fn missing_token_names_the_variable() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    docsync(&home)
        .args(["sync", "--root", ROOT, "--folder"])
        .arg(docs.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOTION_TOKEN"));
}

#[test]
fn malformed_root_is_rejected_before_any_request() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    docsync(&home)
        .args(["plan", "--token", "secret", "--root", "not-a-page"])
        .arg("--folder")
        .arg(docs.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-page"));
}

#[test]
fn missing_folder_is_reported() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    docsync(&home)
        .env("NOTION_TOKEN", "secret")
        .env("NOTION_ROOT_ID", ROOT)
        .arg("sync")
        .arg("--folder")
        .arg(docs.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent"));
}

#[test]
fn unknown_policy_is_rejected() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    docsync(&home)
        .args(["sync", "--token", "secret", "--root", ROOT, "--policy", "lenient"])
        .arg("--folder")
        .arg(docs.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("lenient"));
}

#[test]
fn explicit_config_file_must_exist() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    docsync(&home)
        .args(["sync", "--token", "secret", "--root", ROOT])
        .arg("--folder")
        .arg(docs.path())
        .arg("--config")
        .arg(home.path().join("nope.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn config_file_with_unknown_key_is_rejected() {
    let home = TempDir::new().unwrap();
    let docs = TempDir::new().unwrap();
    let file = home.path().join("docsync.yaml");
    std::fs::write(&file, "root: 0123456789abcdef0123456789abcdef\ncolour: blue\n").unwrap();
    docsync(&home)
        .args(["plan", "--token", "secret"])
        .arg("--folder")
        .arg(docs.path())
        .arg("--config")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
}
