//! YAML config file loading and layering.

use assert_fs::prelude::*;
use docsync_core::{
    config::{self, ConfigLayer},
    ConfigError, FailurePolicy, SyncConfig,
};
use predicates::prelude::predicate;
use rstest::rstest;

const ID: &str = "0123456789abcdef0123456789abcdef";

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

#[test]
fn load_full_file() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(
        "folder: /srv/docs\n\
         root: https://www.notion.so/Docs-0123456789abcdef0123456789abcdef\n\
         base_url: https://github.com/acme/docs\n\
         ignore: drafts/**\n\
         policy: strict\n\
         verbose: true\n\
         delay_ms: 500\n\
         index_name: index\n",
    )
    .expect("write");

    let layer = config::load_file_at(file.path()).expect("load");
    assert_eq!(layer.folder.as_deref(), Some(std::path::Path::new("/srv/docs")));
    assert_eq!(layer.policy, Some(FailurePolicy::Strict));
    assert_eq!(layer.delay_ms, Some(500));
    assert_eq!(layer.index_name.as_deref(), Some("index"));
    assert!(layer.token.is_none());
}

#[test]
fn token_in_file_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("token: secret_abc\n").expect("write");

    let err = config::load_file_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn empty_file_is_empty_layer() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str("\n").expect("write");
    assert_eq!(config::load_file_at(file.path()).unwrap(), ConfigLayer::default());
}

#[test]
fn missing_explicit_file_is_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_optional(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[rstest]
#[case("policy: sometimes\n")]
#[case("delay_ms: soon\n")]
#[case("unknown_key: 1\n")]
fn malformed_values_are_parse_errors(#[case] body: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("config.yaml");
    file.write_str(body).expect("write");
    let err = config::load_file_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Layering
// ---------------------------------------------------------------------------

#[test]
fn file_layer_fills_gaps_left_by_cli() {
    let docs = assert_fs::TempDir::new().expect("tempdir");
    docs.child("README.md").write_str("# Hi\n").expect("write");
    docs.child("README.md").assert(predicate::path::exists());

    let file_layer = ConfigLayer {
        folder: Some(docs.path().to_path_buf()),
        root: Some(ID.to_string()),
        policy: Some(FailurePolicy::Strict),
        ..ConfigLayer::default()
    };
    let cli_layer = ConfigLayer {
        token: Some("secret".to_string()),
        policy: Some(FailurePolicy::Ignore),
        ..ConfigLayer::default()
    };

    let cfg = SyncConfig::resolve(cli_layer, file_layer).expect("resolve");
    assert_eq!(cfg.folder, docs.path());
    assert_eq!(cfg.root.as_str(), ID);
    assert_eq!(cfg.policy, FailurePolicy::Ignore, "CLI must win over file");
}

#[test]
fn malformed_root_fails_before_anything_else_runs() {
    let docs = assert_fs::TempDir::new().expect("tempdir");
    let layer = ConfigLayer {
        folder: Some(docs.path().to_path_buf()),
        token: Some("secret".to_string()),
        root: Some("https://www.notion.so/Docs".to_string()),
        ..ConfigLayer::default()
    };
    let err = SyncConfig::resolve(layer, ConfigLayer::default()).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedRootId { .. }));
    assert!(err.to_string().contains("-<page-id>"));
}
