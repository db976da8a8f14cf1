//! Input validation, quote stripping and settings-file integration tests.

use assert_fs::prelude::*;
use mirror_core::{
    settings::{self, strip_quotes},
    ConfigError, RawSettings, SyncInterval, ValidationNote,
};
use predicates::prelude::*;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Quote stripping
// ---------------------------------------------------------------------------

#[rstest]
#[case("/data/src", "/data/src")]
#[case("\"/data/src\"", "/data/src")]
#[case("'/data/my src'", "/data/my src")]
#[case("  \"/data/src\"  ", "/data/src")]
#[case("\"/data/src'", "\"/data/src'")]
#[case("\"", "\"")]
#[case("   ", "")]
fn strip_quotes_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(strip_quotes(input), expected);
}

// ---------------------------------------------------------------------------
// 2. Fatal validation errors
// ---------------------------------------------------------------------------

#[test]
fn empty_source_is_fatal() {
    let err = settings::validate("  ", "/tmp/replica", 10).unwrap_err();
    assert!(matches!(err, ConfigError::EmptySource), "got: {err}");
}

#[test]
fn missing_source_is_fatal() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let missing = tmp.child("nope");
    let replica = tmp.child("replica");
    let err = settings::validate(
        missing.path().to_str().unwrap(),
        replica.path().to_str().unwrap(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::SourceMissing { .. }), "got: {err}");
    assert!(err.to_string().contains("doesn't exist"));
    replica.assert(predicate::path::missing());
}

#[test]
fn source_file_is_rejected() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("file.txt");
    file.write_str("x").unwrap();
    let err = settings::validate(
        file.path().to_str().unwrap(),
        tmp.child("replica").path().to_str().unwrap(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::SourceNotDirectory { .. }), "got: {err}");
}

#[test]
fn empty_replica_is_fatal() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let err = settings::validate(tmp.path().to_str().unwrap(), "''", 10).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyReplica), "got: {err}");
}

#[test]
#[cfg(unix)]
fn uncreatable_replica_is_fatal() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let source = tmp.child("src");
    source.create_dir_all().unwrap();
    let blocker = tmp.child("blocker");
    blocker.write_str("a file, not a directory").unwrap();
    let replica = blocker.child("replica");

    let err = settings::validate(
        source.path().to_str().unwrap(),
        replica.path().to_str().unwrap(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ReplicaCreate { .. }), "got: {err}");
}

#[rstest]
#[case("src", "src/replica")]
#[case("replica/src", "replica")]
#[case("same", "same")]
fn nested_roots_are_rejected(#[case] source: &str, #[case] replica: &str) {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child(source).create_dir_all().unwrap();
    let replica_existed = tmp.child(replica).path().exists();
    let err = settings::validate(
        tmp.child(source).path().to_str().unwrap(),
        tmp.child(replica).path().to_str().unwrap(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::OverlappingRoots { .. }), "got: {err}");
    assert_eq!(
        tmp.child(replica).path().exists(),
        replica_existed,
        "rejected roots must not create anything"
    );
}

#[test]
fn replica_nested_below_missing_source_subdir_creates_nothing() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("src").create_dir_all().unwrap();
    let replica = tmp.child("src/deeper/replica");

    let err = settings::validate(
        tmp.child("src").path().to_str().unwrap(),
        replica.path().to_str().unwrap(),
        10,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::OverlappingRoots { .. }), "got: {err}");
    tmp.child("src/deeper").assert(predicate::path::missing());
}

#[test]
fn sibling_with_shared_prefix_is_not_nested() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("src").create_dir_all().unwrap();
    let settings = settings::validate(
        tmp.child("src").path().to_str().unwrap(),
        tmp.child("src-backup").path().to_str().unwrap(),
        10,
    )
    .expect("siblings are valid roots");
    assert!(settings.roots.replica.ends_with("src-backup"));
}

// ---------------------------------------------------------------------------
// 3. Successful validation
// ---------------------------------------------------------------------------

#[test]
fn quoted_paths_are_accepted_and_replica_created() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let source = tmp.child("src");
    source.create_dir_all().unwrap();
    let replica = tmp.child("deep").child("replica");

    let settings = settings::validate(
        &format!("\"{}\"", source.path().display()),
        &format!("'{}'", replica.path().display()),
        45,
    )
    .expect("validate");

    replica.assert(predicate::path::is_dir());
    assert_eq!(settings.interval.as_secs(), 45);
    assert!(settings.roots.source.is_absolute());
    assert!(matches!(
        settings.notes.as_slice(),
        [ValidationNote::ReplicaCreated { .. }]
    ));
}

#[rstest]
#[case(0)]
#[case(-1)]
#[case(i64::MIN)]
fn non_positive_interval_is_coerced(#[case] given: i64) {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("src").create_dir_all().unwrap();
    tmp.child("replica").create_dir_all().unwrap();

    let settings = settings::validate(
        tmp.child("src").path().to_str().unwrap(),
        tmp.child("replica").path().to_str().unwrap(),
        given,
    )
    .expect("coercion is not an error");

    assert_eq!(settings.interval, SyncInterval::default());
    assert_eq!(settings.notes, vec![ValidationNote::IntervalDefaulted { given }]);
    assert!(settings.notes[0].message().contains("default 30 seconds"));
}

// ---------------------------------------------------------------------------
// 4. Settings file
// ---------------------------------------------------------------------------

#[test]
fn settings_file_roundtrip() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let path = tmp.child("conf").child("mirror.yaml");
    let raw = RawSettings {
        source: Some("/data/src".into()),
        replica: Some("/backup/src".into()),
        log_file: None,
        interval_secs: Some(120),
    };
    settings::save_to(path.path(), &raw).expect("save");
    let yaml = std::fs::read_to_string(path.path()).unwrap();
    assert!(yaml.contains("interval_secs: 120"), "got: {yaml}");
    assert!(!yaml.contains("log_file"), "unset fields must be omitted: {yaml}");

    let loaded = settings::load_from(path.path()).expect("load");
    assert_eq!(loaded, raw);
}

#[test]
fn missing_settings_file_is_reported_with_path() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let err = settings::load_from(&tmp.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SettingsNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn unknown_key_is_a_parse_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("bad.yaml");
    file.write_str("source: /a\nintervall: 3\n").unwrap();
    let err = settings::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("bad.yaml"));
}
