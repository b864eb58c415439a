use std::io::Write;
use std::time::Duration;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.default_ttl(), Duration::from_secs(1800));
}

#[test]
fn json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.logging.json = Some(true);
    raw.logging.level = Some("debug".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn unknown_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn zero_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.store_capacity = 0;

    let err = Settings::from_raw(raw).expect_err("invalid capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.store_capacity",
            ..
        }
    ));
}

#[test]
fn default_keys_must_not_contain_the_separator() {
    let mut raw = RawSettings::default();
    raw.cache.default_keys = vec!["tenant:3".to_string()];

    let err = Settings::from_raw(raw).expect_err("invalid default key");
    assert!(err.to_string().contains("tenant:3"));
}

#[test]
#[serial]
fn explicit_file_is_layered_over_defaults() {
    let file = toml_file(
        r#"
[logging]
level = "warn"

[cache]
store_capacity = 64
default_keys = ["tenant-3"]
populate_on_write = false
"#,
    );

    let settings = load(Some(file.path())).expect("settings load");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert_eq!(settings.cache.store_capacity, 64);
    assert_eq!(settings.cache.default_keys, vec!["tenant-3".to_string()]);
    assert!(!settings.cache.populate_on_write);
    assert!(settings.cache.enabled);
}

#[test]
#[serial]
fn missing_explicit_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.toml");

    let err = load(Some(&path)).expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}

#[test]
#[serial]
fn environment_overrides_files() {
    let file = toml_file(
        r#"
[cache]
store_capacity = 64
"#,
    );

    // SAFETY: serialised with every other test touching the environment.
    unsafe {
        std::env::set_var("TAGCACHE__CACHE__STORE_CAPACITY", "128");
        std::env::set_var("TAGCACHE__CACHE__DEFAULT_KEYS", "tenant-3,eu");
    }
    let result = load(Some(file.path()));
    unsafe {
        std::env::remove_var("TAGCACHE__CACHE__STORE_CAPACITY");
        std::env::remove_var("TAGCACHE__CACHE__DEFAULT_KEYS");
    }

    let settings = result.expect("settings load");
    assert_eq!(settings.cache.store_capacity, 128);
    assert_eq!(
        settings.cache.default_keys,
        vec!["tenant-3".to_string(), "eu".to_string()]
    );
}
