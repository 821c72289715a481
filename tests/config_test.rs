//! Integration tests for configuration loading

use lotkeeper::domain::{TieBreak, Zone};
use lotkeeper::infra::Config;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[storage]
path = "/var/lib/lotkeeper/test.db"
busy_timeout_ms = 2500

[zones.counts]
A = 4
B = 2

[allocation]
tie_break = "corner"

[retention]
history_days = 30
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.db_path(), Path::new("/var/lib/lotkeeper/test.db"));
    assert_eq!(config.busy_timeout(), Duration::from_millis(2500));
    assert_eq!(config.tie_break(), TieBreak::Corner);
    assert_eq!(config.history_days(), 30);
    assert_eq!(config.zone_counts().get(&Zone::new("A")), Some(&4));
    assert_eq!(config.zone_counts().get(&Zone::new("B")), Some(&2));
    assert_eq!(config.zone_counts().get(&Zone::new("C")), None);
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[storage]\npath = \"only.db\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.db_path(), Path::new("only.db"));
    assert_eq!(config.busy_timeout(), Duration::from_millis(5000));
    assert_eq!(config.tie_break(), TieBreak::First);
    assert_eq!(config.history_days(), 90);
    // Empty zone table falls back to the seeded defaults
    assert_eq!(config.zone_counts().get(&Zone::new("A")), Some(&50));
}

#[test]
fn test_load_from_path_fallback() {
    // Non-existent file falls back to defaults instead of failing
    let config = Config::load_from_path("/nonexistent/path/config.toml");
    assert_eq!(config.db_path(), Path::new("parking.db"));
    assert_eq!(config.history_days(), 90);
}

#[test]
fn test_invalid_toml_fails() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"not valid toml [[[").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
