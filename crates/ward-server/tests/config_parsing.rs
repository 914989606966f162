use std::io::Write;

use tempfile::NamedTempFile;
use ward_core::Role;
use ward_server::config::loader::load_config;

fn write_toml(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_values_are_loaded() {
    let file = write_toml(
        r#"
[server]
port = 9090

[engine.escalation]
critical_minutes = 3
critical_target = "head_nurse"

[sweep]
interval_secs = 15

[notifications]
channels = ["log"]

[logging]
level = "debug"
"#,
    );

    let cfg = load_config(file.path().to_str()).unwrap();
    assert_eq!(cfg.server.port, 9090);
    assert_eq!(cfg.engine.escalation.critical_minutes, 3);
    assert_eq!(cfg.engine.escalation.critical_target, Role::HeadNurse);
    assert_eq!(cfg.sweep.interval_secs, 15);
    assert_eq!(cfg.logging.level, "debug");
    // untouched sections keep their defaults
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert!(cfg.sweep.enabled);
}

#[test]
fn test_environment_overrides_file() {
    let file = write_toml(
        r#"
[engine]
due_lookahead_minutes = 90
"#,
    );

    // SAFETY: no other test reads or writes this variable.
    unsafe { std::env::set_var("WARD_STATION__ENGINE__MATERIALIZATION_HORIZON_HOURS", "12") };
    let loaded = load_config(file.path().to_str());
    unsafe { std::env::remove_var("WARD_STATION__ENGINE__MATERIALIZATION_HORIZON_HOURS") };

    let cfg = loaded.unwrap();
    assert_eq!(cfg.engine.materialization_horizon_hours, 12);
    assert_eq!(cfg.engine.due_lookahead_minutes, 90);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_toml(
        r#"
[server]
request_timeout_ms = 0
"#,
    );
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("request_timeout_ms"), "{err}");
}

#[test]
fn test_unknown_role_is_a_deserialize_error() {
    let file = write_toml(
        r#"
[engine.escalation]
high_target = "janitor"
"#,
    );
    let err = load_config(file.path().to_str()).unwrap_err();
    assert!(err.contains("deserialize"), "{err}");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let err = load_config(Some("/definitely/not/here/ward-station.toml")).unwrap_err();
    assert!(err.contains("not found"), "{err}");
}
