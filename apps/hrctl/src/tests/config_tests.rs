use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("hrctl_config_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("hrctl.toml");
    fs::write(&path, contents).expect("write config");
    path
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_point_at_local_api() {
    let missing = env::temp_dir().join("hrctl_definitely_missing_dir");
    let settings = load_settings_with(None, env_of(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
    assert!(load_settings_with(Some(&missing), env_of(&[])).is_err());
}

#[test]
fn file_values_override_defaults_and_env_overrides_file() {
    let path = temp_config(
        r#"
api_url = "http://hr.internal:8080/"
events_url = "https://events.internal"
departments = ["IT", "LEGAL"]
"#,
    );

    let from_file = load_settings_with(Some(&path), env_of(&[])).expect("settings");
    assert_eq!(from_file.api_url, "http://hr.internal:8080");
    assert_eq!(from_file.events_url, "https://events.internal");
    assert_eq!(from_file.departments, vec!["IT", "LEGAL"]);

    let overridden = load_settings_with(
        Some(&path),
        env_of(&[
            ("HR_API_URL", "http://ignored:1"),
            ("APP__API_URL", "http://winner:2"),
            ("HR_DEPARTMENTS", " SALES , ,HR "),
        ]),
    )
    .expect("settings");
    assert_eq!(overridden.api_url, "http://winner:2");
    assert_eq!(overridden.departments, vec!["SALES", "HR"]);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn rejects_unknown_keys_and_bad_urls() {
    let path = temp_config(r#"database_url = "sqlite://nope""#);
    assert!(load_settings_with(Some(&path), env_of(&[])).is_err());
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");

    assert!(load_settings_with(None, env_of(&[("HR_EVENTS_URL", "localhost:7001")])).is_err());
    assert!(normalize_url("   ").is_err());
    assert_eq!(
        normalize_url(" https://hr.example.com// ").expect("url"),
        "https://hr.example.com"
    );
}

#[test]
fn department_must_be_in_configured_list() {
    let settings = Settings::default();
    settings.validate_department("SALES").expect("known department");
    let err = settings
        .validate_department("sales")
        .expect_err("case sensitive");
    assert!(err.to_string().contains("IT, SALES, FINANCE, HR"));
}
