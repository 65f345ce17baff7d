use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "hrctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub events_url: String,
    pub departments: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:7001".into(),
            events_url: "http://localhost:7001".into(),
            departments: ["IT", "SALES", "FINANCE", "HR"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    events_url: Option<String>,
    departments: Option<Vec<String>>,
}

impl Settings {
    pub fn validate_department(&self, department: &str) -> anyhow::Result<()> {
        if self.departments.iter().any(|known| known == department) {
            return Ok(());
        }
        bail!(
            "unknown department '{department}'; expected one of: {}",
            self.departments.join(", ")
        )
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if let Some(v) = file.events_url {
            self.events_url = v;
        }
        if let Some(v) = file.departments {
            self.departments = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("HR_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("APP__API_URL") {
            self.api_url = v;
        }

        if let Some(v) = lookup("HR_EVENTS_URL") {
            self.events_url = v;
        }
        if let Some(v) = lookup("APP__EVENTS_URL") {
            self.events_url = v;
        }

        if let Some(v) = lookup("HR_DEPARTMENTS") {
            self.departments = split_list(&v);
        }
        if let Some(v) = lookup("APP__DEPARTMENTS") {
            self.departments = split_list(&v);
        }
    }

    fn normalize(mut self) -> anyhow::Result<Self> {
        self.api_url = normalize_url(&self.api_url).context("invalid api url")?;
        self.events_url = normalize_url(&self.events_url).context("invalid events url")?;
        if self.departments.is_empty() {
            self.departments = Settings::default().departments;
        }
        Ok(self)
    }
}

/// Defaults, then the config file, then environment variables. An explicitly
/// named config file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    config_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            settings.apply_file(file);
        }
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    settings.apply_env(lookup);
    settings.normalize()
}

pub fn normalize_url(raw: &str) -> anyhow::Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if url.is_empty() {
        bail!("url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("url must start with http:// or https://: {url}");
    }
    Ok(url.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
