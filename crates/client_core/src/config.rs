use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::domain::ViewKey;
use tracing::warn;
use url::Url;

pub const CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleSettings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub bulk_unit_timeout_secs: u64,
    pub session_dir: Option<PathBuf>,
    pub session_key: String,
    pub persisted_views: Vec<ViewKey>,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080/api/".into(),
            api_token: None,
            request_timeout_secs: 30,
            bulk_unit_timeout_secs: 60,
            session_dir: None,
            session_key: "console-session".into(),
            persisted_views: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_url: Option<String>,
    api_token: Option<String>,
    request_timeout_secs: Option<u64>,
    bulk_unit_timeout_secs: Option<u64>,
    session_dir: Option<PathBuf>,
    session_key: Option<String>,
    persisted_views: Option<Vec<String>>,
}

impl ConsoleSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn bulk_unit_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_unit_timeout_secs.max(1))
    }

    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.api_url.trim())
            .with_context(|| format!("invalid api url '{}'", self.api_url))?;
        if url.cannot_be_a_base() {
            bail!("api url '{}' cannot be used as a base url", self.api_url);
        }
        Ok(url)
    }
}

/// Defaults, then `console.toml` in the working directory, then environment.
pub fn load_settings() -> ConsoleSettings {
    let raw = fs::read_to_string(CONFIG_FILE).ok();
    settings_from_sources(raw.as_deref(), |name| std::env::var(name).ok())
}

pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ConsoleSettings {
    let mut settings = ConsoleSettings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!("ignoring unreadable {CONFIG_FILE}: {err}"),
        }
    }

    if let Some(v) = env("CONSOLE_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v).filter(|token| !token.trim().is_empty());
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = env("APP__BULK_UNIT_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.bulk_unit_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__SESSION_DIR") {
        settings.session_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__SESSION_KEY") {
        settings.session_key = v;
    }
    if let Some(v) = env("APP__PERSISTED_VIEWS") {
        settings.persisted_views = parse_view_list(v.split(','));
    }

    settings
}

fn apply_file_settings(settings: &mut ConsoleSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if file_cfg.api_token.is_some() {
        settings.api_token = file_cfg.api_token;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.bulk_unit_timeout_secs {
        settings.bulk_unit_timeout_secs = v;
    }
    if file_cfg.session_dir.is_some() {
        settings.session_dir = file_cfg.session_dir;
    }
    if let Some(v) = file_cfg.session_key {
        settings.session_key = v;
    }
    if let Some(views) = file_cfg.persisted_views {
        settings.persisted_views = parse_view_list(views.iter().map(String::as_str));
    }
}

fn parse_view_list<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<ViewKey> {
    raw.map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ViewKey::from)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
