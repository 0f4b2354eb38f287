use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::compose::RenderMode;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    pub history_capacity: usize,
    pub settle_window_ms: u64,
    pub guard_window_ms: u64,
    pub grid_size: f64,
    pub render_mode: RenderMode,
    pub api_base_url: Option<String>,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            settle_window_ms: 500,
            guard_window_ms: 100,
            grid_size: 8.0,
            render_mode: RenderMode::Authoring,
            api_base_url: None,
        }
    }
}

impl BuilderSettings {
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn guard_window(&self) -> Duration {
        Duration::from_millis(self.guard_window_ms)
    }
}

/// Defaults, then `path` if it exists, then `APP__*` environment variables.
pub fn load_settings(path: impl AsRef<Path>) -> BuilderSettings {
    let path = path.as_ref();
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw).unwrap_or_else(|error| {
            warn!(path = %path.display(), %error, "ignoring unreadable settings file");
            BuilderSettings::default()
        }),
        Err(_) => BuilderSettings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn parse_settings(raw: &str) -> Result<BuilderSettings, toml::de::Error> {
    toml::from_str(raw)
}

/// Applies `APP__*` overrides read through `lookup`. Values that do not
/// parse are ignored.
pub fn apply_env_overrides(settings: &mut BuilderSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__HISTORY_CAPACITY") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.history_capacity = parsed;
        }
    }
    if let Some(v) = lookup("APP__SETTLE_WINDOW_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.settle_window_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__GUARD_WINDOW_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.guard_window_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__GRID_SIZE") {
        if let Ok(parsed) = v.trim().parse::<f64>() {
            settings.grid_size = parsed;
        }
    }
    if let Some(v) = lookup("APP__RENDER_MODE") {
        match v.trim().to_ascii_lowercase().as_str() {
            "authoring" => settings.render_mode = RenderMode::Authoring,
            "preview" => settings.render_mode = RenderMode::Preview,
            other => warn!(value = other, "unknown APP__RENDER_MODE"),
        }
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        let v = v.trim();
        settings.api_base_url = (!v.is_empty()).then(|| v.to_string());
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
