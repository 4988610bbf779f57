use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::error::ClientError;

pub const DEFAULT_SETTINGS_FILE: &str = "lomito.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub geocoding_api_key: Option<String>,
    pub user_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000/".into(),
            request_timeout_secs: 60,
            geocoding_api_key: None,
            user_id: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with a guaranteed trailing slash so relative joins keep the
    /// tunnel path prefix.
    pub fn base_url(&self) -> Result<url::Url, ClientError> {
        let raw = self.api_url.trim();
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        url::Url::parse(&normalized)
            .map_err(|e| ClientError::Config(format!("invalid api_url '{raw}': {e}")))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    geocoding_api_key: Option<String>,
    user_id: Option<String>,
}

/// Defaults, then `lomito.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(DEFAULT_SETTINGS_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    match toml::from_str::<FileSettings>(&raw) {
        Ok(file_cfg) => {
            if let Some(v) = file_cfg.api_url {
                settings.api_url = v;
            }
            if let Some(v) = file_cfg.request_timeout_secs {
                settings.request_timeout_secs = v;
            }
            if let Some(v) = file_cfg.geocoding_api_key {
                settings.geocoding_api_key = Some(v);
            }
            if let Some(v) = file_cfg.user_id {
                settings.user_id = Some(v);
            }
        }
        Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable settings file"),
    }
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let first = |keys: &[&str]| keys.iter().find_map(|key| lookup(*key));

    if let Some(v) = first(&["APP__API_URL", "LOMITO_API_URL"]) {
        settings.api_url = v;
    }
    if let Some(v) = first(&["APP__TIMEOUT_SECS", "LOMITO_TIMEOUT_SECS"]) {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring non-numeric timeout override"),
        }
    }
    if let Some(v) = first(&["APP__GEOCODING_KEY", "LOMITO_GEOCODING_KEY"]) {
        settings.geocoding_api_key = Some(v);
    }
    if let Some(v) = first(&["APP__USER_ID", "LOMITO_USER_ID"]) {
        settings.user_id = Some(v);
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
