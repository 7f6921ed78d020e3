//! Application configuration (`~/.config/fill-light/config.json`).
//!
//! A missing or unreadable file yields the defaults; the app never refuses to
//! start because of its config.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::suggestion::{DEFAULT_ENDPOINT, DEFAULT_MODEL, SuggestionParams};

pub const API_KEY_ENV: &str = "FILL_LIGHT_API_KEY";

fn home_dir() -> PathBuf {
    // Under sudo, keep using the invoking user's home
    let home = std::env::var("SUDO_USER")
        .ok()
        .map(|u| format!("/home/{u}"))
        .or_else(|| std::env::var("HOME").ok())
        .unwrap_or_else(|| "/tmp".into());
    PathBuf::from(home)
}

fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => fallback.iter().fold(home_dir(), |p, part| p.join(part)),
    }
}

pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"]).join("fill-light")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn default_data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"]).join("fill-light")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub preference: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            preference: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    /// Save every applied AI suggestion as a template.
    pub auto_save_suggestions: bool,
    /// Where templates and the log live; defaults to the XDG data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            auto_save_suggestions: true,
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`. A missing file is the default config; an unreadable or
    /// malformed one is an error, so the caller can report it once logging
    /// is up.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn load_from(path: &Path) -> Self {
        Self::try_load_from(path).unwrap_or_else(|err| {
            warn!(error = format!("{err:#}"), "ignoring unreadable config");
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Fills the API key from the environment when the file has none.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.service.api_key.is_none() {
            self.service.api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs.max(1))
    }

    pub fn suggestion_params(&self) -> SuggestionParams {
        SuggestionParams {
            model: self.service.model.clone(),
            api_key: self.service.api_key.clone(),
            preference: self.service.preference.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.service.endpoint, "http://localhost:8000/analyze-image/");
        assert!(cfg.auto_save_suggestions);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{{{").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn corrupt_file_is_reported_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"service": 7}"#).unwrap();

        let err = AppConfig::try_load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.json"));
        assert_eq!(
            AppConfig::try_load_from(&dir.path().join("missing.json")).unwrap(),
            AppConfig::default()
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"service": {"model": "llava"}, "auto_save_suggestions": false}"#)
            .unwrap();
        let cfg = AppConfig::load_from(&path);
        assert_eq!(cfg.service.model, "llava");
        assert_eq!(cfg.service.timeout_secs, 60);
        assert!(!cfg.auto_save_suggestions);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let mut cfg = AppConfig::default();
        cfg.service.preference = Some("warm".into());
        cfg.data_dir = Some(dir.path().join("data"));
        cfg.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path), cfg);
        assert_eq!(cfg.data_dir(), dir.path().join("data"));
    }

    #[test]
    fn env_key_only_fills_gaps() {
        let mut cfg = AppConfig::default();
        cfg.apply_env_with(|_| Some("from-env".into()));
        assert_eq!(cfg.service.api_key.as_deref(), Some("from-env"));

        cfg.apply_env_with(|_| Some("other".into()));
        assert_eq!(cfg.service.api_key.as_deref(), Some("from-env"));

        let mut blank = AppConfig::default();
        blank.apply_env_with(|_| Some("  ".into()));
        assert!(blank.service.api_key.is_none());
    }

    #[test]
    fn params_follow_service_section() {
        let mut cfg = AppConfig::default();
        cfg.service.api_key = Some("k".into());
        let params = cfg.suggestion_params();
        assert_eq!(params.model, "llava-phi3");
        assert_eq!(params.api_key.as_deref(), Some("k"));
    }
}
