use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::gemini::{GeminiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Apply the environment key and command-line overrides on top of the file.
    pub fn with_overrides(
        mut self,
        env_key: Option<String>,
        model: Option<String>,
        endpoint: Option<String>,
    ) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if model.is_some() {
            self.model = model;
        }
        if endpoint.is_some() {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn resolve(self) -> Result<GeminiConfig> {
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No Gemini API key configured. Set {} or add \"api_key\" to {}",
                    API_KEY_ENV,
                    Self::get_config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| "config.json".to_string())
                )
            })?;

        Ok(GeminiConfig {
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("gemchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api_key": "abc", "model": "gemini-1.5-pro" }"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let resolved = Config {
            api_key: Some(" key ".into()),
            ..Config::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(resolved.api_key, "key");
        assert_eq!(resolved.model, DEFAULT_MODEL);
        assert_eq!(resolved.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_resolve_requires_key() {
        assert!(Config::default().resolve().is_err());
        let blank = Config {
            api_key: Some("   ".into()),
            ..Config::default()
        };
        assert!(blank.resolve().is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = Config {
            api_key: Some("from-file".into()),
            model: Some("file-model".into()),
            endpoint: Some("http://file".into()),
        };
        let merged = file.with_overrides(
            Some("from-env".into()),
            Some("cli-model".into()),
            None,
        );
        assert_eq!(merged.api_key.as_deref(), Some("from-env"));
        assert_eq!(merged.model.as_deref(), Some("cli-model"));
        assert_eq!(merged.endpoint.as_deref(), Some("http://file"));
    }

    #[test]
    fn test_blank_env_key_is_ignored() {
        let file = Config {
            api_key: Some("from-file".into()),
            ..Config::default()
        };
        let merged = file.with_overrides(Some("".into()), None, None);
        assert_eq!(merged.api_key.as_deref(), Some("from-file"));
    }
}
