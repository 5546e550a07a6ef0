//! Client-side configuration.
//!
//! Reads/writes `~/.opsdesk/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the configured API base URL.
pub const API_URL_ENV: &str = "OPSDESK_API_URL";

/// Client configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (e.g. "http://localhost:8000/api").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_url: String,

    /// Session database holding the bearer token.
    /// Defaults to `~/.opsdesk/session.redb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_db: Option<PathBuf>,
}

impl ClientConfig {
    /// Default config file path: ~/.opsdesk/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Pick the API base URL: command-line flag, then environment, then
    /// config file.
    pub fn resolve_api_url(&self, flag: Option<&str>, env: Option<String>) -> anyhow::Result<String> {
        let url = flag
            .map(str::to_string)
            .or(env.filter(|v| !v.is_empty()))
            .unwrap_or_else(|| self.api_url.clone());
        if url.is_empty() {
            anyhow::bail!(
                "No API URL configured. Pass --api-url, set {} or run `opsdesk config set-url <url>`.",
                API_URL_ENV
            );
        }
        Ok(url)
    }

    /// Session database path, falling back to `~/.opsdesk/session.redb`.
    pub fn resolve_token_db(&self) -> PathBuf {
        self.token_db
            .clone()
            .unwrap_or_else(|| dirs_path().join("session.redb"))
    }
}

/// Return the opsdesk config directory (~/.opsdesk).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".opsdesk")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.api_url.is_empty());
        assert!(config.token_db.is_none());
        assert!(config.resolve_token_db().ends_with(".opsdesk/session.redb"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = ClientConfig {
            api_url: "http://localhost:8000/api".to_string(),
            token_db: Some(PathBuf::from("/tmp/s.redb")),
        };
        config.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("api_url"));

        let back = ClientConfig::load(&path).unwrap();
        assert_eq!(back.api_url, "http://localhost:8000/api");
        assert_eq!(back.resolve_token_db(), PathBuf::from("/tmp/s.redb"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.api_url.is_empty());
    }

    #[test]
    fn test_api_url_precedence() {
        let config = ClientConfig {
            api_url: "http://file".to_string(),
            token_db: None,
        };
        assert_eq!(
            config.resolve_api_url(Some("http://flag"), Some("http://env".into())).unwrap(),
            "http://flag"
        );
        assert_eq!(
            config.resolve_api_url(None, Some("http://env".into())).unwrap(),
            "http://env"
        );
        assert_eq!(config.resolve_api_url(None, Some(String::new())).unwrap(), "http://file");
        assert!(ClientConfig::default().resolve_api_url(None, None).is_err());
    }
}
