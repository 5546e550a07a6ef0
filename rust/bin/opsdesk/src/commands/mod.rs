pub mod permissions;
pub mod resource;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use opsdesk_client::Console;
use opsdesk_kv::RedbStore;
use tracing::debug;

use crate::config::{ClientConfig, API_URL_ENV};

/// Build a console for the resolved backend, with the token kept in the
/// configured session database.
pub fn open_console(config_path: &Path, api_url: Option<&str>) -> Result<Console> {
    let config = ClientConfig::load(config_path)?;
    let base_url = config.resolve_api_url(api_url, std::env::var(API_URL_ENV).ok())?;
    let token_db = config.resolve_token_db();
    debug!("api {} session {}", base_url, token_db.display());

    let store = RedbStore::open(&token_db)
        .map_err(|e| anyhow::anyhow!("failed to open session store {}: {}", token_db.display(), e))?;
    Ok(Console::new(base_url, Arc::new(store))?)
}

/// Print a JSON value the way `-o` asks for.
pub fn print_value(value: &serde_json::Value, output_json: bool) -> Result<()> {
    if output_json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Set the API URL stored in the config file.
pub fn set_url(url: &str, config_path: &Path) -> Result<()> {
    let url = url.trim_end_matches('/');
    if url.is_empty() {
        anyhow::bail!("API URL cannot be empty.");
    }
    let mut config = ClientConfig::load(config_path)?;
    config.api_url = url.to_string();
    config.save(config_path)?;
    println!("API URL set to {}.", url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_url_persists_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        set_url("http://localhost:8000/api/", &path).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert!(set_url("/", &path).is_err());
    }

    #[test]
    fn open_console_uses_configured_token_db() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = ClientConfig {
            api_url: "http://127.0.0.1:9".into(),
            token_db: Some(dir.path().join("session.redb")),
        };
        config.save(&path).unwrap();

        let console = open_console(&path, None).unwrap();
        assert!(!console.has_stored_token().unwrap());
        assert!(dir.path().join("session.redb").exists());
    }
}
