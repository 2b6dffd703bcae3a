//! Configuration management for bankr.
//!
//! Loads configuration from ${BANKR_HOME}/config.toml with sensible defaults.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend endpoint.
pub const DEFAULT_BASE_URL: &str = "https://bankingapp-production-57c0.up.railway.app";

/// Default navigation target for expired or missing sessions.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "BANKR_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for bankr configuration and data directories.
    //!
    //! BANKR_HOME resolution order:
    //! 1. BANKR_HOME environment variable (if set)
    //! 2. ~/.config/bankr (default)

    use std::path::PathBuf;

    /// Returns the bankr home directory.
    ///
    /// Checks BANKR_HOME env var first, falls back to ~/.config/bankr
    pub fn bankr_home() -> PathBuf {
        if let Ok(home) = std::env::var("BANKR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("bankr")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        bankr_home().join("config.toml")
    }

    /// Returns the path to the persisted session store.
    pub fn session_path() -> PathBuf {
        bankr_home().join("session.json")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        bankr_home().join("logs")
    }
}

/// Session-related configuration.
///
/// A missing `[session]` table means defaults; a present table without
/// `placeholder_token` disables the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token persisted when a successful login response carries none.
    ///
    /// `None` refuses such logins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_token: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            placeholder_token: Some(Config::DEFAULT_PLACEHOLDER_TOKEN.to_string()),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL
    pub base_url: String,

    /// Navigation target for expired or missing sessions
    pub login_path: String,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    const DEFAULT_PLACEHOLDER_TOKEN: &str = "mock-token";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the backend base URL to use.
    ///
    /// Resolution order:
    /// 1. `BANKR_BASE_URL` env var (if set and non-empty)
    /// 2. `base_url` from config (if non-empty)
    /// 3. Default
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a valid URL.
    pub fn effective_base_url(&self) -> Result<String> {
        let env_value = std::env::var(BASE_URL_ENV).ok();
        Self::resolve_base_url(env_value.as_deref(), &self.base_url)
    }

    fn resolve_base_url(env_value: Option<&str>, configured: &str) -> Result<String> {
        let chosen = env_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| Some(configured.trim()).filter(|v| !v.is_empty()))
            .unwrap_or(DEFAULT_BASE_URL);

        let with_scheme = if chosen.contains("://") {
            chosen.to_string()
        } else {
            format!("https://{chosen}")
        };

        url::Url::parse(&with_scheme).with_context(|| format!("Invalid base URL: {chosen}"))?;
        Ok(with_scheme.trim_end_matches('/').to_string())
    }

    /// Saves only the base_url field to the config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_base_url(base_url: &str) -> Result<()> {
        Self::save_base_url_to(&paths::config_path(), base_url)
    }

    /// Saves only the base_url field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let normalized = Self::resolve_base_url(None, base_url)?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["base_url"] = value(normalized);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        write_atomic(path, content.as_bytes(), false)
    }
}

/// Writes `contents` to a sibling temp file, then renames it over `path`.
/// Parent directories are created as needed. With `private`, the temp file is
/// created 0600 on Unix so the final file never exists with wider permissions.
pub(crate) fn write_atomic(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options
        .open(&tmp_path)
        .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", tmp_path.display()))?;
    drop(file);

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            tmp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session: SessionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.session.placeholder_token.as_deref(), Some("mock-token"));
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "base_url = \"http://localhost:8080\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert!(config.session.placeholder_token.is_some());
    }

    #[test]
    fn test_session_table_without_placeholder_disables_it() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "[session]\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.session.placeholder_token, None);
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("base_url ="));
        assert!(contents.contains("placeholder_token"));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_write_atomic_replaces_file_and_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        write_atomic(&path, b"first", false).unwrap();
        write_atomic(&path, b"second", true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("nested").join("data.json.tmp").exists());
    }

    #[test]
    fn test_save_base_url_preserves_other_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "login_path = \"/signin\"\n").unwrap();

        Config::save_base_url_to(&config_path, "http://127.0.0.1:9000/").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.login_path, "/signin");
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Base URL of the banking backend."));
    }

    #[test]
    fn test_save_base_url_rejects_garbage() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::save_base_url_to(&config_path, "http://exa mple.com").is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_base_url_env_wins_over_config() {
        let url = Config::resolve_base_url(Some("http://127.0.0.1:1234"), "http://config").unwrap();
        assert_eq!(url, "http://127.0.0.1:1234");
    }

    #[test]
    fn test_base_url_blank_env_falls_back_to_config() {
        let url = Config::resolve_base_url(Some("  "), "http://config.local/").unwrap();
        assert_eq!(url, "http://config.local");
    }

    #[test]
    fn test_base_url_without_scheme_gets_https() {
        let url = Config::resolve_base_url(None, "bank.example.com").unwrap();
        assert_eq!(url, "https://bank.example.com");
    }

    #[test]
    fn test_base_url_empty_everywhere_uses_default() {
        let url = Config::resolve_base_url(None, "").unwrap();
        assert_eq!(url, DEFAULT_BASE_URL);
    }
}
