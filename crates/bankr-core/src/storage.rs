//! Durable key-value storage for the session mirror and credential token.
//!
//! `FileStore` keeps a flat JSON object in `<base>/session.json` with
//! restricted permissions (0600). Tokens are never logged or displayed in full.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::api::types::User;
use crate::config::{self, paths};

/// Key holding the serialized user record.
pub const USER_KEY: &str = "user";

/// Key holding the credential token.
pub const TOKEN_KEY: &str = "token";

/// String key-value storage that survives process restarts.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON file backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<BANKR_HOME>/session.json`.
    pub fn default_location() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contents(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session store from {}", self.path.display()))?;
        Ok(Some(contents).filter(|c| !c.trim().is_empty()))
    }

    fn parse(&self, contents: &str) -> Result<BTreeMap<String, String>> {
        serde_json::from_str(contents)
            .with_context(|| format!("Failed to parse session store from {}", self.path.display()))
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match self.read_contents()? {
            Some(contents) => self.parse(&contents),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Entries to rewrite from. Contents that cannot be parsed are discarded
    /// so writes can replace them; I/O errors still surface.
    fn load_for_write(&self) -> Result<BTreeMap<String, String>> {
        let Some(contents) = self.read_contents()? else {
            return Ok(BTreeMap::new());
        };
        Ok(self.parse(&contents).unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "discarding unreadable session store"
            );
            BTreeMap::new()
        }))
    }

    /// Replaces the store atomically: temp file (0600 on Unix), then rename.
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(entries).context("Failed to serialize session store")?;
        config::write_atomic(&self.path, contents.as_bytes(), true)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = self.load_for_write()?;
        entries.remove(key);
        self.save(&entries)
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Typed view over a store: the persisted user mirror plus the token.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn KeyValueStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Credentials backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Returns the persisted token. Empty strings count as absent.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(TOKEN_KEY)?
            .filter(|token| !token.trim().is_empty()))
    }

    /// Returns the persisted user mirror.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or the record is malformed.
    pub fn user(&self) -> Result<Option<User>> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        let user = serde_json::from_str(&raw).context("Failed to parse persisted user record")?;
        Ok(Some(user))
    }

    /// Persists the user mirror and the token together.
    ///
    /// # Errors
    /// Returns an error if either value cannot be written.
    pub fn save(&self, user: &User, token: &str) -> Result<()> {
        let raw = serde_json::to_string(user).context("Failed to serialize user record")?;
        self.store.set(USER_KEY, &raw)?;
        self.store.set(TOKEN_KEY, token)?;
        Ok(())
    }

    /// Removes both the user mirror and the token.
    ///
    /// Both removals are attempted even if the first one fails.
    ///
    /// # Errors
    /// Returns the first removal error.
    pub fn clear(&self) -> Result<()> {
        let user = self.store.remove(USER_KEY);
        let token = self.store.remove(TOKEN_KEY);
        user.and(token)
    }
}

/// Masks a token for display, keeping a short prefix and suffix.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample_user() -> User {
        User {
            id: "0123456789".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Q".to_string(),
            email: "jane@example.com".to_string(),
            account_number: "0123456789".to_string(),
        }
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));

        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        store.remove(TOKEN_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("session.json"));

        store.set(TOKEN_KEY, "abc").unwrap();
        store.set("other", "kept").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get(TOKEN_KEY).is_err());
    }

    #[test]
    fn test_corrupt_file_can_be_cleared_and_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        // Truncated mid-write.
        fs::write(&path, r#"{"user": "{}", "tok"#).unwrap();
        let store = Arc::new(FileStore::new(&path));
        let credentials = Credentials::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);

        credentials.clear().unwrap();
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        credentials.save(&sample_user(), "fresh").unwrap();
        assert_eq!(credentials.token().unwrap().as_deref(), Some("fresh"));
        assert_eq!(credentials.user().unwrap(), Some(sample_user()));
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);

        store.set(TOKEN_KEY, "abc").unwrap();

        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set(TOKEN_KEY, "abc").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.set(TOKEN_KEY, "shared").unwrap();
        assert_eq!(clone.get(TOKEN_KEY).unwrap().as_deref(), Some("shared"));
    }

    #[test]
    fn test_credentials_save_and_clear() {
        let credentials = Credentials::in_memory();
        credentials.save(&sample_user(), "tok-123").unwrap();

        assert_eq!(credentials.user().unwrap(), Some(sample_user()));
        assert_eq!(credentials.token().unwrap().as_deref(), Some("tok-123"));

        credentials.clear().unwrap();
        credentials.clear().unwrap();
        assert_eq!(credentials.user().unwrap(), None);
        assert_eq!(credentials.token().unwrap(), None);
    }

    #[test]
    fn test_credentials_user_record_uses_camel_case() {
        let store = Arc::new(MemoryStore::new());
        let credentials = Credentials::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        credentials.save(&sample_user(), "t").unwrap();

        let raw = store.get(USER_KEY).unwrap().unwrap();
        assert!(raw.contains("\"firstName\":\"Jane\""));
        assert!(raw.contains("\"accountNumber\""));
    }

    #[test]
    fn test_credentials_blank_token_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "  ").unwrap();
        assert_eq!(Credentials::new(store).token().unwrap(), None);
    }

    #[test]
    fn test_credentials_malformed_user_is_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, "[1, 2]").unwrap();
        assert!(Credentials::new(store).user().is_err());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "*****");
        assert_eq!(mask_token("abcdefghijkl"), "abcd...ijkl");
    }
}
