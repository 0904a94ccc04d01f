//! Dotenv-format key/value file with in-place, atomic key updates.
//!
//! Reads go through `dotenvy`'s parser. Writes rewrite only the line that
//! holds the key (or append it), keep every other line and comment, and
//! replace the file through a temp file in the same directory so a reader
//! never observes a half-written file. Clones of one `EnvStore` share a write
//! lock, so concurrent updates to different keys never drop each other.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Keys the process reads from the config file.
pub mod keys {
    pub const SESSION_ID: &str = "SESSION_ID";
    pub const TARGET_USER: &str = "TARGET_USER";
    pub const OPERATOR_USER_ID: &str = "OPERATOR_USER_ID";
    pub const BOT_TOKEN: &str = "BOT_TOKEN";
    pub const WEBHOOK_URL: &str = "WEBHOOK_URL";
    pub const GUILD_ID: &str = "GUILD_ID";
    pub const UPLOAD_CURSOR: &str = "UPLOAD_CURSOR";
}

/// A dotenv-format file on disk.
///
/// Open the file once and clone the store for every writer; separately
/// constructed stores for the same path do not share the write lock.
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Config file named by `REPOSTER_ENV`, default `.env`.
    pub fn from_env() -> Self {
        let path = std::env::var("REPOSTER_ENV").unwrap_or_else(|_| ".env".to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse every key in the file.
    pub fn read_all(&self) -> StoreResult<HashMap<String, String>> {
        let iter = dotenvy::from_path_iter(&self.path).map_err(|e| self.parse_error(e))?;
        iter.map(|item| item.map_err(|e| self.parse_error(e)))
            .collect()
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    /// Value of `key`, failing if absent or blank.
    pub fn require(&self, key: &str) -> StoreResult<String> {
        self.get(key)?
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StoreError::missing_key(key))
    }

    /// Set `key` to `value`, preserving every other line.
    pub fn set_key(&self, key: &str, value: &str) -> StoreResult<()> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        // Held across read, rewrite and rename. The guarded value is `()`, so
        // a poisoned lock carries no broken state.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let existing = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let updated = rewrite(&existing, key, value);
        self.replace_contents(&updated)?;
        debug!(path = %self.path.display(), key, "Updated config key");
        Ok(())
    }

    fn replace_contents(&self, contents: &str) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }

    fn parse_error(&self, e: dotenvy::Error) -> StoreError {
        match e {
            dotenvy::Error::Io(io) => StoreError::Io(io),
            other => StoreError::Parse {
                path: self.path.clone(),
                message: other.to_string(),
            },
        }
    }
}

/// Replace the assignment of `key` in `text` or append one.
fn rewrite(text: &str, key: &str, value: &str) -> String {
    let assignment = format!("{}={}", key, quote(value));
    let mut replaced = false;
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        if !replaced && assigned_key(line) == Some(key) {
            lines.push(assignment.clone());
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Key assigned on `line`, if it is an assignment.
fn assigned_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, _) = trimmed.split_once('=')?;
    Some(key.trim())
}

/// Render a value so dotenv parsing returns it unchanged.
fn quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_.:/@+,%".contains(c));
    if plain && !value.is_empty() {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '$' => quoted.push_str("\\$"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, EnvStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, contents).unwrap();
        (dir, EnvStore::new(path))
    }

    #[test]
    fn test_set_key_preserves_other_lines() {
        let (_dir, store) = store_with(
            "# reposter settings\nSESSION_ID=old\n\nTARGET_USER=creator\nUPLOAD_CURSOR=4\n",
        );

        store.set_key(keys::SESSION_ID, "fresh123").unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "# reposter settings\nSESSION_ID=fresh123\n\nTARGET_USER=creator\nUPLOAD_CURSOR=4\n"
        );
        assert_eq!(store.require(keys::SESSION_ID).unwrap(), "fresh123");
        assert_eq!(store.require(keys::TARGET_USER).unwrap(), "creator");
    }

    #[test]
    fn test_set_key_appends_missing_key() {
        let (_dir, store) = store_with("TARGET_USER=creator");
        store.set_key(keys::UPLOAD_CURSOR, "0").unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "TARGET_USER=creator\nUPLOAD_CURSOR=0\n");
    }

    #[test]
    fn test_set_key_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = EnvStore::new(dir.path().join("fresh.env"));
        store.set_key(keys::GUILD_ID, "123").unwrap();
        assert_eq!(store.get(keys::GUILD_ID).unwrap().as_deref(), Some("123"));
    }

    #[test]
    fn test_values_round_trip_through_dotenv() {
        let (_dir, store) = store_with("");
        for value in ["a b c", "with \"quotes\"", "x#y", "abc123", ""] {
            store.set_key(keys::SESSION_ID, value).unwrap();
            assert_eq!(store.get(keys::SESSION_ID).unwrap().as_deref(), Some(value));
        }
    }

    #[test]
    fn test_commented_key_is_not_replaced() {
        let (_dir, store) = store_with("#SESSION_ID=commented\nexport SESSION_ID=old\n");
        store.set_key(keys::SESSION_ID, "new").unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "#SESSION_ID=commented\nSESSION_ID=new\n");
    }

    #[test]
    fn test_require_missing_and_blank() {
        let (_dir, store) = store_with("BOT_TOKEN=\n");
        assert!(matches!(
            store.require(keys::BOT_TOKEN),
            Err(StoreError::MissingKey(_))
        ));
        assert!(matches!(
            store.require(keys::WEBHOOK_URL),
            Err(StoreError::MissingKey(_))
        ));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let (_dir, store) = store_with("");
        assert!(matches!(
            store.set_key("BAD KEY", "x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_keep_each_others_keys() {
        let (_dir, store) = store_with("SESSION_ID=start\nUPLOAD_CURSOR=0\n");

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = if t % 2 == 0 { keys::SESSION_ID } else { keys::GUILD_ID };
                        store.set_key(key, &format!("w{}-{}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for i in 1..=50 {
            store.set_key(keys::UPLOAD_CURSOR, &i.to_string()).unwrap();
        }
        for writer in writers {
            writer.join().unwrap();
        }

        let all = store.read_all().unwrap();
        assert_eq!(all.get(keys::UPLOAD_CURSOR).map(String::as_str), Some("50"));
        assert!(all.get(keys::SESSION_ID).unwrap().ends_with("-49"));
        assert!(all.get(keys::GUILD_ID).unwrap().ends_with("-49"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let store = EnvStore::new("/nonexistent/dir/.env");
        assert!(matches!(store.read_all(), Err(StoreError::Io(_))));
    }
}
