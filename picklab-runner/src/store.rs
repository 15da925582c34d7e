//! Directory-backed key/value store for learning state.
//!
//! One file per key. Keys are escaped into file names so that any key,
//! including ones with `/`, maps to a single file in one flat directory.
//! Writes go to a temporary file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use picklab_core::collaborators::{KeyValueStore, StoreError};

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", escape(key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = unescape(stem).ok_or_else(|| StoreError::Backend(format!("unrecognised file name: {stem}")))?;
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Escapes every byte outside `[A-Za-z0-9_-]` as `%XX`.
fn escape(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn unescape(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_round_trips() {
        for key in ["learning/meta", "learning/bucket/ORB/bullish", "a.b%c d", "plain"] {
            let escaped = escape(key);
            assert!(escaped.bytes().all(|b| is_plain(b) || b == b'%'));
            assert_eq!(unescape(&escaped).as_deref(), Some(key));
        }
        assert_eq!(unescape("bad%4"), None);
    }

    #[test]
    fn put_get_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("state")).unwrap();
        store.put("learning/bucket/ORB/bullish", "{\"a\":1}".into()).unwrap();
        store.put("learning/bucket/HVB/bearish", "{}".into()).unwrap();
        store.put("learning/meta", "{}".into()).unwrap();

        assert_eq!(
            store.get("learning/bucket/ORB/bullish").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(
            store.keys("learning/bucket/").unwrap(),
            vec!["learning/bucket/HVB/bearish", "learning/bucket/ORB/bullish"]
        );

        // Overwrite replaces, and a fresh handle sees the same data.
        store.put("learning/meta", "{\"v\":2}".into()).unwrap();
        let reopened = JsonFileStore::open(store.dir()).unwrap();
        assert_eq!(reopened.get("learning/meta").unwrap().as_deref(), Some("{\"v\":2}"));
        assert_eq!(reopened.keys("").unwrap().len(), 3);
    }
}
