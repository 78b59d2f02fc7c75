//! FileKeyValueStore - one file per key under a root directory.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::PersistenceError;

/// File-backed key-value store.
///
/// Keys such as `@lists` are not safe file names, so each key maps to
/// `<root>/<base64url(key)>.kv`. Writes go to a temp file that is synced and
/// renamed over the target, so a crash mid-write leaves the previous value.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileKeyValueStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.kv", URL_SAFE_NO_PAD.encode(key.as_bytes())))
    }
}

fn io_error(operation: &'static str, key: &str) -> impl FnOnce(std::io::Error) -> PersistenceError {
    let key = key.to_string();
    move |source| PersistenceError::Io {
        operation,
        key,
        source,
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", key)(err)),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.root).map_err(io_error("create directory for", key))?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("kv.tmp");

        let mut file = File::create(&temp_path).map_err(io_error("create", key))?;
        file.write_all(&value).map_err(io_error("write", key))?;
        file.sync_all().map_err(io_error("sync", key))?;
        drop(file);

        fs::rename(&temp_path, &path).map_err(io_error("rename", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));
        assert!(store.get("@lists").unwrap().is_none());
    }

    #[test]
    fn set_overwrites_atomically() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set("@lists", b"[1]".to_vec()).unwrap();
        store.set("@lists", b"[2]".to_vec()).unwrap();

        assert_eq!(store.get("@lists").unwrap(), Some(b"[2]".to_vec()));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "temp file left behind: {:?}", names);
    }

    #[test]
    fn keys_map_to_safe_file_names() {
        let store = FileKeyValueStore::new("/data");
        let path = store.path_for("@lists/../x");
        assert_eq!(path.parent(), Some(Path::new("/data")));
        assert!(path.to_string_lossy().ends_with(".kv"));
        assert_ne!(store.path_for("a"), store.path_for("b"));
    }

    #[test]
    fn unreadable_root_is_an_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        let store = FileKeyValueStore::new(&blocker);
        let err = store.set("@lists", b"[]".to_vec()).unwrap_err();
        assert!(err.is_transient());
    }
}
