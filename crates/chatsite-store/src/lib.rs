pub mod error;
pub mod messages;
pub mod private;
pub mod seed;
pub mod users;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

pub use error::{Result, StoreError};

pub const USERS_FILE: &str = "users.json";
pub const MESSAGES_FILE: &str = "msgs.json";
pub const PRIVATE_DIR: &str = "private_msgs";

/// Flat-file store rooted at a data directory.
///
/// Every operation loads the whole JSON document it touches and mutations
/// rewrite it. Nothing is cached between calls. Writers inside this process
/// are serialized by `write_lock`; separate processes are not coordinated.
pub struct Store {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Store {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir.join(PRIVATE_DIR))?;
        seed::run(dir)?;

        info!("Store opened at {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn users_path(&self) -> PathBuf {
        self.dir.join(USERS_FILE)
    }

    pub(crate) fn messages_path(&self) -> PathBuf {
        self.dir.join(MESSAGES_FILE)
    }

    pub(crate) fn private_dir(&self) -> PathBuf {
        self.dir.join(PRIVATE_DIR)
    }

    /// Run a read-modify-write while holding the store's write lock.
    pub(crate) fn with_write_lock<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f()
    }
}

/// Load a whole document. A missing file reads as the document's default.
pub(crate) fn read_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path) {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite a whole document: pretty JSON to a sibling temp file, then rename.
pub(crate) fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_store;

    #[test]
    fn open_seeds_empty_documents() {
        let t = temp_store();
        let users = fs::read_to_string(t.dir.join(USERS_FILE)).unwrap();
        let msgs = fs::read_to_string(t.dir.join(MESSAGES_FILE)).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&users).unwrap()["users"], serde_json::json!([]));
        assert_eq!(serde_json::from_str::<serde_json::Value>(&msgs).unwrap()["messages"], serde_json::json!([]));
        assert!(t.dir.join(PRIVATE_DIR).is_dir());
    }

    #[test]
    fn reopen_keeps_existing_data() {
        let t = temp_store();
        t.store
            .add_public_message(chatsite_types::models::Message::new("a@x.io".into(), "hello".into()))
            .unwrap();

        let reopened = Store::open(&t.dir).unwrap();
        assert_eq!(reopened.list_public_messages().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let t = temp_store();
        fs::write(t.dir.join(MESSAGES_FILE), "{not json").unwrap();
        assert!(matches!(t.store.list_public_messages(), Err(StoreError::Json(_))));
    }
}
