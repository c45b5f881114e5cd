use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use tokio::fs;
use uuid::Uuid;
use crate::error::StoreError;
use super::KeyValueStore;

/// Stores each key in its own file under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Maps a key onto a file name. Bytes outside `[A-Za-z0-9_-]` are written as
/// `%XX` so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        // Each write gets its own temp file so concurrent sets of one key
        // never rename each other's file away.
        let tmp = self.dir.join(format!("{}.{}.tmp", encode_key(key), Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, value).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("followup-chat-{}", Uuid::new_v4()))
    }

    #[test]
    fn keys_are_encoded_injectively() {
        assert_eq!(encode_key("conv:exp1"), "conv%3Aexp1");
        assert_eq!(encode_key("../x"), "%2E%2E%2Fx");
        assert_ne!(encode_key("a:b"), encode_key("a%3Ab"));
    }

    #[tokio::test]
    async fn set_get_remove_roundtrip_on_disk() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        assert_eq!(store.get("conv:1").await.unwrap(), None);
        store.set("conv:1", "{\"a\":1}").await.unwrap();
        assert_eq!(store.get("conv:1").await.unwrap().as_deref(), Some("{\"a\":1}"));
        store.remove("conv:1").await.unwrap();
        store.remove("conv:1").await.unwrap();
        assert_eq!(store.get("conv:1").await.unwrap(), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn concurrent_sets_of_one_key_all_succeed() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        let (a, b, c) = tokio::join!(
            store.set("conv:1", "\"a\""),
            store.set("conv:1", "\"b\""),
            store.set("conv:1", "\"c\"")
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        let stored = store.get("conv:1").await.unwrap().unwrap();
        assert!(["\"a\"", "\"b\"", "\"c\""].contains(&stored.as_str()));

        let mut leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        leftovers.sort();
        assert_eq!(leftovers, ["conv%3A1.json"]);
        let _ = std::fs::remove_dir_all(dir);
    }
}
