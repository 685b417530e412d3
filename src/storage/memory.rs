use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use axum::body::Bytes;

use super::{BlobStore, StorageError, validate_key};

/// 进程内存对象存储：进程退出即丢失，用于本地开发与测试。
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预置对象创建（例如预先放入字体）
    pub fn with_objects<I, K>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, Bytes)>,
        K: Into<String>,
    {
        let map = objects.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            objects: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        validate_key(key)?;
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.contains_key(key))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_put_roundtrip_and_missing_key() {
        let store = MemoryBlobStore::new();
        assert!(store.get("a/b.png").await.unwrap().is_none());
        assert!(!store.exists("a/b.png").await.unwrap());

        store
            .put("a/b.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(
            store.get("a/b.png").await.unwrap(),
            Some(Bytes::from_static(b"png"))
        );
        assert!(store.exists("a/b.png").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_keys() {
        let store = MemoryBlobStore::new();
        let err = store.put("../escape", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(store.is_empty());
    }
}
