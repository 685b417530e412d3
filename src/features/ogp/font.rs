use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::FontConfig;
use crate::error::AppError;
use crate::storage::BlobStore;

/// 字形样式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        })
    }
}

/// 单个字体面的字节与元数据，只读共享，克隆只增加引用计数
#[derive(Debug, Clone)]
pub struct FontResource {
    pub data: Bytes,
    pub family: Arc<str>,
    pub weight: u16,
    pub style: FontStyle,
}

/// 进程级字体缓存：首次 `ensure()` 从存储加载，之后直接返回内存中的副本。
///
/// 并发的首次调用只有一个会真正访问存储，其余等待同一结果；
/// 加载失败不会被记住，下一次调用会重试。
pub struct FontCache {
    store: Arc<dyn BlobStore>,
    cfg: FontConfig,
    cell: OnceCell<FontResource>,
}

impl FontCache {
    pub fn new(store: Arc<dyn BlobStore>, cfg: FontConfig) -> Self {
        Self {
            store,
            cfg,
            cell: OnceCell::new(),
        }
    }

    pub async fn ensure(&self) -> Result<FontResource, AppError> {
        self.cell.get_or_try_init(|| self.load()).await.cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub fn key(&self) -> &str {
        &self.cfg.key
    }

    async fn load(&self) -> Result<FontResource, AppError> {
        let t0 = Instant::now();
        let data = self
            .store
            .get(&self.cfg.key)
            .await?
            .ok_or_else(|| AppError::FontUnavailable(self.cfg.key.clone()))?;

        tracing::info!(
            key = %self.cfg.key,
            family = %self.cfg.family,
            bytes = data.len(),
            "字体加载完成，耗时: {:?}ms",
            t0.elapsed().as_millis()
        );

        Ok(FontResource {
            data,
            family: Arc::from(self.cfg.family.as_str()),
            weight: self.cfg.weight,
            style: self.cfg.style,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::storage::{MemoryBlobStore, StorageError};

    const KEY: &str = "fonts/NotoSansJP-Regular.otf";

    /// 统计读取次数，每次读取稍作停顿以让并发调用重叠
    #[derive(Default)]
    struct SlowCountingStore {
        inner: MemoryBlobStore,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for SlowCountingStore {
        async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
            self.inner.put(key, bytes).await
        }

        fn describe(&self) -> String {
            "slow-counting(memory)".to_string()
        }
    }

    fn seeded_store() -> Arc<SlowCountingStore> {
        Arc::new(SlowCountingStore {
            inner: MemoryBlobStore::with_objects([(KEY, Bytes::from_static(b"font"))]),
            ..SlowCountingStore::default()
        })
    }

    #[tokio::test]
    async fn repeated_ensure_reads_storage_once() {
        let store = seeded_store();
        let fonts = FontCache::new(store.clone(), FontConfig::default());

        for _ in 0..5 {
            let font = fonts.ensure().await.unwrap();
            assert_eq!(font.data, Bytes::from_static(b"font"));
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_ensure_shares_one_load() {
        let store = seeded_store();
        let fonts = Arc::new(FontCache::new(store.clone(), FontConfig::default()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let fonts = fonts.clone();
                tokio::spawn(async move { fonts.ensure().await })
            })
            .collect();
        for task in futures_util::future::join_all(tasks).await {
            let font = task.unwrap().unwrap();
            assert_eq!(font.data, Bytes::from_static(b"font"));
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert!(fonts.is_loaded());
    }

    #[tokio::test]
    async fn missing_font_is_reported_and_not_memoized() {
        let store = Arc::new(MemoryBlobStore::new());
        let fonts = FontCache::new(store.clone(), FontConfig::default());

        let err = fonts.ensure().await.unwrap_err();
        assert!(matches!(err, AppError::FontUnavailable(ref k) if k == "fonts/NotoSansJP-Regular.otf"));
        assert!(!fonts.is_loaded());

        // 补齐字体后无需重启即可恢复
        store
            .put("fonts/NotoSansJP-Regular.otf", Bytes::from_static(b"font"))
            .await
            .unwrap();
        let font = fonts.ensure().await.unwrap();
        assert_eq!(font.data, Bytes::from_static(b"font"));
        assert_eq!(&*font.family, "NotoSansJP");
        assert_eq!(font.weight, 100);
        assert_eq!(font.style, FontStyle::Normal);
        assert!(fonts.is_loaded());
    }
}
