#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, Response};
use ogp_backend::config::AppConfig;
use ogp_backend::storage::{BlobStore, MemoryBlobStore, StorageError};
use ogp_backend::{AppState, build_router};
use tower::ServiceExt;

pub const FONT: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/resources/fonts/DejaVuSans.ttf"
));

pub const FONT_KEY: &str = "fonts/NotoSansJP-Regular.otf";

/// 记录调用次数、可注入写入失败的存储
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryBlobStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub fail_puts: AtomicBool,
}

impl CountingStore {
    pub fn with_objects<const N: usize>(objects: [(&str, Bytes); N]) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBlobStore::with_objects(objects),
            ..Self::default()
        })
    }

    pub fn with_font() -> Arc<Self> {
        Self::with_objects([(FONT_KEY, Bytes::from_static(FONT))])
    }

    /// 直接写入底层存储，不计数
    pub async fn seed(&self, key: &str, bytes: Bytes) {
        self.inner.put(key, bytes).await.expect("seed");
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).await.expect("memory get")
    }
}

#[async_trait]
impl BlobStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Network("injected put failure".into()));
        }
        self.inner.put(key, bytes).await
    }

    fn describe(&self) -> String {
        "counting(memory)".to_string()
    }
}

pub fn app_with(config: &AppConfig, store: Arc<CountingStore>) -> Router {
    build_router(AppState::new(config, store), &config.api)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, uri: &str) -> Response<Body> {
    app.clone().oneshot(get(uri)).await.expect("oneshot")
}

pub async fn body_bytes(resp: Response<Body>) -> Bytes {
    to_bytes(resp.into_body(), usize::MAX).await.expect("body")
}
