//! 对象存储客户端
//!
//! 以键值语义（get/put/exists）访问持久化对象存储，同时承载字体资源与图片缓存。
//! 后端由部署环境在启动时通过配置选择：内存、本地目录或 HTTP 桶。

mod fs;
mod http;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::AppError;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

/// 存储错误类型
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// 非法对象键
    #[error("invalid object key `{0}`")]
    InvalidKey(String),

    /// 本地 I/O 错误
    #[error("I/O error on `{key}`: {message}")]
    Io { key: String, message: String },

    /// 后端返回了非预期的 HTTP 状态码
    #[error("unexpected HTTP status {status} for `{key}`")]
    Http { key: String, status: u16 },

    /// 网络错误
    #[error("network error: {0}")]
    Network(String),

    /// 请求超时
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Timeout(err.to_string())
        } else {
            StorageError::Network(err.to_string())
        }
    }
}

/// 键值对象存储契约
///
/// 写入后的对象视为不可变且权威，本系统不存在原地更新与失效路径。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 读取对象，不存在时返回 `Ok(None)`
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// 写入对象（同键覆盖，后写者胜）
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// 用于启动日志的后端描述
    fn describe(&self) -> String;
}

/// 校验对象键：以 `/` 分隔的非空段，禁止 `.`/`..`、反斜杠与控制字符。
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.chars().any(char::is_control)
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// 按对象键后缀推断 Content-Type（写入 HTTP 桶时使用）
pub(crate) fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("otf") => "font/otf",
        Some("ttf") => "font/ttf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// 根据配置构造存储后端
pub fn build_blob_store(cfg: &StorageConfig) -> Result<Arc<dyn BlobStore>, AppError> {
    let store: Arc<dyn BlobStore> = match cfg.backend {
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
        StorageBackend::Fs => Arc::new(FsBlobStore::new(cfg.fs_root_path())),
        StorageBackend::Http => {
            let base_url = cfg.http_base_url.as_deref().ok_or_else(|| {
                AppError::Internal("storage.http_base_url is required for the http backend".into())
            })?;
            let client = crate::http::client_with_timeout(cfg.http_timeout())
                .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
            Arc::new(HttpBlobStore::new(
                base_url,
                cfg.http_token.clone(),
                client,
            ))
        }
    };
    Ok(store)
}
