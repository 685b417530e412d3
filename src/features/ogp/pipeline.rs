//! 缓存旁路图片管线：内存层 → 对象存储 → 渲染并回写。

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use moka::future::Cache;

use crate::config::ImageRenderConfig;
use crate::error::AppError;
use crate::storage::BlobStore;

use super::font::FontCache;
use super::renderer::{CanvasSize, RenderPipeline};
use super::template::ogp_template;
use super::types::CacheKey;

/// 图片字节的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// 进程内存层命中，或合并到了其他请求的加载
    Memory,
    /// 对象存储命中
    Store,
    /// 本次请求渲染并写回
    Rendered,
}

#[derive(Debug, Clone)]
struct CachedImage {
    bytes: Bytes,
    origin: ImageOrigin,
}

/// `resolve` 的结果
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Bytes,
    pub origin: ImageOrigin,
    /// 本次请求没有触发渲染
    pub from_cache: bool,
}

pub struct ImagePipeline {
    store: Arc<dyn BlobStore>,
    fonts: Arc<FontCache>,
    renderer: RenderPipeline,
    size: CanvasSize,
    memory: Cache<String, CachedImage>,
    memory_enabled: bool,
}

impl ImagePipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        fonts: Arc<FontCache>,
        renderer: RenderPipeline,
        cfg: &ImageRenderConfig,
    ) -> Self {
        let memory = Cache::builder()
            .weigher(|_k, v: &CachedImage| u32::try_from(v.bytes.len()).unwrap_or(u32::MAX))
            .max_capacity(cfg.memory_cache_max_bytes)
            .time_to_live(Duration::from_secs(cfg.memory_cache_ttl_secs))
            .time_to_idle(Duration::from_secs(cfg.memory_cache_tti_secs))
            .build();
        Self {
            store,
            fonts,
            renderer,
            size: CanvasSize {
                width: cfg.width,
                height: cfg.height,
            },
            memory,
            memory_enabled: cfg.memory_cache_enabled,
        }
    }

    /// 返回键对应的 PNG。
    ///
    /// 同一键的并发请求合并为一次存储查询（未命中时为一次渲染 + 写回）；
    /// 任何一步失败都不会写入任何缓存层，下次请求从头重试。
    pub async fn resolve(&self, key: &CacheKey) -> Result<ResolvedImage, AppError> {
        let entry = self
            .memory
            .entry_by_ref(key.as_str())
            .or_try_insert_with(self.load_or_render(key))
            .await
            .map_err(Arc::unwrap_or_clone)?;

        let fresh = entry.is_fresh();
        let CachedImage { bytes, origin } = entry.into_value();
        if !self.memory_enabled {
            // 只借用 single-flight，不保留副本
            self.memory.invalidate(key.as_str()).await;
        }

        let origin = if fresh { origin } else { ImageOrigin::Memory };
        Ok(ResolvedImage {
            bytes,
            origin,
            from_cache: origin != ImageOrigin::Rendered,
        })
    }

    async fn load_or_render(&self, key: &CacheKey) -> Result<CachedImage, AppError> {
        if let Some(bytes) = self.store.get(key.as_str()).await? {
            tracing::debug!(key = %key, bytes = bytes.len(), "对象存储命中");
            return Ok(CachedImage {
                bytes,
                origin: ImageOrigin::Store,
            });
        }

        let t0 = Instant::now();
        let font = self.fonts.ensure().await?;
        let png = Bytes::from(
            self.renderer
                .render_async(ogp_template(), font, self.size)
                .await?,
        );
        let t_render = t0.elapsed();

        if let Err(e) = self.store.put(key.as_str(), png.clone()).await {
            tracing::error!(key = %key, "渲染结果写回失败: {}", e);
            return Err(e.into());
        }

        tracing::info!(
            key = %key,
            bytes = png.len(),
            "图片渲染并写回完成: 渲染={:?}, 总计={:?}",
            t_render,
            t0.elapsed()
        );
        Ok(CachedImage {
            bytes: png,
            origin: ImageOrigin::Rendered,
        })
    }
}
