use std::sync::Arc;

use crate::config::{AppConfig, ImageRenderConfig};
use crate::error::AppError;
use crate::features::ogp::{FontCache, ImagePipeline, RenderPipeline};
use crate::storage::{BlobStore, build_blob_store};

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 对象存储（字体与图片缓存共用）
    pub store: Arc<dyn BlobStore>,
    /// 进程级字体缓存
    pub fonts: Arc<FontCache>,
    /// 缓存旁路图片管线
    pub pipeline: Arc<ImagePipeline>,
    pub image: Arc<ImageRenderConfig>,
}

impl AppState {
    /// 以给定存储组装默认渲染引擎
    pub fn new(config: &AppConfig, store: Arc<dyn BlobStore>) -> Self {
        let renderer = RenderPipeline::standard(&config.image);
        Self::with_renderer(config, store, renderer)
    }

    /// 替换渲染引擎（测试中注入桩实现）
    pub fn with_renderer(
        config: &AppConfig,
        store: Arc<dyn BlobStore>,
        renderer: RenderPipeline,
    ) -> Self {
        let fonts = Arc::new(FontCache::new(store.clone(), config.font.clone()));
        let pipeline = Arc::new(ImagePipeline::new(
            store.clone(),
            fonts.clone(),
            renderer,
            &config.image,
        ));
        Self {
            store,
            fonts,
            pipeline,
            image: Arc::new(config.image.clone()),
        }
    }

    /// 按配置选择存储后端并组装
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store = build_blob_store(&config.storage)?;
        Ok(Self::new(config, store))
    }
}
