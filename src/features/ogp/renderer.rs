mod flex_svg;
mod raster;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use crate::config::ImageRenderConfig;
use crate::error::AppError;

use super::font::FontResource;
use super::template::TemplateNode;

pub use flex_svg::FlexSvgEngine;
pub use raster::ResvgRasterizer;

/// 输出画布尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const OGP: CanvasSize = CanvasSize {
        width: 1200,
        height: 630,
    };
}

/// 阶段 A：模板树 + 字体 + 尺寸 → SVG。相同输入必须得到逐字节相同的输出。
pub trait VectorEngine: Send + Sync {
    fn layout(
        &self,
        node: &TemplateNode,
        font: &FontResource,
        size: CanvasSize,
    ) -> Result<String, AppError>;
}

/// 阶段 B：SVG → PNG 字节
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &[u8]) -> Result<Vec<u8>, AppError>;
}

/// 渲染管线：两段可替换引擎的纯组合，调用之间不保留任何状态。
#[derive(Clone)]
pub struct RenderPipeline {
    engine: Arc<dyn VectorEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    permits: Arc<Semaphore>,
}

impl RenderPipeline {
    pub fn new(
        engine: Arc<dyn VectorEngine>,
        rasterizer: Arc<dyn Rasterizer>,
        max_parallel: usize,
    ) -> Self {
        Self {
            engine,
            rasterizer,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    /// 默认引擎组合：flexbox 排版出 SVG + resvg 栅格化
    pub fn standard(cfg: &ImageRenderConfig) -> Self {
        Self::new(
            Arc::new(FlexSvgEngine),
            Arc::new(ResvgRasterizer::new(cfg.optimize_speed)),
            cfg.effective_parallelism(),
        )
    }

    /// 同步渲染（CPU 密集，请勿直接在 tokio worker 上调用）
    pub fn render(
        &self,
        node: &TemplateNode,
        font: &FontResource,
        size: CanvasSize,
    ) -> Result<Vec<u8>, AppError> {
        let t0 = Instant::now();
        let svg = self.engine.layout(node, font, size)?;
        let t_layout = t0.elapsed();
        let png = self.rasterizer.rasterize(svg.as_bytes())?;
        let t_total = t0.elapsed();

        tracing::debug!(
            svg_bytes = svg.len(),
            png_bytes = png.len(),
            "渲染分段: 排版={:?}, 栅格化+编码={:?}, 总计={:?}",
            t_layout,
            t_total - t_layout,
            t_total
        );
        Ok(png)
    }

    /// 异步渲染：等待并发许可后放入阻塞线程池执行
    pub async fn render_async(
        &self,
        node: TemplateNode,
        font: FontResource,
        size: CanvasSize,
    ) -> Result<Vec<u8>, AppError> {
        let t_wait = Instant::now();
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("render semaphore closed: {e}")))?;
        tracing::debug!(
            available = self.permits.available_permits(),
            "渲染许可获取完成，等待: {:?}ms",
            t_wait.elapsed().as_millis()
        );

        let pipeline = self.clone();
        spawn_blocking(move || pipeline.render(&node, &font, size))
            .await
            .map_err(|e| AppError::Internal(format!("render task failed: {e}")))?
    }
}
