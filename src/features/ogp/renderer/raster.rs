use std::time::Instant;

use resvg::render;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, Options as UsvgOptions};

use super::Rasterizer;
use crate::error::AppError;

/// 阶段 B 默认实现：resvg 栅格化 + png crate 编码
#[derive(Debug, Clone, Copy)]
pub struct ResvgRasterizer {
    optimize_speed: bool,
}

impl ResvgRasterizer {
    pub fn new(optimize_speed: bool) -> Self {
        Self { optimize_speed }
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &[u8]) -> Result<Vec<u8>, AppError> {
        let t0 = Instant::now();
        let speed = self.optimize_speed;
        // 文字已在阶段 A 转为轮廓，这里不需要字体库
        let opts = UsvgOptions {
            shape_rendering: if speed {
                usvg::ShapeRendering::OptimizeSpeed
            } else {
                usvg::ShapeRendering::GeometricPrecision
            },
            image_rendering: if speed {
                usvg::ImageRendering::OptimizeSpeed
            } else {
                usvg::ImageRendering::OptimizeQuality
            },
            ..Default::default()
        };

        let tree = usvg::Tree::from_data(svg, &opts)
            .map_err(|e| AppError::Render(format!("failed to parse SVG: {e}")))?;
        let t_parse = t0.elapsed();

        let size = tree.size().to_int_size();
        let (width, height) = (size.width(), size.height());
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| AppError::Render(format!("failed to create {width}x{height} pixmap")))?;
        render(&tree, Transform::default(), &mut pixmap.as_mut());
        let t_raster = t0.elapsed();

        // tiny-skia 内部是预乘 alpha，PNG 需要直通 alpha
        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        let mut out = Vec::with_capacity(rgba.len() / 4);
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            if speed {
                encoder.set_compression(png::Compression::Fast);
                encoder.set_filter(png::FilterType::NoFilter);
            } else {
                encoder.set_compression(png::Compression::Default);
                encoder.set_filter(png::FilterType::Paeth);
            }
            let mut writer = encoder
                .write_header()
                .map_err(|e| AppError::Render(format!("PNG write_header error: {e}")))?;
            writer
                .write_image_data(&rgba)
                .map_err(|e| AppError::Render(format!("PNG write_image_data error: {e}")))?;
            writer
                .finish()
                .map_err(|e| AppError::Render(format!("PNG finish error: {e}")))?;
        }
        let t_encode = t0.elapsed();

        tracing::debug!(
            "PNG 栅格化分段: 解析={:?}, 栅格化={:?}, 编码={:?}, 总计={:?}",
            t_parse,
            t_raster - t_parse,
            t_encode - t_raster,
            t_encode
        );
        Ok(out)
    }
}
