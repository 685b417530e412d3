//! 简化版 flexbox 排版 → SVG。
//!
//! 支持：像素/百分比/自动尺寸、padding/margin、主轴方向、justify-content、
//! align-items（含 stretch）、纯色与线性渐变背景、字号与颜色继承。
//! 文字按 cmap + 水平步进逐字排布并输出为字形轮廓 `<path>`（不做 shaping/kerning），
//! 因此产出的 SVG 不依赖系统字体，栅格化结果只取决于输入。

use std::fmt::Write;

use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::{CanvasSize, VectorEngine};
use crate::error::AppError;
use crate::features::ogp::font::FontResource;
use crate::features::ogp::template::{
    AlignItems, Color, FlexDirection, GradientDirection, JustifyContent, Paint, TemplateNode,
};

const DEFAULT_FONT_SIZE: f32 = 16.0;

/// 默认阶段 A 引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct FlexSvgEngine;

impl VectorEngine for FlexSvgEngine {
    fn layout(
        &self,
        node: &TemplateNode,
        font: &FontResource,
        size: CanvasSize,
    ) -> Result<String, AppError> {
        let face = Face::parse(&font.data, 0).map_err(|e| {
            AppError::Render(format!("failed to parse font `{}`: {e}", font.family))
        })?;
        let metrics = FontMetrics::new(&face);
        let root = layout_tree(node, &metrics, size);
        write_svg(&root, &metrics, size)
    }
}

/// 继承的文字样式
#[derive(Debug, Clone, Copy, PartialEq)]
struct TextStyle {
    font_size: f32,
    color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
        }
    }
}

impl TextStyle {
    fn inherit(self, node: &TemplateNode) -> Self {
        let style = node.style();
        Self {
            font_size: style.font_size.unwrap_or(self.font_size),
            color: style.color.unwrap_or(self.color),
        }
    }
}

/// 排版结果：border box（不含 margin），坐标相对父节点 border box 原点
#[derive(Debug, Clone)]
struct LayoutBox<'n> {
    node: &'n TemplateNode,
    text: TextStyle,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    children: Vec<LayoutBox<'n>>,
}

impl LayoutBox<'_> {
    fn outer_width(&self) -> f32 {
        self.width + self.node.style().margin.horizontal()
    }

    fn outer_height(&self) -> f32 {
        self.height + self.node.style().margin.vertical()
    }
}

struct FontMetrics<'f> {
    face: &'f Face<'f>,
    units_per_em: f32,
}

impl<'f> FontMetrics<'f> {
    fn new(face: &'f Face<'f>) -> Self {
        Self {
            face,
            units_per_em: f32::from(face.units_per_em().max(1)),
        }
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em
    }

    fn glyph(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    fn advance(&self, glyph: GlyphId, font_size: f32) -> f32 {
        f32::from(self.face.glyph_hor_advance(glyph).unwrap_or(0)) * self.scale(font_size)
    }

    fn line_height(&self, font_size: f32) -> f32 {
        let units = f32::from(self.face.ascender()) - f32::from(self.face.descender())
            + f32::from(self.face.line_gap());
        units * self.scale(font_size)
    }

    /// 行盒顶部到基线的距离（行距均分到上下）
    fn baseline_offset(&self, font_size: f32) -> f32 {
        (f32::from(self.face.line_gap()) / 2.0 + f32::from(self.face.ascender()))
            * self.scale(font_size)
    }

    fn measure(&self, text: &str, font_size: f32) -> (f32, f32) {
        let width = text
            .chars()
            .map(|ch| self.advance(self.glyph(ch), font_size))
            .sum();
        (width, self.line_height(font_size))
    }
}

/// 对根节点排版，根节点的包含块为整张画布
fn layout_tree<'n>(node: &'n TemplateNode, metrics: &FontMetrics<'_>, size: CanvasSize) -> LayoutBox<'n> {
    let canvas = (size.width as f32, size.height as f32);
    let mut root = measure(node, TextStyle::default(), canvas, (None, None), metrics);
    let margin = node.style().margin;
    root.x = margin.left;
    root.y = margin.top;
    root
}

/// 递归计算节点尺寸并定位子节点。
///
/// `containing` 为父节点内容盒尺寸（百分比的基准），
/// `forced` 为父节点 stretch 时强制的宽/高。
fn measure<'n>(
    node: &'n TemplateNode,
    inherited: TextStyle,
    containing: (f32, f32),
    forced: (Option<f32>, Option<f32>),
    metrics: &FontMetrics<'_>,
) -> LayoutBox<'n> {
    let style = node.style();
    let text = inherited.inherit(node);
    let pad = style.padding;
    let explicit_w = forced.0.or_else(|| style.width.resolve(containing.0));
    let explicit_h = forced.1.or_else(|| style.height.resolve(containing.1));

    let children = match node {
        TemplateNode::Text { content, .. } => {
            let (w, h) = metrics.measure(content, text.font_size);
            return LayoutBox {
                node,
                text,
                x: 0.0,
                y: 0.0,
                width: explicit_w.unwrap_or(w + pad.horizontal()),
                height: explicit_h.unwrap_or(h + pad.vertical()),
                children: Vec::new(),
            };
        }
        TemplateNode::Container { children, .. } => children,
    };

    let avail = (
        (explicit_w.unwrap_or(containing.0) - pad.horizontal()).max(0.0),
        (explicit_h.unwrap_or(containing.1) - pad.vertical()).max(0.0),
    );
    let mut boxes: Vec<LayoutBox<'n>> = children
        .iter()
        .map(|child| measure(child, text, avail, (None, None), metrics))
        .collect();

    let row = style.flex_direction == FlexDirection::Row;
    let main_of = |b: &LayoutBox<'_>| if row { b.outer_width() } else { b.outer_height() };
    let cross_of = |b: &LayoutBox<'_>| if row { b.outer_height() } else { b.outer_width() };

    let intrinsic_main: f32 = boxes.iter().map(main_of).sum();
    let intrinsic_cross = boxes.iter().map(cross_of).fold(0.0_f32, f32::max);
    let (intrinsic_w, intrinsic_h) = if row {
        (intrinsic_main, intrinsic_cross)
    } else {
        (intrinsic_cross, intrinsic_main)
    };

    let width = explicit_w.unwrap_or(intrinsic_w + pad.horizontal());
    let height = explicit_h.unwrap_or(intrinsic_h + pad.vertical());
    let content_w = (width - pad.horizontal()).max(0.0);
    let content_h = (height - pad.vertical()).max(0.0);
    let (content_main, content_cross) = if row {
        (content_w, content_h)
    } else {
        (content_h, content_w)
    };

    // stretch：交叉轴为 auto 的容器子节点撑满内容盒后重新排版
    if style.align_items == AlignItems::Stretch {
        for (child, b) in children.iter().zip(boxes.iter_mut()) {
            let child_style = child.style();
            let is_container = matches!(child, TemplateNode::Container { .. });
            if row && is_container && child_style.height.resolve(content_h).is_none() {
                let h = (content_cross - child_style.margin.vertical()).max(0.0);
                *b = measure(child, text, (content_w, content_h), (None, Some(h)), metrics);
            } else if !row && is_container && child_style.width.resolve(content_w).is_none() {
                let w = (content_cross - child_style.margin.horizontal()).max(0.0);
                *b = measure(child, text, (content_w, content_h), (Some(w), None), metrics);
            }
        }
    }

    let used_main: f32 = boxes.iter().map(main_of).sum();
    let free = content_main - used_main;
    let (mut cursor, gap) = match style.justify_content {
        JustifyContent::Start => (0.0, 0.0),
        JustifyContent::Center => (free / 2.0, 0.0),
        JustifyContent::End => (free, 0.0),
        JustifyContent::SpaceBetween if boxes.len() > 1 => {
            (0.0, free.max(0.0) / (boxes.len() - 1) as f32)
        }
        JustifyContent::SpaceBetween => (0.0, 0.0),
    };

    for b in &mut boxes {
        let margin = b.node.style().margin;
        let (main_size, cross_size) = (main_of(&*b), cross_of(&*b));
        let cross_offset = match style.align_items {
            AlignItems::Start | AlignItems::Stretch => 0.0,
            AlignItems::Center => (content_cross - cross_size) / 2.0,
            AlignItems::End => content_cross - cross_size,
        };
        if row {
            b.x = pad.left + cursor + margin.left;
            b.y = pad.top + cross_offset + margin.top;
        } else {
            b.x = pad.left + cross_offset + margin.left;
            b.y = pad.top + cursor + margin.top;
        }
        cursor += main_size + gap;
    }

    LayoutBox {
        node,
        text,
        x: 0.0,
        y: 0.0,
        width,
        height,
        children: boxes,
    }
}

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::Render(format!("SVG formatting error: {e}"))
}

fn write_svg(root: &LayoutBox<'_>, metrics: &FontMetrics<'_>, size: CanvasSize) -> Result<String, AppError> {
    let mut defs = String::new();
    let mut body = String::new();
    let mut gradient_count = 0usize;
    write_box(root, 0.0, 0.0, metrics, &mut defs, &mut body, &mut gradient_count)?;

    let (w, h) = (size.width, size.height);
    let mut svg = String::with_capacity(defs.len() + body.len() + 256);
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    )
    .map_err(fmt_err)?;
    if !defs.is_empty() {
        writeln!(svg, "<defs>{defs}</defs>").map_err(fmt_err)?;
    }
    svg.push_str(&body);
    svg.push_str("</svg>\n");
    Ok(svg)
}

fn write_box(
    b: &LayoutBox<'_>,
    origin_x: f32,
    origin_y: f32,
    metrics: &FontMetrics<'_>,
    defs: &mut String,
    body: &mut String,
    gradient_count: &mut usize,
) -> Result<(), AppError> {
    let x = origin_x + b.x;
    let y = origin_y + b.y;
    let style = b.node.style();

    if let Some(paint) = &style.background {
        let fill = match paint {
            Paint::Solid(color) => color.to_string(),
            Paint::LinearGradient { direction, stops } => {
                let id = format!("bg{}", *gradient_count);
                *gradient_count += 1;
                let (x2, y2) = match direction {
                    GradientDirection::ToBottom => (0, 1),
                    GradientDirection::ToRight => (1, 0),
                };
                write!(defs, r#"<linearGradient id="{id}" x1="0" y1="0" x2="{x2}" y2="{y2}">"#)
                    .map_err(fmt_err)?;
                for (offset, color) in stops {
                    write!(defs, r#"<stop offset="{offset:.3}" stop-color="{color}"/>"#)
                        .map_err(fmt_err)?;
                }
                defs.push_str("</linearGradient>");
                format!("url(#{id})")
            }
        };
        writeln!(
            body,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{:.2}" height="{:.2}" fill="{fill}"/>"#,
            b.width, b.height
        )
        .map_err(fmt_err)?;
    }

    match b.node {
        TemplateNode::Text { content, .. } => {
            let pad = style.padding;
            let d = glyph_path(content, x + pad.left, y + pad.top, b.text.font_size, metrics);
            if !d.is_empty() {
                writeln!(body, r#"<path d="{}" fill="{}"/>"#, d.trim_end(), b.text.color)
                    .map_err(fmt_err)?;
            }
        }
        TemplateNode::Container { .. } => {
            for child in &b.children {
                write_box(child, x, y, metrics, defs, body, gradient_count)?;
            }
        }
    }
    Ok(())
}

/// 把一行文字转成字形轮廓路径，(x, top) 为行盒左上角
fn glyph_path(text: &str, x: f32, top: f32, font_size: f32, metrics: &FontMetrics<'_>) -> String {
    let mut sink = PathSink {
        d: String::new(),
        scale: metrics.scale(font_size),
        dx: x,
        dy: top + metrics.baseline_offset(font_size),
    };
    for ch in text.chars() {
        let glyph = metrics.glyph(ch);
        metrics.face.outline_glyph(glyph, &mut sink);
        sink.dx += metrics.advance(glyph, font_size);
    }
    sink.d
}

/// 字体坐标（y 轴向上）→ SVG 坐标（y 轴向下）
struct PathSink {
    d: String,
    scale: f32,
    dx: f32,
    dy: f32,
}

impl PathSink {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.dx + x * self.scale, self.dy - y * self.scale)
    }
}

impl OutlineBuilder for PathSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        let _ = write!(self.d, "M{x:.2} {y:.2} ");
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        let _ = write!(self.d, "L{x:.2} {y:.2} ");
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        let _ = write!(self.d, "Q{x1:.2} {y1:.2} {x:.2} {y:.2} ");
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        let _ = write!(self.d, "C{x1:.2} {y1:.2} {x2:.2} {y2:.2} {x:.2} {y:.2} ");
    }

    fn close(&mut self) {
        self.d.push_str("Z ");
    }
}
