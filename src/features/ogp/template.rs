//! 声明式模板树：容器/文本两类节点 + 类 flexbox 样式。
//!
//! 当前只有一套固定设计（[`ogp_template`]）。请求参数只决定缓存键，
//! 不改变画面内容（按命名空间区分缓存）。

use std::fmt;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// 尺寸：固定像素、相对父容器内容盒的百分比或自动（按内容）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Px(f32),
    Percent(f32),
}

impl Dimension {
    pub fn resolve(self, containing: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Px(v) => Some(v),
            Dimension::Percent(p) => Some(containing * p / 100.0),
        }
    }
}

/// 四边距
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const ZERO: Edges = Edges::all(0.0);

    pub const fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// 等价于 CSS `padding: {vertical}px {horizontal}px`
    pub const fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyContent {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignItems {
    Start,
    Center,
    End,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientDirection {
    ToBottom,
    ToRight,
}

/// 背景填充
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// 线性渐变，stops 为 (offset ∈ [0,1], 颜色)
    LinearGradient {
        direction: GradientDirection,
        stops: Vec<(f32, Color)>,
    },
}

/// 节点样式。`font_size` 与 `color` 未设置时继承父节点。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub width: Dimension,
    pub height: Dimension,
    pub padding: Edges,
    pub margin: Edges,
    pub flex_direction: FlexDirection,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub background: Option<Paint>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
}

/// 不可变的模板节点树
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Container {
        style: Style,
        children: Vec<TemplateNode>,
    },
    Text {
        style: Style,
        content: String,
    },
}

impl TemplateNode {
    pub fn container(style: Style, children: Vec<TemplateNode>) -> Self {
        TemplateNode::Container { style, children }
    }

    pub fn text(style: Style, content: impl Into<String>) -> Self {
        TemplateNode::Text {
            style,
            content: content.into(),
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            TemplateNode::Container { style, .. } | TemplateNode::Text { style, .. } => style,
        }
    }
}

const GRADIENT_TOP: Color = Color::rgb(0x44, 0x81, 0xF9);
const GRADIENT_BOTTOM: Color = Color::rgb(0xCC, 0x61, 0xA4);
const CARD_BACKGROUND: Color = Color::rgb(0x25, 0x29, 0x3D);
const CARD_FONT_SIZE: f32 = 76.0;
const CARD_LINES: [&str; 3] = ["Chottoshita", "OGP Gazou", "Desu"];

/// 本服务唯一的视觉设计：渐变底 + 居中深色卡片 + 三行白字。
pub fn ogp_template() -> TemplateNode {
    let line = |content: &str| {
        TemplateNode::text(
            Style {
                margin: Edges::ZERO,
                padding: Edges::ZERO,
                ..Style::default()
            },
            content,
        )
    };

    let card = TemplateNode::container(
        Style {
            padding: Edges::symmetric(48.0, 96.0),
            flex_direction: FlexDirection::Column,
            align_items: AlignItems::Center,
            justify_content: JustifyContent::Center,
            background: Some(Paint::Solid(CARD_BACKGROUND)),
            font_size: Some(CARD_FONT_SIZE),
            color: Some(Color::WHITE),
            ..Style::default()
        },
        CARD_LINES.into_iter().map(line).collect(),
    );

    TemplateNode::container(
        Style {
            width: Dimension::Percent(100.0),
            height: Dimension::Percent(100.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            background: Some(Paint::LinearGradient {
                direction: GradientDirection::ToBottom,
                stops: vec![(0.0, GRADIENT_TOP), (1.0, GRADIENT_BOTTOM)],
            }),
            ..Style::default()
        },
        vec![card],
    )
}
