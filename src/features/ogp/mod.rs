//! OGP 图片服务：参数 → 缓存键 → 缓存旁路管线 → PNG。

pub mod font;
pub mod handler;
pub mod pipeline;
pub mod renderer;
pub mod template;
pub mod types;

pub use font::{FontCache, FontResource, FontStyle};
pub use handler::{IS_CACHED_HEADER, create_ogp_router};
pub use pipeline::{ImageOrigin, ImagePipeline, ResolvedImage};
pub use renderer::{CanvasSize, RenderPipeline};
pub use types::{CacheKey, RenderParameter};
