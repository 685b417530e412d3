/// 健康检查
pub mod health;
/// OGP 图片生成
pub mod ogp;
