use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;

use super::types::{CacheKey, RenderParameter};

/// 命中缓存时附加的响应头
pub const IS_CACHED_HEADER: &str = "x-is-cached";

/// 重复出现的查询参数取第一个值
fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// `GET {route}?param=...` → 1200x630 PNG
pub async fn render_ogp(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let t0 = Instant::now();
    let param = RenderParameter::parse(first_value(&pairs, RenderParameter::QUERY_NAME))?;
    let key = CacheKey::for_parameter(&state.image.key_prefix, &param);
    let image = state.pipeline.resolve(&key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    let max_age = format!("max-age={}", state.image.cache_control_max_age_secs);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&max_age)
            .map_err(|e| AppError::Internal(format!("invalid Cache-Control value: {e}")))?,
    );
    if image.from_cache {
        headers.insert(IS_CACHED_HEADER, HeaderValue::from_static("true"));
    }

    tracing::info!(
        key = %key,
        origin = ?image.origin,
        bytes = image.bytes.len(),
        "OGP 图片请求完成，耗时: {:?}ms",
        t0.elapsed().as_millis()
    );
    Ok((StatusCode::OK, headers, image.bytes))
}

pub fn create_ogp_router(route: &str) -> Router<AppState> {
    Router::new().route(route, get(render_ogp))
}
