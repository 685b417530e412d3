use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::features::health::health_check;
use crate::features::ogp::create_ogp_router;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由：OGP 图片端点 + `/health`，外层依次为访问日志与 request_id。
pub fn build_router(state: AppState, api: &ApiConfig) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .merge(create_ogp_router(&api.route))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}
