use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::storage::StorageError;

/// 错误码响应头，便于调用方与日志程序化区分错误类型。
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// 应用统一错误类型
///
/// 错误响应固定为 `text/plain` 诊断文本，不携带任何缓存头。
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// 缺少必需的查询参数
    #[error("missing required query parameter `{0}`")]
    MissingParameter(&'static str),

    /// 参数校验错误
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// 字体在存储中不存在（部署/预置缺陷，不自动重试）
    #[error("font unavailable: `{0}` was not found in storage")]
    FontUnavailable(String),

    /// 存储读写失败
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 排版或栅格化失败
    #[error("render failed: {0}")]
    Render(String),

    /// 内部服务器错误
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::FontUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(StorageError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(StorageError::InvalidKey(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 稳定的错误码，用于程序化处理。
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingParameter(_) => "MISSING_PARAMETER",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::FontUnavailable(_) => "FONT_UNAVAILABLE",
            AppError::Storage(StorageError::Timeout(_)) => "STORAGE_TIMEOUT",
            AppError::Storage(_) => "STORAGE_FAILED",
            AppError::Render(_) => "RENDER_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, status = status.as_u16(), "请求失败: {}", self);
        } else {
            tracing::warn!(code, status = status.as_u16(), "请求被拒绝: {}", self);
        }

        let mut res = (status, self.to_string()).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(code));
        res
    }
}
