use std::fs;
use std::time::Instant;

use crate::config::{AppConfig, StorageBackend};
use crate::error::AppError;
use crate::state::AppState;

/// 执行启动检查
///
/// 1. 本地目录后端：检查并创建存储根目录
/// 2. 按配置预热字体（失败只告警，不阻断启动）
pub async fn run_startup_checks(config: &AppConfig, state: &AppState) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");
    tracing::info!("对象存储后端: {}", state.store.describe());

    if config.storage.backend == StorageBackend::Fs {
        ensure_storage_root(config)?;
    }

    if config.font.preload {
        preload_font(state).await;
    }

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 确保本地存储根目录存在
fn ensure_storage_root(config: &AppConfig) -> Result<(), AppError> {
    let root = config.storage.fs_root_path();

    if !root.exists() {
        tracing::warn!("📁 未找到存储目录，正在创建: {:?}", root);
        fs::create_dir_all(&root)
            .map_err(|e| AppError::Internal(format!("创建存储目录失败: {e}")))?;
        tracing::info!("✅ 存储目录创建成功");
    } else {
        tracing::info!("✅ 存储目录已存在: {:?}", root);
    }

    Ok(())
}

/// 字体缺失是逐请求的 500，而不是启动失败
async fn preload_font(state: &AppState) {
    let t0 = Instant::now();
    match state.fonts.ensure().await {
        Ok(font) => tracing::info!(
            "✅ 字体预热完成: {} ({} bytes, {}ms)",
            font.family,
            font.data.len(),
            t0.elapsed().as_millis()
        ),
        Err(e) => {
            tracing::warn!("⚠️ 字体预热失败: {}", e);
            tracing::info!("💡 请使用 seed_font 上传 `{}` 后重试请求", state.fonts.key());
        }
    }
}
