use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::ogp::font::FontStyle;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 配置文件路径的环境变量名（缺省为 `config.toml`）
const CONFIG_PATH_ENV: &str = "APP_CONFIG";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
    /// 日志格式：full / compact / json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 图片路由路径
    pub route: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            route: "/".to_string(),
        }
    }
}

/// 对象存储后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存（开发/测试）
    #[default]
    Memory,
    /// 本地目录
    Fs,
    /// S3/R2 风格的 HTTP 桶端点
    Http,
}

/// 对象存储配置（由部署环境注入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// fs 后端根目录
    #[serde(default = "StorageConfig::default_fs_root")]
    pub fs_root: String,
    /// http 后端桶地址，例如 `https://bucket.example.com/ogp`
    #[serde(default)]
    pub http_base_url: Option<String>,
    /// http 后端 Bearer Token（可选）
    #[serde(default)]
    pub http_token: Option<String>,
    /// http 后端请求超时（秒）
    #[serde(default = "StorageConfig::default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl StorageConfig {
    fn default_fs_root() -> String {
        "./data".to_string()
    }
    fn default_http_timeout() -> u64 {
        30
    }

    pub fn fs_root_path(&self) -> PathBuf {
        PathBuf::from(&self.fs_root)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            fs_root: Self::default_fs_root(),
            http_base_url: None,
            http_token: None,
            http_timeout_secs: Self::default_http_timeout(),
        }
    }
}

/// 字体资源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// 字体在对象存储中的键（需预先上传）
    #[serde(default = "FontConfig::default_key")]
    pub key: String,
    /// 字族名
    #[serde(default = "FontConfig::default_family")]
    pub family: String,
    /// 字重
    #[serde(default = "FontConfig::default_weight")]
    pub weight: u16,
    #[serde(default)]
    pub style: FontStyle,
    /// 启动时预加载（失败只告警）
    #[serde(default = "FontConfig::default_preload")]
    pub preload: bool,
}

impl FontConfig {
    fn default_key() -> String {
        "fonts/NotoSansJP-Regular.otf".to_string()
    }
    fn default_family() -> String {
        "NotoSansJP".to_string()
    }
    fn default_weight() -> u16 {
        100
    }
    fn default_preload() -> bool {
        true
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            key: Self::default_key(),
            family: Self::default_family(),
            weight: Self::default_weight(),
            style: FontStyle::default(),
            preload: Self::default_preload(),
        }
    }
}

/// 图片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRenderConfig {
    /// 输出宽度（像素）
    #[serde(default = "ImageRenderConfig::default_width")]
    pub width: u32,
    /// 输出高度（像素）
    #[serde(default = "ImageRenderConfig::default_height")]
    pub height: u32,
    /// 缓存键前缀
    #[serde(default = "ImageRenderConfig::default_key_prefix")]
    pub key_prefix: String,
    /// 响应 `Cache-Control: max-age`（秒）
    #[serde(default = "ImageRenderConfig::default_max_age")]
    pub cache_control_max_age_secs: u64,
    /// 是否启用进程内一级缓存（关闭后仍保留同键并发合并）
    #[serde(default = "ImageRenderConfig::default_memory_cache_enabled")]
    pub memory_cache_enabled: bool,
    /// 一级缓存最大容量（字节），按图片字节大小加权
    #[serde(default = "ImageRenderConfig::default_memory_cache_max_bytes")]
    pub memory_cache_max_bytes: u64,
    /// 一级缓存 TTL（秒）
    #[serde(default = "ImageRenderConfig::default_memory_cache_ttl")]
    pub memory_cache_ttl_secs: u64,
    /// 一级缓存 TTI（秒）
    #[serde(default = "ImageRenderConfig::default_memory_cache_tti")]
    pub memory_cache_tti_secs: u64,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 是否优先速度（OptimizeSpeed + 快速 PNG 压缩），可能略降画质、增大体积
    #[serde(default)]
    pub optimize_speed: bool,
}

impl ImageRenderConfig {
    fn default_width() -> u32 {
        1200
    }
    fn default_height() -> u32 {
        630
    }
    fn default_key_prefix() -> String {
        "ogp-image-caches".to_string()
    }
    fn default_max_age() -> u64 {
        7 * 24 * 60 * 60
    }
    fn default_memory_cache_enabled() -> bool {
        true
    }
    fn default_memory_cache_max_bytes() -> u64 {
        64 * 1024 * 1024
    }
    fn default_memory_cache_ttl() -> u64 {
        3600
    }
    fn default_memory_cache_tti() -> u64 {
        600
    }

    /// 实际并发渲染许可数
    pub fn effective_parallelism(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get().max(1),
            n => n as usize,
        }
    }
}

impl Default for ImageRenderConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            key_prefix: Self::default_key_prefix(),
            cache_control_max_age_secs: Self::default_max_age(),
            memory_cache_enabled: Self::default_memory_cache_enabled(),
            memory_cache_max_bytes: Self::default_memory_cache_max_bytes(),
            memory_cache_ttl_secs: Self::default_memory_cache_ttl(),
            memory_cache_tti_secs: Self::default_memory_cache_tti(),
            max_parallel: 0,
            optimize_speed: false,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// 对象存储绑定
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub font: FontConfig,
    /// 图片渲染与缓存配置
    #[serde(default)]
    pub image: ImageRenderConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::get_config_path())
    }

    /// 从指定路径加载（文件不存在时仅使用默认值与环境变量）
    pub fn load_from(config_path: PathBuf) -> Result<Self, ConfigError> {
        let path_str = config_path
            .to_str()
            .ok_or_else(|| ConfigError::Message(format!("配置路径非 UTF-8: {config_path:?}")))?;

        let builder = ConfigBuilder::builder()
            .add_source(File::with_name(path_str).required(false))
            // 环境变量覆盖，例如：APP_STORAGE__BACKEND=fs、APP_IMAGE__MAX_PARALLEL=4
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<&'static AppConfig, ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(Self::global())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
