use std::fmt;

use crate::error::AppError;

/// 请求中标识“渲染哪一张图”的参数（查询参数 `param`）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderParameter(String);

impl RenderParameter {
    /// 查询参数名
    pub const QUERY_NAME: &'static str = "param";
    /// 最大字节长度，保证派生出的对象键不超过常见对象存储的键长上限
    pub const MAX_LEN: usize = 256;

    /// 缺失或为空 → `MissingParameter`；超长 → `Validation`
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let value = match raw {
            Some(v) if !v.is_empty() => v,
            _ => return Err(AppError::MissingParameter(Self::QUERY_NAME)),
        };
        if value.len() > Self::MAX_LEN {
            return Err(AppError::Validation(format!(
                "`{}` must be at most {} bytes",
                Self::QUERY_NAME,
                Self::MAX_LEN
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 图片缓存在对象存储中的键：`{prefix}/{urlencode(param)}.png`
///
/// URL 编码是单射，且会编码 `/`，因此不同参数永不碰撞，参数也无法逃出前缀目录。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_parameter(prefix: &str, param: &RenderParameter) -> Self {
        Self(format!(
            "{}/{}.png",
            prefix.trim_end_matches('/'),
            urlencoding::encode(param.as_str())
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
