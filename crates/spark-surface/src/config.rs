//! 表面池配置。
//!
//! # 设计概要（How）
//! - 使用 `serde` 派生，既可由调用方直接构造，也可从 TOML 片段加载；
//! - `deny_unknown_fields` 拒绝拼写错误的键，避免静默回落到默认值；
//! - 校验集中在 [`SurfacePoolConfig::validate`]，加速策略创建池前统一调用。

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurfacePoolError};

/// 单个表面池的尺寸参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfacePoolConfig {
    /// 池内表面数量，构建后固定不变。
    pub surface_count: usize,
    /// 每个表面占用的字节数。
    pub surface_size_bytes: usize,
}

impl SurfacePoolConfig {
    pub const fn new(surface_count: usize, surface_size_bytes: usize) -> Self {
        Self {
            surface_count,
            surface_size_bytes,
        }
    }

    /// 从 TOML 文本解析并校验配置。
    ///
    /// ```
    /// use spark_surface::SurfacePoolConfig;
    ///
    /// let config = SurfacePoolConfig::from_toml_str(
    ///     "surface_count = 10\nsurface_size_bytes = 1024\n",
    /// )
    /// .expect("合法配置");
    /// assert_eq!(config.total_bytes(), Ok(10 * 1024));
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|error| SurfacePoolError::ConfigParse {
            detail: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验数量与尺寸均为正，且总字节数不溢出。
    pub fn validate(&self) -> Result<()> {
        if self.surface_count == 0 {
            return Err(SurfacePoolError::InvalidConfig {
                reason: "surface_count must be greater than zero".to_owned(),
            });
        }
        if self.surface_size_bytes == 0 {
            return Err(SurfacePoolError::InvalidConfig {
                reason: "surface_size_bytes must be greater than zero".to_owned(),
            });
        }
        self.total_bytes().map(|_| ())
    }

    /// 整个池需要的预分配字节数。
    pub fn total_bytes(&self) -> Result<usize> {
        self.surface_count
            .checked_mul(self.surface_size_bytes)
            .ok_or_else(|| SurfacePoolError::InvalidConfig {
                reason: format!(
                    "{} surfaces of {} bytes overflow the addressable size",
                    self.surface_count, self.surface_size_bytes
                ),
            })
    }
}
