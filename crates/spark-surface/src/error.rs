//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义表面池对外暴露的可恢复错误，供加速策略层与调用方按类别处理；
//! - 数据损坏类问题（未知句柄）不在此列，它们以断言失败的形式直接终止流程。
//!
//! ## 设计要求（What）
//! - 所有变体派生 `thiserror::Error`，可通过 `?` 传播并兼容 `std::error::Error`；
//! - 变体携带定位所需的最小上下文（池大小、池键、配置原因），保持 `Clone + Eq` 便于断言。

use thiserror::Error;

use crate::policy::PoolKey;

/// 表面池错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“池已耗尽”这类预期内的背压信号与配置、调用方输入错误，
///   让上层可以只对 `Exhausted` 执行退避重试。
/// - **契约 (What)**：
///   - 所有变体满足 `Send + Sync + 'static`，可跨线程返回；
///   - `Exhausted` 永远由 [`CachedPool::find_free`](crate::CachedPool::find_free) 同步返回，不会延迟上报。
/// - **设计权衡 (Trade-offs)**：上下文使用 `String` 保存，牺牲少量分配换取可读性；
///   这些路径都不在逐帧热路径上。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SurfacePoolError {
    /// 整轮扫描后仍未找到 `lock_count == 0` 的表面。
    ///
    /// - **意图 (Why)**：向调用方报告“稍后再试”，而非程序缺陷；
    /// - **契约 (What)**：`size` 为扫描时池内表面数量。
    #[error("cannot get free surface from pool, size: {size}")]
    Exhausted { size: usize },

    /// 调用方提供的池键未在策略中注册，或所属池已被销毁。
    #[error("surface pool `{key}` is not registered")]
    UnknownPool { key: PoolKey },

    /// 池配置未通过校验，例如表面数量为 0 或总字节数溢出。
    #[error("invalid surface pool configuration: {reason}")]
    InvalidConfig { reason: String },

    /// TOML 配置解析失败。
    #[error("failed to parse surface pool configuration: {detail}")]
    ConfigParse { detail: String },

    /// 表面工厂在填充池时报告失败，正在构建的池会被整体丢弃。
    #[error("surface factory failed: {detail}")]
    Factory { detail: String },
}

/// crate 内统一的结果别名。
pub type Result<T, E = SurfacePoolError> = core::result::Result<T, E>;
