//! `spark-surface` 提供硬件帧缓冲（表面）的定长池化管理。
//!
//! # 模块定位（Why）
//! - 硬件视频流水线把帧解码/处理到预分配的内存槽位中，下游多个阶段并发读取或暂存这些帧；
//! - 本 crate 负责槽位复用与簿记：交出当前未被占用的表面、让多方安全地更新占用状态、
//!   把驱动回调中的原生句柄解析回池内对象，且池建成后不再重新分配或调整大小。
//!
//! # 设计概要（How）
//! - `surface` 模块实现 [`Surface`]：原生句柄 + 原子锁计数 + 共享持有的预分配内存；
//! - `pool` 模块实现 [`CachedPool`]：定长有序序列、扫描游标与句柄索引，三者由同一入口维护；
//! - `adapter` 模块提供 [`SurfaceLease`]，以 RAII 方式把“占用”绑定到帧对象生命周期；
//! - `policy` 模块定义 [`AccelerationPolicy`] 并实现基于堆内存的 [`CpuAccelerationPolicy`]，
//!   以池键对外暴露创建、统计、租借（`Weak` 引用）与句柄解析；
//! - `config` 模块以 `serde` 描述池尺寸，支持从 TOML 加载。
//!
//! # 契约要点（What）
//! - 锁计数与 `Arc` 引用计数是两回事：池只以锁计数判断空闲；
//! - 池耗尽是可恢复错误（[`SurfacePoolError::Exhausted`]），并伴随一条告警日志；
//! - 未知句柄意味着数据损坏，直接 panic，不尝试局部恢复；
//! - 本 crate 不安装任何 `tracing` subscriber，日志输出由宿主进程决定。
//!
//! ```
//! use spark_surface::{
//!     AccelerationPolicy, CpuAccelerationPolicy, SurfacePoolConfig, default_surface_factory,
//! };
//!
//! let policy = CpuAccelerationPolicy::new();
//! let key = policy
//!     .create_surface_pool(&SurfacePoolConfig::new(4, 1024), &default_surface_factory)
//!     .expect("创建池");
//!
//! let surface = policy
//!     .get_free_surface(key)
//!     .expect("池未耗尽")
//!     .upgrade()
//!     .expect("池仍然存活");
//! assert_eq!(surface.obtain_lock(), 0);
//! assert_eq!(policy.get_free_surface_count(key), Ok(3));
//!
//! let resolved = policy
//!     .resolve_surface(key, surface.get_handle())
//!     .expect("池已注册");
//! assert!(std::sync::Arc::ptr_eq(&surface, &resolved));
//! surface.release_lock();
//! ```

mod adapter;
mod config;
mod error;
mod memory;
mod policy;
mod pool;
mod surface;

pub use adapter::SurfaceLease;
pub use config::SurfacePoolConfig;
pub use error::{Result, SurfacePoolError};
pub use memory::{HeapBlock, MemoryBlock, SharedMemory};
pub use policy::{
    AccelerationPolicy, CpuAccelerationPolicy, PoolKey, SurfaceFactory, default_surface_factory,
};
pub use pool::CachedPool;
pub use surface::{NativeSurface, SlotLayout, Surface, SurfaceHandle};
