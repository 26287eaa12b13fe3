//! 加速策略层：对流水线暴露表面池的创建、统计、租借与句柄解析。
//!
//! # 模块定位（Why）
//! - 流水线其余部分不直接接触 [`CachedPool`]，而是通过 [`AccelerationPolicy`] 以池键寻址；
//! - 不同硬件后端（CPU、显存）在内存分配方式上各不相同，但共享同一套池化与租借语义，
//!   因此把接口抽象为 trait，本模块同时提供基于堆内存的 [`CpuAccelerationPolicy`]。
//!
//! # 契约说明（What）
//! - 租借返回 `Weak<Surface>`：借出方不延长表面的生命周期，池被销毁后 `upgrade` 返回 `None`；
//! - 租借本身不加锁，调用方拿到表面后须调用 [`Surface::obtain_lock`]（或构造
//!   [`SurfaceLease`](crate::SurfaceLease)）再使用，用完后释放。

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use spin::Mutex;

use crate::{
    config::SurfacePoolConfig,
    error::{Result, SurfacePoolError},
    memory::{HeapBlock, SharedMemory},
    pool::CachedPool,
    surface::{NativeSurface, SlotLayout, Surface, SurfaceHandle},
};

/// 策略内部分配的池标识。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(u64);

impl PoolKey {
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// 表面工厂：填充池时为每个槽位调用一次。
///
/// - 第一个参数是整池共享的预分配内存块；
/// - `SlotLayout` 给出本槽位的序号（第几个请求）、偏移与请求的字节数。
pub type SurfaceFactory = dyn Fn(SharedMemory, SlotLayout) -> Result<Arc<Surface>> + Send + Sync;

/// 默认工厂：为槽位构造描述符，并让表面共享持有内存块。
pub fn default_surface_factory(memory: SharedMemory, layout: SlotLayout) -> Result<Arc<Surface>> {
    Ok(Surface::create_surface(
        NativeSurface::new(layout),
        Some(memory),
    ))
}

/// 面向流水线的表面池管理接口。
///
/// # 教案式说明
/// - **意图 (Why)**：把“内存从哪里来”与“槽位如何复用”解耦，后端只需实现内存分配与池表管理；
/// - **契约 (What)**：
///   - 所有方法可从任意线程调用；
///   - 未知池键返回 [`SurfacePoolError::UnknownPool`]；
///   - 池耗尽返回 [`SurfacePoolError::Exhausted`]，由调用方决定退避或重试，策略层不阻塞等待；
///   - `resolve_surface` 遇到不属于该池的句柄时按数据损坏处理并终止。
pub trait AccelerationPolicy: Send + Sync {
    /// 创建一个定长表面池并返回其键。
    fn create_surface_pool(
        &self,
        config: &SurfacePoolConfig,
        factory: &SurfaceFactory,
    ) -> Result<PoolKey>;

    /// 池内表面总数。
    fn get_surface_count(&self, key: PoolKey) -> Result<usize>;

    /// 池内锁计数为 0 的表面数量，O(n) 扫描。
    fn get_free_surface_count(&self, key: PoolKey) -> Result<usize>;

    /// 借出一个空闲表面的非拥有引用。
    fn get_free_surface(&self, key: PoolKey) -> Result<Weak<Surface>>;

    /// 按原生句柄解析表面，供驱动完成回调使用。
    fn resolve_surface(&self, key: PoolKey, handle: SurfaceHandle) -> Result<Arc<Surface>>;
}

/// `CpuAccelerationPolicy`：每个池在堆上分配一整块内存，再按槽位切分给表面。
///
/// # 核心机制（How）
/// - 池表以 `spin::Mutex<BTreeMap<PoolKey, CachedPool>>` 保存，锁只在单次表操作期间持有，
///   不跨越调用方代码；表面的加解锁完全不经过这把锁；
/// - 池键由单调递增的原子计数分配，同一实例内不会复用。
///
/// # 资源释放
/// 策略被销毁时只释放它持有的池；仍被外部持有的表面继续共享并延长内存块的生命周期。
#[derive(Debug, Default)]
pub struct CpuAccelerationPolicy {
    pools: Mutex<BTreeMap<PoolKey, CachedPool>>,
    next_key: AtomicU64,
}

impl CpuAccelerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前注册的池数量。
    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    fn with_pool<T>(
        &self,
        key: PoolKey,
        f: impl FnOnce(&mut CachedPool) -> Result<T>,
    ) -> Result<T> {
        let mut pools = self.pools.lock();
        let pool = pools
            .get_mut(&key)
            .ok_or(SurfacePoolError::UnknownPool { key })?;
        f(pool)
    }
}

impl AccelerationPolicy for CpuAccelerationPolicy {
    fn create_surface_pool(
        &self,
        config: &SurfacePoolConfig,
        factory: &SurfaceFactory,
    ) -> Result<PoolKey> {
        config.validate()?;
        let memory = HeapBlock::zeroed(config.total_bytes()?).into_shared();

        let mut pool = CachedPool::with_capacity(config.surface_count);
        for index in 0..config.surface_count {
            let layout = SlotLayout::new(
                index,
                index * config.surface_size_bytes,
                config.surface_size_bytes,
            );
            pool.push_back(factory(Arc::clone(&memory), layout)?);
        }

        let key = PoolKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            %key,
            surface_count = config.surface_count,
            surface_size_bytes = config.surface_size_bytes,
            "surface pool created"
        );
        self.pools.lock().insert(key, pool);
        Ok(key)
    }

    fn get_surface_count(&self, key: PoolKey) -> Result<usize> {
        self.with_pool(key, |pool| Ok(pool.size()))
    }

    fn get_free_surface_count(&self, key: PoolKey) -> Result<usize> {
        self.with_pool(key, |pool| Ok(pool.free_count()))
    }

    fn get_free_surface(&self, key: PoolKey) -> Result<Weak<Surface>> {
        self.with_pool(key, |pool| {
            pool.find_free().map(|surface| Arc::downgrade(&surface))
        })
    }

    fn resolve_surface(&self, key: PoolKey, handle: SurfaceHandle) -> Result<Arc<Surface>> {
        self.with_pool(key, |pool| Ok(pool.find_by_handle(handle)))
    }
}
