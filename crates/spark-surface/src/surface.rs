use std::{fmt, ops::Range, sync::Arc};

//
// 教案级说明：启用 `--cfg loom` 时切换到 Loom 提供的原子类型，
// 使模型检查能够穷举 `obtain_lock`/`release_lock` 的调度交错；`Arc` 保持标准实现。
#[cfg(not(any(loom, spark_loom)))]
use core::sync::atomic::{AtomicUsize, Ordering};
#[cfg(any(loom, spark_loom))]
use loom::sync::atomic::{AtomicUsize, Ordering};

use crate::memory::SharedMemory;

/// 硬件缓冲槽位的不透明原生句柄。
///
/// # 设计背景（Why）
/// - 驱动在完成回调中只回传原生描述符的地址，池需要据此反查对应的 [`Surface`]；
/// - 句柄只承担“身份”语义，不暴露任何解引用能力。
///
/// # 契约说明（What）
/// - 由 [`Surface`] 持有的 [`NativeSurface`] 堆地址派生，表面存活期间稳定且唯一；
/// - [`SurfaceHandle::from_raw`] 供驱动回调路径重建句柄，调用方需保证来源可信。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(usize);

impl SurfaceHandle {
    /// 从驱动回传的原始值重建句柄。
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// 返回原始值，供下发给驱动。
    pub const fn into_raw(self) -> usize {
        self.0
    }

    fn of(native: &NativeSurface) -> Self {
        Self(native as *const NativeSurface as usize)
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface@{:#x}", self.0)
    }
}

/// 表面在预分配内存块中的位置。
///
/// - `index`：槽位序号，即本次填充请求中的第几个表面；
/// - `offset` / `size`：槽位在内存块内的字节区间。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlotLayout {
    pub index: usize,
    pub offset: usize,
    pub size: usize,
}

impl SlotLayout {
    pub const fn new(index: usize, offset: usize, size: usize) -> Self {
        Self {
            index,
            offset,
            size,
        }
    }

    /// 槽位对应的字节区间，`offset + size` 溢出时返回 `None`。
    pub fn range(&self) -> Option<Range<usize>> {
        let end = self.offset.checked_add(self.size)?;
        Some(self.offset..end)
    }
}

/// 驱动可见的帧描述符。
///
/// 表面以 `Box` 独占持有它，堆地址即为 [`SurfaceHandle`]。
#[derive(Debug)]
pub struct NativeSurface {
    layout: SlotLayout,
}

impl NativeSurface {
    /// 为指定槽位构造描述符。
    pub fn new(layout: SlotLayout) -> Box<Self> {
        Box::new(Self { layout })
    }

    pub fn layout(&self) -> SlotLayout {
        self.layout
    }
}

/// `Surface`：池化的单个硬件帧缓冲。
///
/// # 模块角色（Why）
/// - 在生产者（硬件解码/处理流水线）与多个消费者之间共享一块预分配的帧内存；
/// - 以显式的“锁计数”表达调用方声明的占用状态，池据此判断槽位是否空闲。
///
/// # 核心机制（How）
/// - `locks` 为独立的原子计数，只能经由 [`Surface::obtain_lock`] / [`Surface::release_lock`] 修改；
/// - `memory` 以 `Arc` 共享持有整块预分配内存，任何仍存活的表面都会延长它的生命周期；
/// - `native` 独占持有帧描述符，其地址作为句柄供池建立反查索引。
///
/// # 契约说明（What）
/// - **锁计数不等于所有权计数**：表面可以被许多组件以 `Arc` 共享却仍处于空闲状态，
///   也可以只有一个持有者却被多次加锁。池只看锁计数，从不参考 `Arc::strong_count`；
/// - **线程安全**：三个锁计数操作可被任意多个线程并发调用，彼此以原子 RMW 串行化；
///   不同表面之间不存在任何顺序保证；
/// - **前置条件**：调用 `release_lock` 前计数必须大于 0，否则属于契约误用。
pub struct Surface {
    native: Box<NativeSurface>,
    memory: Option<SharedMemory>,
    locks: AtomicUsize,
}

impl Surface {
    /// 构造表面并返回共享引用，初始锁计数为 0。
    ///
    /// `memory` 可为空，例如驱动内部自行管理内存的场景。
    pub fn create_surface(native: Box<NativeSurface>, memory: Option<SharedMemory>) -> Arc<Self> {
        Arc::new(Self {
            native,
            memory,
            locks: AtomicUsize::new(0),
        })
    }

    /// 返回原生句柄，无副作用。
    pub fn get_handle(&self) -> SurfaceHandle {
        SurfaceHandle::of(&self.native)
    }

    /// 原子递增锁计数，返回递增前的值。
    ///
    /// 返回 0 说明本次调用把表面从空闲切换为占用；多个线程拿到同一个
    /// [`find_free`](crate::CachedPool::find_free) 结果时，只有返回 0 的一方真正赢得该表面。
    pub fn obtain_lock(&self) -> usize {
        self.locks.fetch_add(1, Ordering::AcqRel)
    }

    /// 原子递减锁计数，返回递减前的值。
    ///
    /// # 契约说明（What）
    /// - 计数已为 0 时调用属于调用方错误：调试构建触发断言；
    ///   发布构建中计数保持为 0 并返回 0，不会回绕成极大值而让表面永久“占用”。
    pub fn release_lock(&self) -> usize {
        match self
            .locks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            }) {
            Ok(previous) => previous,
            Err(current) => {
                debug_assert_ne!(
                    current,
                    0,
                    "release_lock called on surface {} with zero locks",
                    self.get_handle()
                );
                current
            }
        }
    }

    /// 读取当前锁计数；可能与进行中的递增/递减并发，只保证原子性。
    pub fn get_locks_count(&self) -> usize {
        self.locks.load(Ordering::Acquire)
    }

    pub fn layout(&self) -> SlotLayout {
        self.native.layout()
    }

    /// 共享的预分配内存块。
    pub fn memory(&self) -> Option<&SharedMemory> {
        self.memory.as_ref()
    }

    /// 槽位在内存块中的字节视图；无内存或区间越界时返回 `None`。
    pub fn data(&self) -> Option<&[u8]> {
        let memory = self.memory.as_ref()?;
        memory.as_bytes().get(self.layout().range()?)
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("handle", &self.get_handle())
            .field("layout", &self.layout())
            .field("locks", &self.get_locks_count())
            .field("has_memory", &self.memory.is_some())
            .finish()
    }
}
