//! 预分配内存块抽象。
//!
//! 表面池本身不决定内存如何分配，只通过 [`SharedMemory`] 共享持有一块预分配区域：
//! 同一内存块上构建的所有表面共同延长它的生命周期，最后一个持有者释放时内存才被回收。

use std::sync::Arc;

use bytes::Bytes;

/// 一块可被多个表面共享的预分配内存。
///
/// # 契约说明（What）
/// - 实现必须线程安全，`as_bytes` 返回的切片在对象存活期间保持稳定；
/// - 释放时机完全由 `Arc` 引用计数决定，实现者可在 `Drop` 中归还底层资源。
pub trait MemoryBlock: Send + Sync + 'static {
    /// 内存块总字节数。
    fn len(&self) -> usize;

    /// 内存块的只读视图。
    fn as_bytes(&self) -> &[u8];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 共享所有权的内存块引用。
pub type SharedMemory = Arc<dyn MemoryBlock>;

/// 基于堆分配的内存块，供 CPU 加速策略与测试使用。
///
/// 内部以 `bytes::Bytes` 保存数据，克隆视图不复制底层缓冲。
#[derive(Clone, Debug)]
pub struct HeapBlock {
    bytes: Bytes,
}

impl HeapBlock {
    /// 分配 `len` 字节并清零。
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    /// 以现有字节构造内存块，常用于回放或测试场景预置帧内容。
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// 包装为 [`SharedMemory`]。
    pub fn into_shared(self) -> SharedMemory {
        Arc::new(self)
    }
}

impl MemoryBlock for HeapBlock {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
