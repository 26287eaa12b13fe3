use std::sync::Arc;

use crate::surface::{Surface, SurfaceHandle};

/// `SurfaceLease`：以 RAII 方式持有表面“占用”状态的帧适配器。
///
/// # 设计初衷（Why）
/// - 流水线阶段把池化表面包装成帧对象向下游传递，期间表面必须保持占用，
///   否则池可能把同一槽位再次交给生产者覆盖；
/// - 手工配对 `obtain_lock`/`release_lock` 容易在错误路径上遗漏释放，
///   借助 `Drop` 让释放与租约生命周期绑定。
///
/// # 契约定义（What）
/// - 构造时调用一次 [`Surface::obtain_lock`]，`Drop` 时调用一次 [`Surface::release_lock`]；
/// - 租约持有表面的 `Arc`，因此表面与其共享内存在租约存活期间不会被释放；
/// - 租约不保证独占：若同一表面已被其他调用方占用，`previous_locks()` 会大于 0。
#[derive(Debug)]
pub struct SurfaceLease {
    surface: Arc<Surface>,
    previous_locks: usize,
}

impl SurfaceLease {
    pub fn new(surface: Arc<Surface>) -> Self {
        let previous_locks = surface.obtain_lock();
        Self {
            surface,
            previous_locks,
        }
    }

    /// 构造时 `obtain_lock` 返回的旧计数；为 0 表示本租约独占该表面。
    pub fn previous_locks(&self) -> usize {
        self.previous_locks
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.surface.get_handle()
    }

    /// 帧数据的只读视图。
    pub fn data(&self) -> Option<&[u8]> {
        self.surface.data()
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        self.surface.release_lock();
    }
}
