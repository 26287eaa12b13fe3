use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{Result, SurfacePoolError},
    surface::{Surface, SurfaceHandle},
};

/// `CachedPool`：定长表面序列 + 句柄索引。
///
/// # 模块角色（Why）
/// - 表面对应预分配的硬件内存槽位，池建成后既不扩容也不收缩；
/// - 为加速策略层提供“找一个空闲表面”的扫描能力，以及驱动完成回调所需的“句柄反查”。
///
/// # 核心机制（How）
/// - `surfaces` 保存插入顺序，即扫描顺序；`cache` 以句柄为键指向同一批 `Arc`；
///   二者只经由 [`CachedPool::push_back`] 同步写入、只经由 [`CachedPool::clear`] 同步清空；
/// - `cursor` 记录下一次扫描的起点，使连续的租借请求分散在不同槽位上；
/// - 不维护精确的自由链表：池规模通常只有几十个槽位，扫描频率远低于单个表面的加解锁，
///   以最坏 O(n) 的扫描换取零分配、分支简单的结构。
///
/// # 契约说明（What）
/// - **不变量**：`cache.len() == surfaces.len()`，每个索引项都解析到序列中持有该句柄的表面；
/// - **单一所有者构建**：`push_back`/`clear`/`find_free` 需要 `&mut self`，
///   填充必须在任何并发扫描开始前完成；`find_free` 只通过原子读取观察锁计数，
///   因此可以与其他线程的 `obtain_lock`/`release_lock` 并发；
/// - **尽力而为的分配**：`find_free` 返回后并不占用表面，两个调用方可能拿到同一个表面，
///   先调用 `obtain_lock` 并拿到 0 的一方胜出，另一方应重新申请。
#[derive(Debug, Default)]
pub struct CachedPool {
    surfaces: Vec<Arc<Surface>>,
    cache: HashMap<SurfaceHandle, Arc<Surface>>,
    cursor: usize,
}

impl CachedPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建并预留 `capacity` 个槽位的池。
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::new();
        pool.reserve(capacity);
        pool
    }

    /// 为序列与索引同时预留容量，不创建任何表面。
    pub fn reserve(&mut self, size: usize) {
        self.surfaces.reserve(size);
        self.cache.reserve(size);
    }

    /// 当前持有的表面数量。
    pub fn size(&self) -> usize {
        self.surfaces.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// 丢弃全部表面与索引项并复位游标。
    ///
    /// 池持有的 `Arc` 在此释放；仍被其他组件引用的表面（以及它们共享的内存块）继续存活。
    pub fn clear(&mut self) {
        tracing::debug!(pool_size = self.surfaces.len(), "clearing surface pool");
        self.surfaces.clear();
        self.cache.clear();
        self.cursor = 0;
    }

    /// 追加一个表面，同时写入句柄索引，并把扫描游标复位到序列起点。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`surface` 的句柄在当前成员中唯一；重复句柄会破坏索引，属于调用方错误，
    ///   调试构建中以断言拦截；
    /// - **后置条件**：`size()` 加一，下一次 `find_free` 从第一个表面开始扫描。
    pub fn push_back(&mut self, surface: Arc<Surface>) {
        let previous = self
            .cache
            .insert(surface.get_handle(), Arc::clone(&surface));
        debug_assert!(
            previous.is_none(),
            "surface handle {} is already cached by this pool",
            surface.get_handle()
        );
        self.surfaces.push(surface);
        self.cursor = 0;
    }

    /// 查找一个锁计数为 0 的表面。
    ///
    /// # 实现策略（How）
    /// 1. 从游标向后扫描到序列末尾，返回第一个空闲表面；
    /// 2. 未命中则回绕，从序列起点扫描到原游标位置（不含）；
    /// 3. 仍未命中说明池已耗尽：记录告警并返回 [`SurfacePoolError::Exhausted`]，不在内部重试；
    /// 4. 命中后游标移动到该表面之后（位于末尾时，下一次扫描直接回绕）。
    ///
    /// # 契约说明（What）
    /// - 本方法不修改任何锁计数，调用方需自行调用 [`Surface::obtain_lock`]；
    /// - 返回的是池所持有 `Arc` 的克隆，所有权仍与池共享。
    pub fn find_free(&mut self) -> Result<Arc<Surface>> {
        let cursor = self.cursor.min(self.surfaces.len());
        let found = self.surfaces[cursor..]
            .iter()
            .position(|surface| is_free(surface))
            .map(|offset| cursor + offset)
            .or_else(|| {
                self.surfaces[..cursor]
                    .iter()
                    .position(|surface| is_free(surface))
            });

        let Some(index) = found else {
            let size = self.surfaces.len();
            tracing::warn!(
                pool_size = size,
                "cannot get free surface from pool, size: {size}"
            );
            return Err(SurfacePoolError::Exhausted { size });
        };

        self.cursor = index + 1;
        Ok(Arc::clone(&self.surfaces[index]))
    }

    /// 按句柄精确查找表面。
    ///
    /// # Panics
    /// 句柄不在索引中意味着系统其他部分认为它属于本池而实际并非如此
    /// （跨池混用表面、驱动回传了过期或外来的句柄），属于数据损坏，直接终止而不做局部恢复。
    pub fn find_by_handle(&self, handle: SurfaceHandle) -> Arc<Surface> {
        match self.cache.get(&handle) {
            Some(surface) => Arc::clone(surface),
            None => {
                tracing::error!(
                    %handle,
                    pool_size = self.surfaces.len(),
                    "surface handle is not cached by this pool"
                );
                panic!(
                    "cannot find cached surface {handle} from pool, data corruption is possible"
                );
            }
        }
    }

    /// 统计当前锁计数为 0 的表面数量，O(n)。
    ///
    /// 与并发加解锁同时进行时，结果只是某一时刻附近的近似快照。
    pub fn free_count(&self) -> usize {
        self.surfaces
            .iter()
            .filter(|surface| is_free(surface))
            .count()
    }

    /// 按扫描顺序遍历成员。
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Surface>> + '_ {
        self.surfaces.iter()
    }
}

fn is_free(surface: &Surface) -> bool {
    surface.get_locks_count() == 0
}
