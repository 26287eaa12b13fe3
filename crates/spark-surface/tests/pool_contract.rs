//! `pool_contract` 集成测试：验证 `CachedPool` 的扫描、耗尽、索引与内存寿命契约。
//!
//! # 测试目标（Why）
//! - 扫描游标决定租借顺序，回绕逻辑出错会导致空闲槽位被漏掉或被重复交出；
//! - 句柄索引必须与有序序列同步，否则驱动回调会解析到错误的帧；
//! - 池清空后，外部仍持有的表面必须继续保持内存存活。
//!
//! # 结构安排（How）
//! - 固定场景覆盖规格化的租借/耗尽/恢复流程；
//! - `proptest` 覆盖任意占用集合下 `find_free` 不会交出已占用表面。

#![cfg(not(any(loom, spark_loom)))]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use proptest::prelude::*;
use spark_surface::{
    CachedPool, MemoryBlock, NativeSurface, SharedMemory, SlotLayout, Surface, SurfaceHandle,
    SurfacePoolError,
};

struct TrackedBlock {
    drops: Arc<AtomicUsize>,
}

impl MemoryBlock for TrackedBlock {
    fn len(&self) -> usize {
        0
    }

    fn as_bytes(&self) -> &[u8] {
        &[]
    }
}

impl Drop for TrackedBlock {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn populate(pool: &mut CachedPool, size: usize, memory: Option<&SharedMemory>) {
    pool.reserve(size);
    for index in 0..size {
        pool.push_back(Surface::create_surface(
            NativeSurface::new(SlotLayout::new(index, index * 8, 8)),
            memory.cloned(),
        ));
    }
}

fn pool_of(size: usize) -> CachedPool {
    let mut pool = CachedPool::new();
    populate(&mut pool, size, None);
    pool
}

/// 全部空闲的池连续租借 N 次，应按插入顺序各交出一次。
#[test]
fn sequential_borrow_visits_each_surface_once() {
    let mut pool = pool_of(10);
    let borrowed: Vec<_> = (0..10)
        .map(|_| {
            let surface = pool.find_free().expect("池未耗尽");
            assert_eq!(surface.obtain_lock(), 0);
            surface
        })
        .collect();

    let order: Vec<_> = borrowed.iter().map(|surface| surface.layout().index).collect();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
}

/// 验证耗尽与恢复流程。
///
/// # 步骤说明（How）
/// 1. 租借并锁住全部 N 个表面；
/// 2. 第 N+1 次租借返回 `Exhausted`，且携带池大小；
/// 3. 释放任意一个表面后，下一次租借成功并交出锁计数为 0 的表面。
#[test]
fn exhausted_pool_recovers_after_release() {
    let mut pool = pool_of(10);
    let held: Vec<_> = (0..10)
        .map(|_| {
            let surface = pool.find_free().expect("池未耗尽");
            surface.obtain_lock();
            surface
        })
        .collect();

    for _ in 0..10 {
        assert_eq!(
            pool.find_free().expect_err("池已耗尽"),
            SurfacePoolError::Exhausted { size: 10 }
        );
    }

    assert_eq!(held[6].release_lock(), 1);
    let recovered = pool.find_free().expect("释放后应能租借");
    assert_eq!(recovered.get_locks_count(), 0);
    assert!(Arc::ptr_eq(&recovered, &held[6]));
}

#[test]
fn find_by_handle_returns_exact_surface() {
    let mut pool = pool_of(5);
    let members: Vec<_> = pool.iter().cloned().collect();
    for member in &members {
        let resolved = pool.find_by_handle(member.get_handle());
        assert!(Arc::ptr_eq(&resolved, member));
    }
    assert_eq!(pool.size(), 5);
    pool.clear();
    assert_eq!(pool.size(), 0);
}

#[test]
#[should_panic(expected = "data corruption is possible")]
fn find_by_foreign_handle_is_fatal() {
    let pool = pool_of(3);
    let foreign = Surface::create_surface(NativeSurface::new(SlotLayout::new(0, 0, 8)), None);
    pool.find_by_handle(foreign.get_handle());
}

#[test]
#[should_panic(expected = "data corruption is possible")]
fn find_by_handle_after_clear_is_fatal() {
    let mut pool = pool_of(2);
    let stale: SurfaceHandle = pool.find_free().expect("空闲表面").get_handle();
    pool.clear();
    pool.find_by_handle(stale);
}

/// 池与外部持有者共同决定内存寿命。
///
/// # 契约校验（What）
/// - 清空池时仍有一个外部表面引用：内存存活；
/// - 释放该引用后：内存恰好释放一次。
#[test]
fn memory_survives_pool_clear_while_surface_is_held() {
    let drops = Arc::new(AtomicUsize::new(0));
    let memory: SharedMemory = Arc::new(TrackedBlock {
        drops: Arc::clone(&drops),
    });

    let mut pool = CachedPool::new();
    populate(&mut pool, 8, Some(&memory));
    drop(memory);

    let external = pool.find_free().expect("空闲表面");
    pool.clear();
    assert_eq!(drops.load(Ordering::SeqCst), 0, "外部引用仍持有内存");

    drop(external);
    assert_eq!(drops.load(Ordering::SeqCst), 1, "内存应恰好释放一次");
}

/// 表面被多个组件共享持有时，只要锁计数为 0，池仍视其为空闲。
#[test]
fn shared_ownership_does_not_mark_surface_busy() {
    let mut pool = pool_of(1);
    let first = pool.find_free().expect("空闲表面");
    let extra_owners: Vec<_> = (0..4).map(|_| Arc::clone(&first)).collect();
    let again = pool.find_free().expect("未加锁的表面仍应空闲");
    assert!(Arc::ptr_eq(&first, &again));
    assert!(Arc::strong_count(&first) > 1);
    drop(extra_owners);
}

proptest! {
    /// 任意占用集合下，`find_free` 只交出未占用表面；全部占用时返回耗尽。
    #[test]
    fn find_free_never_returns_locked_surface(
        size in 1usize..32,
        held_mask in proptest::collection::vec(any::<bool>(), 32),
        warmup in 0usize..64,
    ) {
        let mut pool = pool_of(size);
        // 预先推进游标，覆盖回绕路径。
        for _ in 0..warmup {
            pool.find_free().expect("初始全部空闲");
        }

        let members: Vec<_> = pool.iter().cloned().collect();
        for (member, held) in members.iter().zip(&held_mask) {
            if *held {
                member.obtain_lock();
            }
        }
        let free = members.iter().zip(&held_mask).filter(|(_, held)| !**held).count();
        prop_assert_eq!(pool.free_count(), free);

        match pool.find_free() {
            Ok(surface) => {
                prop_assert_eq!(surface.get_locks_count(), 0);
            }
            Err(error) => {
                prop_assert_eq!(free, 0);
                prop_assert_eq!(error, SurfacePoolError::Exhausted { size });
            }
        }
    }

    /// 从任意游标位置出发，连续加锁租借恰好覆盖全部成员一次。
    #[test]
    fn borrow_round_covers_all_members(size in 1usize..32, warmup in 0usize..64) {
        let mut pool = pool_of(size);
        for _ in 0..warmup {
            pool.find_free().expect("初始全部空闲");
        }

        let mut seen: Vec<usize> = (0..size)
            .map(|_| {
                let surface = pool.find_free().expect("池未耗尽");
                surface.obtain_lock();
                surface.layout().index
            })
            .collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..size).collect::<Vec<_>>());
        prop_assert!(pool.find_free().is_err());
    }
}
