//! 块分配器契约与默认实现。
//!
//! # 模块定位（Why）
//! - [`PooledAccumulator`](crate::PooledAccumulator) 只消费“租借/归还”两个动作，
//!   不关心块来自全局堆还是共享池；该模块定义 [`ChunkAllocator`] 并给出两种实现；
//! - [`HeapAllocator`]：每次租借都新分配，归还即释放，适合一次性写入；
//! - [`SlabChunkAllocator`]：基于自由链表复用块，适合高频、短生命周期的编码任务。
//!
//! # 契约说明（What）
//! - `rent(min_len)` 返回长度至少为 `min_len` 的块，`min_len > 0` 时不得返回空块；
//! - 每个租出的块恰好归还一次，归还后调用方不再持有任何引用。

use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use spin::Mutex;
use tracing::trace;

use crate::error::CursorError;

/// 块分配器。
pub trait ChunkAllocator<T> {
    /// 租借长度至少为 `min_len` 的块，元素均为 `T::default()`。
    fn rent(&self, min_len: usize) -> Result<Box<[T]>, CursorError>;

    /// 归还此前租借的块。
    fn release(&self, chunk: Box<[T]>);
}

impl<T, A> ChunkAllocator<T> for &A
where
    A: ChunkAllocator<T> + ?Sized,
{
    fn rent(&self, min_len: usize) -> Result<Box<[T]>, CursorError> {
        (**self).rent(min_len)
    }

    fn release(&self, chunk: Box<[T]>) {
        (**self).release(chunk);
    }
}

impl<T, A> ChunkAllocator<T> for Arc<A>
where
    A: ChunkAllocator<T> + ?Sized,
{
    fn rent(&self, min_len: usize) -> Result<Box<[T]>, CursorError> {
        (**self).rent(min_len)
    }

    fn release(&self, chunk: Box<[T]>) {
        (**self).release(chunk);
    }
}

/// 直接使用全局堆的分配器。
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl<T: Default> ChunkAllocator<T> for HeapAllocator {
    fn rent(&self, min_len: usize) -> Result<Box<[T]>, CursorError> {
        filled(min_len)
    }

    fn release(&self, chunk: Box<[T]>) {
        drop(chunk);
    }
}

/// 分配器统计快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// 池管理的全部元素数（租出与空闲之和）。
    pub allocated_elements: usize,
    /// 空闲链表中的元素数。
    pub available_elements: usize,
    /// 当前租出的块数。
    pub active_leases: usize,
    /// 通过复用而非新分配满足的租借次数。
    pub reused_leases: u64,
    /// 空闲链表中的块数。
    pub free_slots: usize,
}

/// 基于自由链表的共享块池。
///
/// # 核心机制（How）
/// - 内部维护 `spin::Mutex<Vec<Box<[T]>>>` 作为自由链表，租借时优先复用长度足够的块；
/// - 复用的块在交付前重置为 `T::default()`，上一位租户写入的内容不会泄漏给下一位；
/// - `PoolMetrics` 以原子计数跟踪元素总量、空闲量与租约数，`statistics` 返回一致性较弱的快照。
///
/// # 契约说明（What）
/// - **线程安全**：克隆句柄共享同一个池，所有共享状态均由 `spin::Mutex` 与原子计数保护；
/// - **后置条件**：`rent(min_len)` 返回的块长度不小于 `min_len`，可能更长。
///
/// # 设计权衡（Trade-offs）
/// - 使用自旋锁而非阻塞锁，以便在 `no_std` 环境中同样可用；临界区只包含链表查找与交换；
/// - `shrink_to_fit` 直接清空自由链表，便于压测结束后快速归还峰值内存。
pub struct SlabChunkAllocator<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for SlabChunkAllocator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SlabChunkAllocator<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free_list: Mutex::new(Vec::new()),
                metrics: PoolMetrics::default(),
            }),
        }
    }
}

impl<T> core::fmt::Debug for SlabChunkAllocator<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlabChunkAllocator")
            .field("stats", &self.statistics())
            .finish()
    }
}

impl<T> SlabChunkAllocator<T> {
    /// 创建空池。
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空自由链表，返回释放的元素数。
    pub fn shrink_to_fit(&self) -> usize {
        let mut list = self.inner.free_list.lock();
        let reclaimed: usize = list.iter().map(|chunk| chunk.len()).sum();
        list.clear();
        self.inner.metrics.decrease_on_shrink(reclaimed);
        reclaimed
    }

    /// 当前统计快照。
    pub fn statistics(&self) -> PoolStats {
        let free_slots = self.inner.free_list.lock().len();
        let metrics = &self.inner.metrics;
        PoolStats {
            allocated_elements: metrics.allocated_elements.load(Ordering::Relaxed),
            available_elements: metrics.available_elements.load(Ordering::Relaxed),
            active_leases: metrics.active_leases.load(Ordering::Relaxed),
            reused_leases: metrics.reused_leases.load(Ordering::Relaxed),
            free_slots,
        }
    }
}

impl<T: Default> ChunkAllocator<T> for SlabChunkAllocator<T> {
    fn rent(&self, min_len: usize) -> Result<Box<[T]>, CursorError> {
        let reused = {
            let mut list = self.inner.free_list.lock();
            list.iter()
                .position(|chunk| chunk.len() >= min_len)
                .map(|index| list.swap_remove(index))
        };

        let metrics = &self.inner.metrics;
        let chunk = match reused {
            Some(mut chunk) => {
                chunk.iter_mut().for_each(|slot| *slot = T::default());
                metrics.decrease_available(chunk.len());
                metrics.reused_leases.fetch_add(1, Ordering::Relaxed);
                trace!(len = chunk.len(), min_len, "slab chunk reused");
                chunk
            }
            None => {
                let chunk = filled(min_len)?;
                metrics
                    .allocated_elements
                    .fetch_add(chunk.len(), Ordering::Relaxed);
                trace!(len = chunk.len(), "slab chunk allocated");
                chunk
            }
        };
        metrics.active_leases.fetch_add(1, Ordering::Relaxed);
        Ok(chunk)
    }

    fn release(&self, chunk: Box<[T]>) {
        let metrics = &self.inner.metrics;
        saturating_sub(&metrics.active_leases, 1);
        metrics
            .available_elements
            .fetch_add(chunk.len(), Ordering::Relaxed);
        trace!(len = chunk.len(), "slab chunk recycled");
        self.inner.free_list.lock().push(chunk);
    }
}

struct PoolInner<T> {
    free_list: Mutex<Vec<Box<[T]>>>,
    metrics: PoolMetrics,
}

#[derive(Default)]
struct PoolMetrics {
    allocated_elements: AtomicUsize,
    available_elements: AtomicUsize,
    active_leases: AtomicUsize,
    reused_leases: AtomicU64,
}

impl PoolMetrics {
    fn decrease_available(&self, len: usize) {
        saturating_sub(&self.available_elements, len);
    }

    fn decrease_on_shrink(&self, len: usize) {
        self.decrease_available(len);
        saturating_sub(&self.allocated_elements, len);
    }
}

fn saturating_sub(target: &AtomicUsize, value: usize) {
    let _ = target.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(value))
    });
}

/// 分配 `len` 个默认值组成的块；超出地址空间或堆耗尽时返回错误而非中止。
fn filled<T: Default>(len: usize) -> Result<Box<[T]>, CursorError> {
    let mut chunk = Vec::new();
    chunk.try_reserve_exact(len).map_err(|_| {
        CursorError::invalid_argument("size_hint", "chunk length exceeds allocator limits")
    })?;
    chunk.resize_with(len, T::default);
    Ok(chunk.into_boxed_slice())
}
