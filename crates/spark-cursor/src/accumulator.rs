//! 池化累加器：默认的块供应方。
//!
//! # 模块定位（Why）
//! - 为 [`GrowableWriter`](crate::GrowableWriter) 提供开箱即用的输出目标：
//!   独占一块从 [`ChunkAllocator`] 租来的内存，写满后几何扩容；
//! - 写入结束后以 `written()` 暴露只读前缀，供上层直接发送或交给读游标。
//!
//! # 扩容策略（How）
//! - 剩余容量不足以容纳建议长度时扩容，增量取 `max(建议长度, 当前容量)`；
//! - 首次分配至少为 `min_first_allocation`（默认 256）个元素；
//! - 扩容时租借新块、拷贝已写前缀 `[0, index)`、归还旧块，三步对调用方不可分割。

use alloc::boxed::Box;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    alloc_pool::{ChunkAllocator, HeapAllocator},
    error::CursorError,
    supplier::ChunkSupplier,
};

const DEFAULT_MIN_FIRST_ALLOCATION: usize = 256;

/// 累加器配置。
///
/// ```rust
/// use spark_cursor::AccumulatorOptions;
///
/// let options = AccumulatorOptions::default();
/// assert_eq!(options.min_first_allocation, 256);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorOptions {
    /// 构造时立即租借的容量；`None` 表示延迟到首次写入。
    pub initial_capacity: Option<usize>,
    /// 首次扩容的最小元素数。
    pub min_first_allocation: usize,
}

impl Default for AccumulatorOptions {
    fn default() -> Self {
        Self {
            initial_capacity: None,
            min_first_allocation: DEFAULT_MIN_FIRST_ALLOCATION,
        }
    }
}

impl AccumulatorOptions {
    /// 校验配置；零值容量返回 [`CursorError::InvalidArgument`]。
    pub fn validate(&self) -> Result<(), CursorError> {
        if self.initial_capacity == Some(0) {
            return Err(CursorError::invalid_argument(
                "initial_capacity",
                "must be greater than zero",
            ));
        }
        if self.min_first_allocation == 0 {
            return Err(CursorError::invalid_argument(
                "min_first_allocation",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// 独占单块后备内存的块供应方。
///
/// # 教案式说明
/// - **意图 (Why)**：以最少的拷贝次数累积长度未知的输出，摊薄多次小写入的扩容成本；
/// - **契约 (What)**：
///   - 初始无后备块（容量为 0），首次 `acquire_window` 时才租借；
///   - `report(n)` 超过剩余容量时返回 [`CursorError::Overrun`]；
///   - 后备块在扩容、[`release`](Self::release) 或 `Drop` 时归还分配器，且每块恰好归还一次；
/// - **风险 (Trade-offs)**：扩容需要拷贝已写前缀，超大输出应提前通过 `with_capacity` 预留。
pub struct PooledAccumulator<T, A = HeapAllocator>
where
    A: ChunkAllocator<T>,
{
    allocator: A,
    backing: Option<Box<[T]>>,
    index: usize,
    min_first_allocation: usize,
}

impl<T> PooledAccumulator<T, HeapAllocator>
where
    T: Copy + Default,
{
    /// 使用堆分配器、延迟首次分配。
    pub fn new() -> Self {
        Self::with_allocator(HeapAllocator)
    }

    /// 使用堆分配器并立即预留 `capacity` 个元素；`capacity == 0` 返回 `InvalidArgument`。
    pub fn with_capacity(capacity: usize) -> Result<Self, CursorError> {
        Self::with_options(
            HeapAllocator,
            AccumulatorOptions {
                initial_capacity: Some(capacity),
                ..AccumulatorOptions::default()
            },
        )
    }
}

impl<T> Default for PooledAccumulator<T, HeapAllocator>
where
    T: Copy + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> PooledAccumulator<T, A>
where
    T: Copy + Default,
    A: ChunkAllocator<T>,
{
    /// 使用指定分配器、默认配置。
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            backing: None,
            index: 0,
            min_first_allocation: DEFAULT_MIN_FIRST_ALLOCATION,
        }
    }

    /// 使用指定分配器与配置。
    pub fn with_options(allocator: A, options: AccumulatorOptions) -> Result<Self, CursorError> {
        options.validate()?;
        let mut accumulator = Self {
            allocator,
            backing: None,
            index: 0,
            min_first_allocation: options.min_first_allocation,
        };
        if let Some(capacity) = options.initial_capacity {
            accumulator.backing = Some(accumulator.rent_checked(capacity)?);
        }
        Ok(accumulator)
    }

    /// 已写入的前缀 `[0, index)`。
    pub fn written(&self) -> &[T] {
        self.backing
            .as_deref()
            .map_or(&[][..], |backing| &backing[..self.index])
    }

    /// 已写入的元素数。
    pub fn written_count(&self) -> usize {
        self.index
    }

    /// 后备块长度。
    pub fn capacity(&self) -> usize {
        self.backing.as_deref().map_or(0, <[T]>::len)
    }

    /// 剩余可写容量。
    pub fn free_capacity(&self) -> usize {
        self.capacity() - self.index
    }

    /// 清零已写区域并重置写指针，保留后备块。
    pub fn clear(&mut self) {
        if let Some(backing) = self.backing.as_deref_mut() {
            backing[..self.index].fill(T::default());
        }
        self.index = 0;
    }

    /// 立即归还后备块并回到初始的零容量状态；之后仍可继续写入。
    pub fn release(&mut self) {
        if let Some(backing) = self.backing.take() {
            self.allocator.release(backing);
        }
        self.index = 0;
    }

    /// 分配器的只读引用。
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    fn ensure_free(&mut self, size_hint: usize) -> Result<(), CursorError> {
        let size_hint = size_hint.max(1);
        if size_hint <= self.free_capacity() {
            return Ok(());
        }

        let capacity = self.capacity();
        let mut grow_by = size_hint.max(capacity);
        if capacity == 0 {
            grow_by = grow_by.max(self.min_first_allocation);
        }
        let new_capacity = capacity.checked_add(grow_by).ok_or_else(|| {
            CursorError::invalid_argument("size_hint", "accumulator capacity overflows usize")
        })?;

        let mut chunk = self.rent_checked(new_capacity)?;
        if let Some(old) = self.backing.take() {
            chunk[..self.index].copy_from_slice(&old[..self.index]);
            self.allocator.release(old);
        }
        debug!(
            old_capacity = capacity,
            new_capacity = chunk.len(),
            preserved = self.index,
            "pooled accumulator grew"
        );
        self.backing = Some(chunk);
        Ok(())
    }

    fn rent_checked(&self, min_len: usize) -> Result<Box<[T]>, CursorError> {
        let chunk = self.allocator.rent(min_len)?;
        if chunk.len() < min_len {
            let len = chunk.len();
            self.allocator.release(chunk);
            warn!(min_len, len, "chunk allocator returned a short chunk");
            return Err(CursorError::contract_violation(
                "chunk allocator returned a chunk shorter than requested",
            ));
        }
        Ok(chunk)
    }
}

impl<A> PooledAccumulator<u8, A>
where
    A: ChunkAllocator<u8>,
{
    /// 把已写前缀拷贝为 [`bytes::Bytes`]，可在释放后备块后继续持有。
    pub fn to_bytes(&self) -> bytes::Bytes {
        let written = self
            .backing
            .as_deref()
            .map_or(&[][..], |backing| &backing[..self.index]);
        bytes::Bytes::copy_from_slice(written)
    }
}

impl<T, A> ChunkSupplier<T> for PooledAccumulator<T, A>
where
    T: Copy + Default,
    A: ChunkAllocator<T>,
{
    fn acquire_window(&mut self, size_hint: usize) -> Result<&mut [T], CursorError> {
        self.ensure_free(size_hint)?;
        Ok(self.window_mut())
    }

    fn window_mut(&mut self) -> &mut [T] {
        match self.backing.as_deref_mut() {
            Some(backing) => &mut backing[self.index..],
            None => &mut [],
        }
    }

    fn report(&mut self, count: usize) -> Result<(), CursorError> {
        let available = self.free_capacity();
        if count > available {
            return Err(CursorError::Overrun {
                requested: count,
                available,
            });
        }
        self.index += count;
        Ok(())
    }
}

impl<T, A> Drop for PooledAccumulator<T, A>
where
    A: ChunkAllocator<T>,
{
    fn drop(&mut self) {
        if let Some(backing) = self.backing.take() {
            self.allocator.release(backing);
        }
    }
}

impl<T, A> core::fmt::Debug for PooledAccumulator<T, A>
where
    A: ChunkAllocator<T>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PooledAccumulator")
            .field("written", &self.index)
            .field(
                "capacity",
                &self.backing.as_deref().map_or(0, <[T]>::len),
            )
            .finish()
    }
}
