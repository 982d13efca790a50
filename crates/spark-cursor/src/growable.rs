//! 可增长写游标。
//!
//! # 模块定位（Why）
//! - 输出长度事先未知时，写入方不应自己管理扩容，而是向 [`ChunkSupplier`] 按需索取窗口；
//! - 写游标只负责三件事：在窗口内累积“已写未报告”的数据、在需要新窗口前先提交、
//!   把超过单个窗口的输入拆片写入。
//!
//! # 状态说明（What）
//! - `committed`：已报告给供应方的累计元素数，单调不减；
//! - `buffered`：已写入当前窗口、尚未报告的元素数；
//! - 可见窗口为供应方当前窗口的 `[buffered, window_len)` 区间，永远不包含已提交的数据。

use tracing::warn;

use crate::{error::CursorError, supplier::ChunkSupplier};

/// 基于块供应方的写游标。
///
/// # 教案式说明
/// - **意图 (Why)**：把“写入”与“内存从哪里来”解耦，同一套编码逻辑可以落到池化缓冲、
///   网络发送队列或任意自定义目标；
/// - **契约 (What)**：
///   - 构造时立即索取首个窗口，供应方返回空窗口即视为契约违背；
///   - `advance` 只缩小可见窗口，窗口用尽后不会自动补充，下一次 `ensure`/`write` 才会索取新窗口；
///   - `commit` 可重复调用，`buffered == 0` 时为空操作；
/// - **风险 (Trade-offs)**：未提交的数据对供应方不可见，调用方结束写入前必须 `commit`
///   或调用 [`into_inner`](Self::into_inner)。
pub struct GrowableWriter<T, S> {
    supplier: S,
    window_len: usize,
    buffered: usize,
    committed: u64,
    _element: core::marker::PhantomData<fn(T) -> T>,
}

impl<T, S> GrowableWriter<T, S>
where
    S: ChunkSupplier<T>,
{
    /// 包装供应方并索取首个窗口。
    pub fn new(supplier: S) -> Result<Self, CursorError> {
        let mut writer = Self {
            supplier,
            window_len: 0,
            buffered: 0,
            committed: 0,
            _element: core::marker::PhantomData,
        };
        writer.acquire(0)?;
        Ok(writer)
    }

    /// 当前可见窗口，可就地写入后调用 [`advance`](Self::advance) 确认。
    ///
    /// 供应方窗口若在两次调用之间缩短，返回的切片随之截断，
    /// 随后的 `advance`/`write` 会报告 `ContractViolation`。
    pub fn window(&mut self) -> &mut [T] {
        let window = self.supplier.window_mut();
        let end = self.window_len.min(window.len());
        let start = self.buffered.min(end);
        &mut window[start..end]
    }

    /// 当前可见窗口长度。
    pub fn window_len(&self) -> usize {
        self.window_len - self.buffered
    }

    /// 已报告给供应方的累计元素数。
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// 已写入但尚未报告的元素数。
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// 底层供应方的只读引用。
    pub fn supplier(&self) -> &S {
        &self.supplier
    }

    /// 确认可见窗口头部 `count` 个元素已写入。
    pub fn advance(&mut self, count: usize) -> Result<(), CursorError> {
        self.check_window()?;
        let available = self.window_len();
        if count > available {
            return Err(CursorError::Overrun {
                requested: count,
                available,
            });
        }
        self.buffered += count;
        Ok(())
    }

    /// 把已缓冲的数据报告给供应方。
    pub fn commit(&mut self) -> Result<(), CursorError> {
        let buffered = self.buffered;
        if buffered == 0 {
            return Ok(());
        }
        self.supplier.report(buffered)?;
        self.committed += buffered as u64;
        self.buffered = 0;
        let rest = self.window_len - buffered;
        self.window_len = rest.min(self.supplier.window_mut().len());
        Ok(())
    }

    /// 确保可见窗口非空且尽量能容纳 `count` 个元素。
    ///
    /// 当前窗口不足时先提交，再以 `count` 为建议长度索取新窗口。
    /// 供应方可能返回比 `count` 更短的非空窗口，[`write`](Self::write) 会自动分片处理。
    pub fn ensure(&mut self, count: usize) -> Result<(), CursorError> {
        let available = self.window_len();
        if available == 0 || available < count {
            self.commit()?;
            self.acquire(count)?;
        }
        Ok(())
    }

    /// 写入整个 `source`，必要时跨多个窗口。
    ///
    /// 当前窗口放得下时一次拷贝完成，失败不留下任何数据；
    /// 跨窗口写入不具备原子性，中途索取失败时前面的分片已经缓冲或提交。
    pub fn write(&mut self, source: &[T]) -> Result<(), CursorError>
    where
        T: Copy,
    {
        self.check_window()?;
        if source.len() <= self.window_len() {
            self.window()[..source.len()].copy_from_slice(source);
            self.buffered += source.len();
            return Ok(());
        }

        let mut rest = source;
        while !rest.is_empty() {
            if self.window_len() == 0 {
                self.ensure(rest.len())?;
                self.check_window()?;
            }
            let take = self.window_len().min(rest.len());
            self.window()[..take].copy_from_slice(&rest[..take]);
            self.buffered += take;
            rest = &rest[take..];
        }
        Ok(())
    }

    /// 提交剩余缓冲并交还供应方。
    pub fn into_inner(mut self) -> Result<S, CursorError> {
        self.commit()?;
        Ok(self.supplier)
    }

    fn check_window(&mut self) -> Result<(), CursorError> {
        let actual = self.supplier.window_mut().len();
        if actual < self.window_len {
            warn!(
                expected = self.window_len,
                actual, "chunk supplier shrank the current window"
            );
            return Err(CursorError::contract_violation(
                "chunk supplier shrank the current window",
            ));
        }
        Ok(())
    }

    fn acquire(&mut self, size_hint: usize) -> Result<(), CursorError> {
        let len = self.supplier.acquire_window(size_hint)?.len();
        if len == 0 {
            warn!(size_hint, "chunk supplier returned an empty window");
            return Err(CursorError::contract_violation(
                "chunk supplier returned an empty window",
            ));
        }
        self.window_len = len;
        Ok(())
    }
}

impl<T, S> core::fmt::Debug for GrowableWriter<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GrowableWriter")
            .field("window_len", &(self.window_len - self.buffered))
            .field("buffered", &self.buffered)
            .field("committed", &self.committed)
            .finish()
    }
}

#[cfg(feature = "std")]
impl<S> std::io::Write for GrowableWriter<u8, S>
where
    S: ChunkSupplier<u8>,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        GrowableWriter::write(self, buf)?;
        Ok(buf.len())
    }

    /// 把缓冲数据提交给供应方。
    fn flush(&mut self) -> std::io::Result<()> {
        self.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{vec, vec::Vec};

    /// 每次只给出固定长度窗口的供应方，用于覆盖跨窗口写入。
    struct FixedWindows {
        storage: Vec<u8>,
        window: Vec<u8>,
        window_size: usize,
        reports: Vec<usize>,
        acquires: usize,
    }

    impl FixedWindows {
        fn new(window_size: usize) -> Self {
            Self {
                storage: Vec::new(),
                window: Vec::new(),
                window_size,
                reports: Vec::new(),
                acquires: 0,
            }
        }
    }

    impl ChunkSupplier<u8> for FixedWindows {
        fn acquire_window(&mut self, _size_hint: usize) -> Result<&mut [u8], CursorError> {
            self.acquires += 1;
            self.window = vec![0; self.window_size];
            Ok(&mut self.window)
        }

        fn window_mut(&mut self) -> &mut [u8] {
            &mut self.window
        }

        fn report(&mut self, count: usize) -> Result<(), CursorError> {
            if count > self.window.len() {
                return Err(CursorError::Overrun {
                    requested: count,
                    available: self.window.len(),
                });
            }
            self.storage.extend(self.window.drain(..count));
            self.reports.push(count);
            Ok(())
        }
    }

    struct Broken;

    impl ChunkSupplier<u8> for Broken {
        fn acquire_window(&mut self, _size_hint: usize) -> Result<&mut [u8], CursorError> {
            Ok(&mut [])
        }

        fn window_mut(&mut self) -> &mut [u8] {
            &mut []
        }

        fn report(&mut self, _count: usize) -> Result<(), CursorError> {
            Ok(())
        }
    }

    #[test]
    fn write_splits_across_small_windows() {
        let mut writer = GrowableWriter::new(FixedWindows::new(3)).expect("首个窗口非空");
        writer.write(&[1, 2, 3, 4, 5, 6, 7]).expect("跨窗口写入");
        assert_eq!(writer.buffered(), 1);
        assert_eq!(writer.committed(), 6);

        let supplier = writer.into_inner().expect("提交剩余数据");
        assert_eq!(supplier.storage, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(supplier.reports, vec![3, 3, 1]);
        assert_eq!(supplier.acquires, 3);
    }

    #[test]
    fn advance_does_not_refill() {
        let mut writer = GrowableWriter::new(FixedWindows::new(2)).expect("首个窗口非空");
        writer.window().copy_from_slice(&[9, 9]);
        writer.advance(2).expect("窗口内推进");
        assert_eq!(writer.window_len(), 0);
        assert_eq!(writer.supplier().acquires, 1);
        assert!(matches!(
            writer.advance(1),
            Err(CursorError::Overrun {
                requested: 1,
                available: 0
            })
        ));

        writer.ensure(1).expect("窗口用尽后重新索取");
        assert_eq!(writer.committed(), 2);
        assert_eq!(writer.supplier().acquires, 2);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut writer = GrowableWriter::new(FixedWindows::new(4)).expect("首个窗口非空");
        writer.write(&[1, 2]).expect("窗口内写入");
        writer.commit().expect("首次提交");
        writer.commit().expect("重复提交为空操作");
        assert_eq!(writer.committed(), 2);
        assert_eq!(writer.window_len(), 2);
        assert_eq!(writer.supplier().reports, vec![2]);
    }

    /// 索取后把 `window_mut` 缩短为 1 的供应方。
    struct Shrinking {
        window: Vec<u8>,
    }

    impl ChunkSupplier<u8> for Shrinking {
        fn acquire_window(&mut self, _size_hint: usize) -> Result<&mut [u8], CursorError> {
            Ok(&mut self.window[..])
        }

        fn window_mut(&mut self) -> &mut [u8] {
            &mut self.window[..1]
        }

        fn report(&mut self, _count: usize) -> Result<(), CursorError> {
            Ok(())
        }
    }

    #[test]
    fn shrunk_supplier_window_fails_loudly() {
        let mut writer = GrowableWriter::new(Shrinking { window: vec![0; 4] }).expect("首个窗口");
        assert_eq!(writer.window().len(), 1);

        let err = writer.write(&[1, 2, 3]).expect_err("窗口已被缩短");
        assert_eq!(err.code(), crate::codes::CONTRACT_VIOLATION);
        assert!(writer.advance(2).is_err());
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.committed(), 0);
    }

    #[test]
    fn empty_window_is_a_contract_violation() {
        let err = GrowableWriter::<u8, _>::new(Broken).expect_err("空窗口必须失败");
        assert_eq!(err.code(), crate::codes::CONTRACT_VIOLATION);
    }
}
