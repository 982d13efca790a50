//! 块供应方契约。
//!
//! # 模块定位（Why）
//! - [`GrowableWriter`](crate::GrowableWriter) 不直接持有内存，而是向供应方索取可写窗口，
//!   写完后再报告实际写入量；该 trait 定义这一协作面；
//! - [`PooledAccumulator`](crate::PooledAccumulator) 是默认实现，调用方也可以对接网络发送缓冲、
//!   内存映射文件等任意“可追加”的目标。
//!
//! # 协议说明（What）
//! 1. `acquire_window(hint)`：返回至少一个元素的可写窗口，`hint` 仅为建议长度；
//! 2. 写入方在窗口头部写入若干元素；
//! 3. `report(n)`：确认窗口头部 `n` 个元素已提交，供应方随即可以移动其写指针。
//!
//! 写入方在调用 `acquire_window` 之前必须先 `report` 已写入的数据，
//! 否则供应方在扩容或换块时无法得知需要保留哪些内容。

use crate::error::CursorError;

/// 向写游标提供可写窗口的协作方。
///
/// # 契约说明（What）
/// - **前置条件**：`report(n)` 中的 `n` 不超过最近一次 `window_mut()` 的长度；
/// - **后置条件**：`acquire_window` 成功返回后，`window_mut()` 与其返回的窗口是同一块区域；
/// - **错误**：为非零请求返回空窗口属于契约违背，写游标会以
///   [`CursorError::ContractViolation`] 失败，而不会无限重试。
pub trait ChunkSupplier<T> {
    /// 索取至少能容纳一个元素的可写窗口，`size_hint` 为期望长度。
    fn acquire_window(&mut self, size_hint: usize) -> Result<&mut [T], CursorError>;

    /// 当前可写窗口，不触发扩容。
    fn window_mut(&mut self) -> &mut [T];

    /// 报告窗口头部 `count` 个元素已经写入。
    fn report(&mut self, count: usize) -> Result<(), CursorError>;
}

impl<T, S> ChunkSupplier<T> for &mut S
where
    S: ChunkSupplier<T> + ?Sized,
{
    fn acquire_window(&mut self, size_hint: usize) -> Result<&mut [T], CursorError> {
        (**self).acquire_window(size_hint)
    }

    fn window_mut(&mut self) -> &mut [T] {
        (**self).window_mut()
    }

    fn report(&mut self, count: usize) -> Result<(), CursorError> {
        (**self).report(count)
    }
}
