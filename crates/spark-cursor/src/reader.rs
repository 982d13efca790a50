//! 跨块读游标。
//!
//! # 模块定位（Why）
//! - 对上层解码器屏蔽“数据是否连续”这一差异：无论输入是一块切片还是一条块链，
//!   都以同一组 `try_peek`/`try_read`/`advance`/`rewind`/`try_copy_to` 原语消费；
//! - 单块输入走只做下标运算的快路径，多块输入才进入链表遍历。
//!
//! # 状态不变量（What）
//! - `0 <= current_span_index <= current_span.len()`；
//! - `consumed + remaining == len`；
//! - 多块模式下，除非已到达末尾，否则 `current_span_index < current_span.len()`，
//!   即游标永远不会停在空块或已读尽的块上，空块因此对所有遍历路径透明；
//! - 失败的 `advance`/`rewind` 不改变任何字段。

use core::{cell::Cell, fmt};

use crate::{
    error::CursorError,
    sequence::{ChunkSegment, ChunkSequence, SequencePosition},
};

/// 面向单块或块链的只读游标。
///
/// # 教案式说明
/// - **意图 (Why)**：为定宽解码与协议解析提供零拷贝的逐元素/逐段访问；
/// - **契约 (What)**：
///   - 游标借用源数据，生命周期不得超过源；不实现 `Clone`，避免两个游标对同一读取进度产生分歧；
///   - `advance` 在修改任何状态前先校验剩余量，失败即原样返回；
///   - `try_copy_to` 只拷贝不前移，支持“先看后决定”的推测性解析；
/// - **设计权衡 (Trade-offs)**：块链没有回指针，跨块 `rewind` 需要回到链首重放前移，
///   代价为 O(目标偏移)，而非 O(回退距离)。
pub struct SegmentedReader<'a, T> {
    sequence: Option<&'a ChunkSequence<'a, T>>,
    current_segment: Option<&'a ChunkSegment<'a, T>>,
    current_span: &'a [T],
    current_span_index: usize,
    consumed: u64,
    length: Cell<Option<u64>>,
    single_span: bool,
}

impl<'a, T: Copy> SegmentedReader<'a, T> {
    /// 基于单块连续切片构建游标。
    pub fn new(span: &'a [T]) -> Self {
        Self {
            sequence: None,
            current_segment: None,
            current_span: span,
            current_span_index: 0,
            consumed: 0,
            length: Cell::new(Some(span.len() as u64)),
            single_span: true,
        }
    }

    /// 基于块链构建游标。
    ///
    /// 链中至多只有一个非空块时自动退化为单块快路径。
    pub fn from_sequence(sequence: &'a ChunkSequence<'a, T>) -> Self {
        let mut non_empty = core::iter::successors(sequence.head(), |segment| segment.next())
            .filter(|segment| !segment.memory().is_empty());
        let first = non_empty.next();
        let has_more = non_empty.next().is_some();

        if !has_more {
            let span = first.map_or(&[][..], ChunkSegment::memory);
            return Self {
                sequence: Some(sequence),
                current_segment: first,
                current_span: span,
                current_span_index: 0,
                consumed: 0,
                length: Cell::new(Some(span.len() as u64)),
                single_span: true,
            };
        }

        let mut reader = Self {
            sequence: Some(sequence),
            current_segment: None,
            current_span: &[],
            current_span_index: 0,
            consumed: 0,
            length: Cell::new(None),
            single_span: false,
        };
        reader.reset_to_start();
        reader
    }

    /// 当前逻辑位置的元素，不前移；到达末尾返回 `None`。
    pub fn try_peek(&self) -> Option<T> {
        self.current_span.get(self.current_span_index).copied()
    }

    /// 读取当前元素并前移一位；到达末尾返回 `None`。
    pub fn try_read(&mut self) -> Option<T> {
        let value = self.try_peek()?;
        self.current_span_index += 1;
        self.consumed += 1;
        if self.current_span_index == self.current_span.len() {
            self.move_to_next_span();
        }
        Some(value)
    }

    /// 前移 `count` 个元素。
    ///
    /// # 契约说明（What）
    /// - 当前块能容纳时只做下标运算；
    /// - 否则沿块链前进并跳过空块；
    /// - `count` 超过剩余量时返回 [`CursorError::OutOfRange`]，游标状态保持不变。
    pub fn advance(&mut self, count: u64) -> Result<(), CursorError> {
        let in_span = self.unread_span().len() as u64;
        if count < in_span {
            self.current_span_index += count as usize;
            self.consumed += count;
            return Ok(());
        }

        let available = self.remaining();
        if count > available {
            return Err(CursorError::OutOfRange {
                requested: count,
                available,
            });
        }
        self.advance_across_spans(count);
        Ok(())
    }

    /// 与 [`advance`](Self::advance) 相同，但以布尔值报告是否成功。
    pub fn try_advance(&mut self, count: u64) -> bool {
        self.advance(count).is_ok()
    }

    /// 回退 `count` 个元素。
    ///
    /// 目标仍在当前块内时为 O(1)；否则回到链首并重放前移到目标偏移。
    /// `count` 超过已消费量时返回 [`CursorError::OutOfRange`]，游标状态保持不变。
    pub fn rewind(&mut self, count: u64) -> Result<(), CursorError> {
        if count > self.consumed {
            return Err(CursorError::OutOfRange {
                requested: count,
                available: self.consumed,
            });
        }
        if count <= self.current_span_index as u64 {
            self.current_span_index -= count as usize;
            self.consumed -= count;
            return Ok(());
        }

        let target = self.consumed - count;
        self.reset_to_start();
        self.advance_across_spans(target);
        Ok(())
    }

    /// 从当前位置起拷贝恰好 `destination.len()` 个元素，不前移游标。
    ///
    /// 剩余数据不足时返回 `false`，`destination` 不会被写入任何内容。
    pub fn try_copy_to(&self, destination: &mut [T]) -> bool {
        let first = self.unread_span();
        if first.len() >= destination.len() {
            destination.copy_from_slice(&first[..destination.len()]);
            return true;
        }
        if self.single_span || destination.len() as u64 > self.remaining() {
            return false;
        }

        destination[..first.len()].copy_from_slice(first);
        let mut copied = first.len();
        let mut segment = self.current_segment.and_then(ChunkSegment::next);
        while let Some(current) = segment {
            if copied == destination.len() {
                break;
            }
            let memory = current.memory();
            let take = memory.len().min(destination.len() - copied);
            destination[copied..copied + take].copy_from_slice(&memory[..take]);
            copied += take;
            segment = current.next();
        }
        copied == destination.len()
    }

    /// 当前块尚未读取的部分。
    pub fn unread_span(&self) -> &'a [T] {
        &self.current_span[self.current_span_index..]
    }

    /// 当前块的完整视图。
    pub fn current_span(&self) -> &'a [T] {
        self.current_span
    }

    /// 当前块内偏移。
    pub fn current_span_index(&self) -> usize {
        self.current_span_index
    }

    /// 已消费的元素数。
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// 剩余的元素数。
    pub fn remaining(&self) -> u64 {
        self.len() - self.consumed
    }

    /// 数据总长度；多块模式下首次查询时遍历整条链并缓存。
    pub fn len(&self) -> u64 {
        if let Some(length) = self.length.get() {
            return length;
        }
        let length = self.sequence.map_or(0, ChunkSequence::len);
        self.length.set(Some(length));
        length
    }

    /// 源数据是否为空。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否已读尽。
    pub fn is_end(&self) -> bool {
        self.current_span_index >= self.current_span.len()
    }

    /// 底层块链；由单块切片构建的游标返回 `None`。
    pub fn sequence(&self) -> Option<&'a ChunkSequence<'a, T>> {
        self.sequence
    }

    /// 当前逻辑偏移在块链中的位置令牌；由单块切片构建的游标返回 `None`。
    pub fn position(&self) -> Option<SequencePosition<'a, T>> {
        let sequence = self.sequence?;
        Some(match self.current_segment {
            Some(segment) => SequencePosition::new(Some(segment), self.current_span_index),
            None => sequence.start(),
        })
    }

    fn reset_to_start(&mut self) {
        self.consumed = 0;
        self.current_span_index = 0;
        if self.single_span {
            return;
        }
        let head = self.sequence.and_then(ChunkSequence::head);
        self.current_segment = head;
        self.current_span = head.map_or(&[][..], ChunkSegment::memory);
        if self.current_span.is_empty() {
            self.move_to_next_span();
        }
    }

    /// 移动到下一个非空块；不存在时保持原状并返回 `false`。
    fn move_to_next_span(&mut self) -> bool {
        if self.single_span {
            return false;
        }
        let mut segment = self.current_segment.and_then(ChunkSegment::next);
        while let Some(current) = segment {
            if !current.memory().is_empty() {
                self.current_segment = Some(current);
                self.current_span = current.memory();
                self.current_span_index = 0;
                return true;
            }
            segment = current.next();
        }
        false
    }

    /// 调用方已确认 `count <= remaining()`。
    fn advance_across_spans(&mut self, mut count: u64) {
        loop {
            let in_span = self.unread_span().len() as u64;
            if count < in_span {
                self.current_span_index += count as usize;
                self.consumed += count;
                return;
            }
            self.current_span_index = self.current_span.len();
            self.consumed += in_span;
            count -= in_span;
            if !self.move_to_next_span() {
                return;
            }
        }
    }
}

impl<T> fmt::Debug for SegmentedReader<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedReader")
            .field("consumed", &self.consumed)
            .field("current_span_len", &self.current_span.len())
            .field("current_span_index", &self.current_span_index)
            .field("single_span", &self.single_span)
            .finish()
    }
}

impl bytes::Buf for SegmentedReader<'_, u8> {
    fn remaining(&self) -> usize {
        usize::try_from(SegmentedReader::remaining(self)).unwrap_or(usize::MAX)
    }

    fn chunk(&self) -> &[u8] {
        self.unread_span()
    }

    fn advance(&mut self, cnt: usize) {
        if let Err(err) = SegmentedReader::advance(self, cnt as u64) {
            panic!("Buf::advance 超出剩余数据: {err}");
        }
    }
}
