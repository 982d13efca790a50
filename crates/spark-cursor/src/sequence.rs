//! 分片链（Sequence）与前向位置令牌。
//!
//! # 模块定位（Why）
//! - 网络收包、池化写入往往产出多个彼此独立分配的块，上层编解码器需要把它们当成一段逻辑连续的字节流来遍历；
//! - 该模块提供只追加、单向链接的块链 [`ChunkSequence`]，以及只能向前推进的位置令牌 [`SequencePosition`]。
//!
//! # 设计要点（How）
//! - 每个节点 [`ChunkSegment`] 只记录三项：借用的块视图、该块在整条链中的起始偏移（`running_index`）、后继指针；
//! - 节点之间没有回指针。需要后退时由读游标回到链首重放前移（见 `SegmentedReader::rewind`），
//!   以此保持节点最小化，并避免父子互指带来的所有权纠缠；
//! - 长度为 0 的块是合法节点，所有遍历路径都必须跳过它们，不能把它当成数据结束。
//!
//! # 契约说明（What）
//! - 位置令牌只能在产生它的同一条链内比较或复用；
//! - 链一经 `build` 即不可变，读游标在其生命周期内只读访问源数据。

use alloc::{boxed::Box, vec::Vec};
use core::{cmp::Ordering, fmt, ptr};

use crate::error::CursorError;

/// 块链中的单个节点。
pub struct ChunkSegment<'a, T> {
    memory: &'a [T],
    running_index: u64,
    next: Option<Box<ChunkSegment<'a, T>>>,
}

impl<'a, T> ChunkSegment<'a, T> {
    /// 当前节点的块视图。
    pub fn memory(&self) -> &'a [T] {
        self.memory
    }

    /// 当前块首元素在整条链中的逻辑偏移。
    pub fn running_index(&self) -> u64 {
        self.running_index
    }

    /// 后继节点；链尾返回 `None`。
    pub fn next(&self) -> Option<&ChunkSegment<'a, T>> {
        self.next.as_deref()
    }

    fn end_index(&self) -> u64 {
        self.running_index + self.memory.len() as u64
    }
}

/// 指向链中某个节点内部偏移的前向位置令牌。
///
/// # 契约说明（What）
/// - `segment == None` 表示位置已越过链尾（由 `try_get(.., advance = true)` 推进到末节点之后产生）；
/// - 令牌只携带借用与偏移，复制代价与一对指针相同；
/// - 比较请使用 [`ChunkSequence::compare`]，它以逻辑偏移为准，不同链之间的比较没有意义。
pub struct SequencePosition<'a, T> {
    segment: Option<&'a ChunkSegment<'a, T>>,
    index: usize,
}

impl<T> Clone for SequencePosition<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SequencePosition<'_, T> {}

impl<T> PartialEq for SequencePosition<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        let same_segment = match (self.segment, other.segment) {
            (Some(a), Some(b)) => ptr::eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_segment && self.index == other.index
    }
}

impl<T> Eq for SequencePosition<'_, T> {}

impl<T> fmt::Debug for SequencePosition<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequencePosition")
            .field("segment_start", &self.segment.map(ChunkSegment::running_index))
            .field("index", &self.index)
            .finish()
    }
}

impl<'a, T> SequencePosition<'a, T> {
    pub(crate) fn new(segment: Option<&'a ChunkSegment<'a, T>>, index: usize) -> Self {
        Self { segment, index }
    }

    /// 位置所在节点；越过链尾时为 `None`。
    pub fn segment(&self) -> Option<&'a ChunkSegment<'a, T>> {
        self.segment
    }

    /// 节点内偏移。
    pub fn index(&self) -> usize {
        self.index
    }
}

/// 由若干独立块组成的一段逻辑连续数据。
///
/// # 设计背景（Why）
/// - 对齐 Tokio `Buf::chunks_vectored`、Netty `CompositeByteBuf` 的思路：数据可能散落在多个块中，
///   但对消费方而言应当表现为一条流；
/// - 采用单向链表而非 `Vec<&[T]>`，是为了让位置令牌只能向前推进，读游标的“后退”成本显式可见。
///
/// # 契约说明（What）
/// - **前置条件**：块在整个链的生命周期内保持只读；
/// - **后置条件**：`len()` 等于全部块长度之和，空块不影响长度与遍历结果。
///
/// # 风险提示（Trade-offs）
/// - 链不缓存总长度，`len()` 需要一次 O(节点数) 遍历；读游标会在首次查询后缓存结果。
pub struct ChunkSequence<'a, T> {
    head: Option<Box<ChunkSegment<'a, T>>>,
}

impl<T> Default for ChunkSequence<'_, T> {
    fn default() -> Self {
        Self { head: None }
    }
}

impl<T> Drop for ChunkSequence<'_, T> {
    fn drop(&mut self) {
        // 逐节点拆链，避免超长链在递归析构时耗尽栈。
        let mut cursor = self.head.take();
        while let Some(mut node) = cursor {
            cursor = node.next.take();
        }
    }
}

impl<T> fmt::Debug for ChunkSequence<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkSequence")
            .field("segments", &self.segment_count())
            .field("len", &self.len())
            .finish()
    }
}

impl<'a, T> ChunkSequence<'a, T> {
    /// 空链。
    pub fn empty() -> Self {
        Self::default()
    }

    /// 按给定顺序借用一组块构建链。
    ///
    /// 适用于 `Vec<T>`、`&[T]`、`bytes::Bytes` 等任何实现了 `AsRef<[T]>` 的块类型。
    ///
    /// ```rust
    /// use spark_cursor::ChunkSequence;
    ///
    /// let chunks = [vec![0u8, 1, 2], vec![], vec![3, 4]];
    /// let sequence = ChunkSequence::from_chunks(&chunks);
    /// assert_eq!(sequence.len(), 5);
    /// assert_eq!(sequence.segment_count(), 3);
    /// ```
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a C>,
        C: AsRef<[T]> + ?Sized + 'a,
    {
        let mut builder = SequenceBuilder::new();
        for chunk in chunks {
            builder.push(chunk.as_ref());
        }
        builder.build()
    }

    /// 首节点。
    pub fn head(&self) -> Option<&ChunkSegment<'a, T>> {
        self.head.as_deref()
    }

    /// 全部块的总长度。
    pub fn len(&self) -> u64 {
        self.last_segment().map_or(0, ChunkSegment::end_index)
    }

    /// 是否不含任何元素（可能仍含若干空块）。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 节点数量（包含空块）。
    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// 链是否至多只有一个节点。
    pub fn is_single_segment(&self) -> bool {
        self.head.as_ref().is_none_or(|head| head.next.is_none())
    }

    /// 首节点的块视图；空链返回空切片。
    pub fn first_span(&self) -> &'a [T] {
        self.head.as_ref().map_or(&[], |head| head.memory)
    }

    /// 链首位置。
    pub fn start(&self) -> SequencePosition<'_, T> {
        SequencePosition::new(self.head.as_deref(), 0)
    }

    /// 链尾位置（末节点的结束偏移）。
    pub fn end(&self) -> SequencePosition<'_, T> {
        match self.last_segment() {
            Some(last) => SequencePosition::new(Some(last), last.memory.len()),
            None => SequencePosition::new(None, 0),
        }
    }

    /// 读取 `position` 处的块剩余部分。
    ///
    /// - `advance == true` 时，`position` 推进到下一个节点的起点（越过末节点后变为 `None` 节点）；
    /// - `position` 已越过链尾时返回 `None`。
    ///
    /// 返回的切片可能为空（空块），调用方需自行跳过。
    pub fn try_get<'s>(
        &'s self,
        position: &mut SequencePosition<'s, T>,
        advance: bool,
    ) -> Option<&'s [T]> {
        let segment = position.segment?;
        let memory = &segment.memory[position.index.min(segment.memory.len())..];
        if advance {
            *position = SequencePosition::new(segment.next.as_deref(), 0);
        }
        Some(memory)
    }

    /// 计算距离链首 `offset` 个元素的位置。
    ///
    /// 落在块边界上的偏移解析为下一个非空块的起点；`offset == len()` 解析为链尾。
    pub fn position_at(&self, offset: u64) -> Result<SequencePosition<'_, T>, CursorError> {
        self.position_from(self.start(), offset)
    }

    /// 从 `origin` 起向前 `offset` 个元素的位置（只能向前）。
    pub fn position_from<'s>(
        &'s self,
        origin: SequencePosition<'s, T>,
        offset: u64,
    ) -> Result<SequencePosition<'s, T>, CursorError> {
        let origin_offset = self.offset_of(origin);
        let total = self.len();
        let available = total - origin_offset.min(total);
        if offset > available {
            return Err(CursorError::OutOfRange {
                requested: offset,
                available,
            });
        }
        let target = origin_offset + offset;
        if target == total {
            return Ok(self.end());
        }

        let mut segment = origin.segment;
        while let Some(current) = segment {
            if target < current.end_index() {
                let index = (target - current.running_index) as usize;
                return Ok(SequencePosition::new(Some(current), index));
            }
            segment = current.next.as_deref();
        }
        Ok(self.end())
    }

    /// 位置相对链首的逻辑偏移；越过链尾的位置返回 `len()`。
    pub fn offset_of(&self, position: SequencePosition<'_, T>) -> u64 {
        match position.segment {
            Some(segment) => segment.running_index + position.index as u64,
            None => self.len(),
        }
    }

    /// 以逻辑偏移比较同一链上的两个位置。
    pub fn compare(&self, a: SequencePosition<'_, T>, b: SequencePosition<'_, T>) -> Ordering {
        self.offset_of(a).cmp(&self.offset_of(b))
    }

    /// 按顺序遍历所有块（包含空块）。
    pub fn chunks(&self) -> Chunks<'_, T> {
        Chunks {
            next: self.head.as_deref(),
        }
    }

    /// 把整条链扁平化为 `Vec`，仅用于测试或跨边界的一次性消费。
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.len() as usize);
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn segments(&self) -> impl Iterator<Item = &ChunkSegment<'a, T>> {
        core::iter::successors(self.head.as_deref(), |segment| segment.next.as_deref())
    }

    fn last_segment(&self) -> Option<&ChunkSegment<'a, T>> {
        self.segments().last()
    }
}

/// [`ChunkSequence::chunks`] 返回的块迭代器。
pub struct Chunks<'s, T> {
    next: Option<&'s ChunkSegment<'s, T>>,
}

impl<'s, T> Iterator for Chunks<'s, T> {
    type Item = &'s [T];

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.next?;
        self.next = segment.next.as_deref();
        Some(segment.memory)
    }
}

/// 只追加的块链构建器。
///
/// 节点在 `build` 时自尾向首链接，因此构建期间无需持有尾指针。
#[derive(Debug)]
pub struct SequenceBuilder<'a, T> {
    chunks: Vec<&'a [T]>,
}

impl<T> Default for SequenceBuilder<'_, T> {
    fn default() -> Self {
        Self { chunks: Vec::new() }
    }
}

impl<'a, T> SequenceBuilder<'a, T> {
    /// 空构建器。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个块。
    pub fn push(&mut self, chunk: &'a [T]) -> &mut Self {
        self.chunks.push(chunk);
        self
    }

    /// 链式追加一个块。
    #[must_use]
    pub fn append(mut self, chunk: &'a [T]) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// 生成不可变的块链。
    pub fn build(self) -> ChunkSequence<'a, T> {
        let mut starts = Vec::with_capacity(self.chunks.len());
        let mut running = 0u64;
        for chunk in &self.chunks {
            starts.push(running);
            running += chunk.len() as u64;
        }

        let mut head: Option<Box<ChunkSegment<'a, T>>> = None;
        for (memory, running_index) in self.chunks.into_iter().zip(starts).rev() {
            head = Some(Box::new(ChunkSegment {
                memory,
                running_index,
                next: head,
            }));
        }
        ChunkSequence { head }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> [Vec<u8>; 4] {
        [vec![0, 1, 2], vec![], vec![3, 4, 5, 6, 7], vec![8, 9]]
    }

    #[test]
    fn running_indexes_include_empty_chunks() {
        let chunks = sample();
        let sequence = ChunkSequence::from_chunks(&chunks);
        let starts: Vec<u64> = sequence.segments().map(ChunkSegment::running_index).collect();
        assert_eq!(starts, vec![0, 3, 3, 8]);
        assert_eq!(sequence.len(), 10);
        assert!(!sequence.is_single_segment());
        assert_eq!(sequence.to_vec(), (0u8..10).collect::<Vec<_>>());
    }

    #[test]
    fn boundary_offsets_resolve_to_next_non_empty_chunk() {
        let chunks = sample();
        let sequence = ChunkSequence::from_chunks(&chunks);
        let position = sequence.position_at(3).expect("偏移 3 位于链内");
        assert_eq!(position.segment().map(ChunkSegment::running_index), Some(3));
        assert_eq!(position.segment().map(|s| s.memory().len()), Some(5));
        assert_eq!(position.index(), 0);
        assert_eq!(sequence.offset_of(position), 3);

        let end = sequence.position_at(10).expect("链尾偏移合法");
        assert_eq!(end, sequence.end());
        assert!(sequence.position_at(11).is_err());
    }

    #[test]
    fn position_from_only_moves_forward() {
        let chunks = sample();
        let sequence = ChunkSequence::from_chunks(&chunks);
        let origin = sequence.position_at(4).expect("偏移 4 合法");
        let target = sequence.position_from(origin, 5).expect("前移 5 合法");
        assert_eq!(sequence.offset_of(target), 9);
        assert_eq!(sequence.compare(origin, target), Ordering::Less);
        assert!(matches!(
            sequence.position_from(target, 2),
            Err(CursorError::OutOfRange {
                requested: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn try_get_walks_every_segment_then_stops() {
        let chunks = sample();
        let sequence = ChunkSequence::from_chunks(&chunks);
        let mut position = sequence.start();
        let mut seen = Vec::new();
        while let Some(memory) = sequence.try_get(&mut position, true) {
            seen.push(memory.len());
        }
        assert_eq!(seen, vec![3, 0, 5, 2]);
        assert!(position.segment().is_none());
        assert_eq!(sequence.offset_of(position), 10);
    }

    #[test]
    fn empty_sequence_has_no_segments() {
        let sequence: ChunkSequence<'_, u8> = ChunkSequence::empty();
        assert_eq!(sequence.len(), 0);
        assert!(sequence.is_single_segment());
        assert!(sequence.first_span().is_empty());
        assert_eq!(sequence.start(), sequence.end());
    }

    #[test]
    fn builder_appends_in_order() {
        let a = [1u16, 2];
        let b = [3u16];
        let sequence = SequenceBuilder::new().append(&a).append(&[]).append(&b).build();
        assert_eq!(sequence.segment_count(), 3);
        assert_eq!(sequence.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn long_chain_drops_without_recursion() {
        let chunk = [7u8];
        let mut builder = SequenceBuilder::new();
        for _ in 0..200_000 {
            builder.push(&chunk);
        }
        let sequence = builder.build();
        assert_eq!(sequence.len(), 200_000);
        drop(sequence);
    }
}
