#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `spark-cursor` 提供面向连续缓冲与分片缓冲的零拷贝读写游标。
//!
//! # 模块定位（Why）
//! - 上层二进制编解码器需要在“单块连续内存”与“多块链式内存”之间使用同一套读写原语，
//!   而不必先把分片数据拷贝成一块；
//! - 本 crate 只关心遍历与编码，不涉及帧格式、应用层 Schema 或 I/O。
//!
//! # 设计概要（How）
//! - [`SegmentedReader`]：跨块前移、回退与推测性拷贝，空块对所有遍历路径透明；
//! - [`WindowedWriter`]：固定窗口写入，越界即失败；
//! - [`GrowableWriter`]：基于 [`ChunkSupplier`] 的“窗口-缓冲-提交”三段式写入；
//! - [`PooledAccumulator`]：默认的块供应方，从 [`ChunkAllocator`] 租借单块并按需几何扩容；
//! - [`codec`]：显式字节序的定宽整数读写，构建在 [`ByteSink`]/[`ByteSource`] 之上。
//!
//! # 并发模型（Trade-offs）
//! - 所有游标都是单一所有者、不可重入的值类型，内部没有锁；
//!   只有 [`SlabChunkAllocator`] 作为共享资源使用 `spin::Mutex` 保护空闲链表。

extern crate alloc;

pub mod accumulator;
pub mod alloc_pool;
pub mod codec;
pub mod error;
pub mod growable;
pub mod reader;
pub mod sequence;
pub mod supplier;
pub mod window;

pub use accumulator::{AccumulatorOptions, PooledAccumulator};
pub use alloc_pool::{ChunkAllocator, HeapAllocator, PoolStats, SlabChunkAllocator};
pub use codec::{ByteSink, ByteSource, Endianness, FixedWidth};
pub use error::{CursorError, CursorErrorKind, codes};
pub use growable::GrowableWriter;
pub use reader::SegmentedReader;
pub use sequence::{ChunkSegment, ChunkSequence, Chunks, SequenceBuilder, SequencePosition};
pub use supplier::ChunkSupplier;
pub use window::WindowedWriter;
