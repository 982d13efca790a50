//! `writer_contract` 集成测试：验证写游标与累加器在公开 API 下的协作契约。
//!
//! # 测试目标（Why）
//! - `GrowableWriter` 的“先提交再索取”顺序一旦被破坏，累加器扩容时会丢失已写数据；
//! - 池化分配器必须在累加器生命周期结束时收回全部块。
//!
//! # 结构安排（How）
//! - `growth_preserves_every_byte`：多次小写入触发多次扩容后逐字节比对；
//! - `pooled_writer_returns_all_chunks`：共享池统计在写入结束后归零；
//! - `prop_growth_preserves_data`：随机写入模式下的数据保持性质。

use proptest::prelude::*;
use spark_cursor::{
    AccumulatorOptions, ChunkSupplier, CursorError, GrowableWriter, HeapAllocator,
    PooledAccumulator, SlabChunkAllocator, WindowedWriter,
};

/// 以较小的首次分配强制多次扩容，确认写入内容完整保留。
#[test]
fn growth_preserves_every_byte() {
    let options = AccumulatorOptions {
        initial_capacity: None,
        min_first_allocation: 4,
    };
    let mut accumulator = PooledAccumulator::<u8, _>::with_options(HeapAllocator, options)
        .expect("合法配置");
    let mut expected = Vec::new();
    {
        let mut writer = GrowableWriter::<u8, _>::new(&mut accumulator).expect("首个窗口");
        for round in 0u8..50 {
            let piece = [round, round.wrapping_mul(3), round ^ 0x5A];
            writer.write(&piece).expect("写入不会失败");
            expected.extend_from_slice(&piece);
        }
        writer.commit().expect("提交");
        assert_eq!(writer.committed(), 150);
    }
    assert_eq!(accumulator.written(), &expected[..]);
    assert!(accumulator.capacity() >= 150);
}

/// 累加器结束后所有块都回到共享池。
#[test]
fn pooled_writer_returns_all_chunks() {
    let pool = SlabChunkAllocator::<u8>::new();
    {
        let accumulator = PooledAccumulator::<u8, _>::with_allocator(pool.clone());
        let mut writer = GrowableWriter::<u8, _>::new(accumulator).expect("首个窗口");
        writer.write(&[0xEE; 1000]).expect("跨越多次扩容");
        let accumulator = writer.into_inner().expect("提交并取回累加器");
        assert_eq!(accumulator.written_count(), 1000);
        assert_eq!(pool.statistics().active_leases, 1);
    }
    let stats = pool.statistics();
    assert_eq!(stats.active_leases, 0);
    assert_eq!(stats.available_elements, stats.allocated_elements);
}

/// 固定窗口写满后继续写入报告 `Overrun`，已写入内容不受影响。
#[test]
fn windowed_writer_fails_hard_when_full() {
    let mut storage = [0u8; 5];
    let mut writer = WindowedWriter::new(&mut storage);
    writer.write(&[1, 2, 3, 4]).expect("4 字节可以放下");
    assert_eq!(
        writer.write(&[5, 6]),
        Err(CursorError::Overrun {
            requested: 2,
            available: 1
        })
    );
    writer.write(&[5]).expect("最后 1 字节");
    assert_eq!(storage, [1, 2, 3, 4, 5]);
}

/// 就地写入窗口后推进，窗口用尽后由下一次写入触发补充。
#[test]
fn in_place_window_writes_commit_in_order() {
    let mut accumulator = PooledAccumulator::<u8>::with_capacity(2).expect("预留 2");
    {
        let mut writer = GrowableWriter::<u8, _>::new(&mut accumulator).expect("首个窗口");
        assert_eq!(writer.window().len(), 2);
        writer.window().copy_from_slice(&[0xA1, 0xA2]);
        writer.advance(2).expect("推进 2");
        assert!(writer.window().is_empty());
        writer.write(&[0xA3]).expect("触发扩容");
        assert_eq!(writer.committed(), 2);
        assert_eq!(writer.buffered(), 1);
        writer.commit().expect("提交");
    }
    assert_eq!(accumulator.written(), &[0xA1, 0xA2, 0xA3]);
}

/// 直接驱动供应方协议：报告量超过剩余容量被拒绝。
#[test]
fn accumulator_rejects_over_report() {
    let mut accumulator = PooledAccumulator::<u8>::new();
    let window = accumulator.acquire_window(8).expect("首次扩容").len();
    assert!(accumulator.report(window + 1).is_err());
    accumulator.report(window).expect("恰好报告整个窗口");
    assert_eq!(accumulator.free_capacity(), 0);
}

proptest! {
    /// 任意写入切分与首次分配大小下，累加器内容等于全部写入的拼接。
    #[test]
    fn prop_growth_preserves_data(
        pieces in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..40), 0..40),
        first in 1usize..32,
        commit_every in 1usize..5,
    ) {
        let options = AccumulatorOptions { initial_capacity: None, min_first_allocation: first };
        let mut accumulator = PooledAccumulator::<u8, _>::with_options(HeapAllocator, options)
            .expect("合法配置");
        let expected: Vec<u8> = pieces.concat();
        {
            let mut writer = GrowableWriter::<u8, _>::new(&mut accumulator).expect("首个窗口");
            for (index, piece) in pieces.iter().enumerate() {
                writer.write(piece).expect("写入不会失败");
                if index % commit_every == 0 {
                    writer.commit().expect("提交");
                }
            }
            writer.commit().expect("最终提交");
            prop_assert_eq!(writer.committed(), expected.len() as u64);
        }
        prop_assert_eq!(accumulator.written(), &expected[..]);
    }
}
