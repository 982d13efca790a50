//! 固定窗口写游标。
//!
//! 目标容量在写入前即已确定时使用：不扩容、不提交，越界即返回 [`CursorError::Overrun`]。

use crate::error::CursorError;

/// 覆盖调用方提供的单块可写区域的写游标。
///
/// # 契约说明（What）
/// - `window()` 始终是尚未写入的尾部区域，`written() + remaining()` 恒等于区域总长；
/// - `write`/`advance` 超过剩余窗口时原样返回错误，已写入内容与游标位置均不变。
pub struct WindowedWriter<'a, T> {
    buffer: &'a mut [T],
    position: usize,
}

impl<'a, T> WindowedWriter<'a, T> {
    /// 基于调用方持有的区域构建写游标。
    pub fn new(buffer: &'a mut [T]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// 尚可写入的窗口，可就地写入后调用 [`advance`](Self::advance) 确认。
    pub fn window(&mut self) -> &mut [T] {
        &mut self.buffer[self.position..]
    }

    /// 剩余可写元素数。
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// 已写入元素数。
    pub fn written(&self) -> usize {
        self.position
    }

    /// 已写入的前缀。
    pub fn written_slice(&self) -> &[T] {
        &self.buffer[..self.position]
    }

    /// 确认窗口头部 `count` 个元素已写入。
    pub fn advance(&mut self, count: usize) -> Result<(), CursorError> {
        self.check_fits(count)?;
        self.position += count;
        Ok(())
    }

    /// 把 `source` 整体写入窗口。
    pub fn write(&mut self, source: &[T]) -> Result<(), CursorError>
    where
        T: Copy,
    {
        self.check_fits(source.len())?;
        self.buffer[self.position..self.position + source.len()].copy_from_slice(source);
        self.position += source.len();
        Ok(())
    }

    /// 交还底层区域与已写入长度。
    pub fn into_inner(self) -> (&'a mut [T], usize) {
        (self.buffer, self.position)
    }

    fn check_fits(&self, requested: usize) -> Result<(), CursorError> {
        let available = self.remaining();
        if requested > available {
            return Err(CursorError::Overrun {
                requested,
                available,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::io::Write for WindowedWriter<'_, u8> {
    /// 与 [`WindowedWriter::write`] 一致：放不下时整体失败，不做部分写入。
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        WindowedWriter::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_overrun_keeps_state() {
        let mut storage = [0u8; 4];
        let mut writer = WindowedWriter::new(&mut storage);
        writer.write(&[1, 2, 3]).expect("3 字节可以放下");
        assert_eq!(writer.remaining(), 1);

        let err = writer.write(&[4, 5]).expect_err("只剩 1 字节");
        assert_eq!(
            err,
            CursorError::Overrun {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(writer.written_slice(), &[1, 2, 3]);
        assert!(writer.advance(2).is_err());
        assert_eq!(writer.written(), 3);
    }

    #[test]
    fn in_place_write_via_window() {
        let mut storage = [0u16; 3];
        let mut writer = WindowedWriter::new(&mut storage);
        writer.window()[..2].copy_from_slice(&[7, 8]);
        writer.advance(2).expect("推进 2 合法");
        writer.write(&[9]).expect("最后 1 个元素");
        assert_eq!(writer.remaining(), 0);
        let (buffer, written) = writer.into_inner();
        assert_eq!(written, 3);
        assert_eq!(buffer, &[7, 8, 9]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn io_write_fails_without_partial_copy() {
        use std::io::Write;

        let mut storage = [0u8; 2];
        let mut writer = WindowedWriter::new(&mut storage);
        let err = writer.write_all(&[1, 2, 3]).expect_err("3 字节放不下");
        assert_eq!(err.kind(), std::io::ErrorKind::WriteZero);
        assert_eq!(writer.written(), 0);
    }
}
