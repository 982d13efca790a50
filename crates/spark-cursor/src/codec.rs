//! 显式字节序的定宽整数编解码。
//!
//! # 模块定位（Why）
//! - 协议字段的字节序由线格式决定，与主机字节序无关；这里的辅助函数保证写出的字节只取决于
//!   调用方指定的 [`Endianness`]；
//! - 编解码以自由函数的形式作用于 [`ByteSink`]/[`ByteSource`]，读写游标只需实现这两个能力接口。
//!
//! # 设计要点（How）
//! - 整数与字节之间的转换只在 [`FixedWidth`] 中发生，且该 trait 是封闭的：
//!   仅 `u8/i8/u16/i16/u32/i32/u64/i64` 可以被重新解释为字节；
//! - 字节序与主机不同时，先把主机序字节拷入 8 字节暂存区再整体翻转，主机序字节不会直接写入输出。
//!
//! ```rust
//! use spark_cursor::{PooledAccumulator, GrowableWriter, SegmentedReader, codec};
//!
//! let mut accumulator = PooledAccumulator::<u8>::new();
//! let mut writer = GrowableWriter::<u8, _>::new(&mut accumulator)?;
//! codec::write_u32_be(&mut writer, 0x1234_5678)?;
//! writer.commit()?;
//! drop(writer);
//! assert_eq!(accumulator.written(), &[0x12, 0x34, 0x56, 0x78]);
//!
//! let mut reader = SegmentedReader::new(accumulator.written());
//! assert_eq!(codec::read_u32_be(&mut reader)?, 0x1234_5678);
//! # Ok::<(), spark_cursor::CursorError>(())
//! ```

use crate::{
    error::CursorError, growable::GrowableWriter, reader::SegmentedReader,
    supplier::ChunkSupplier, window::WindowedWriter,
};

/// 支持的最大定宽类型字节数。
pub const MAX_WIDTH: usize = 8;

/// 字节序。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// 小端：最低有效字节在前。
    Little,
    /// 大端（网络序）：最高有效字节在前。
    Big,
}

impl Endianness {
    /// 主机字节序。
    pub const NATIVE: Self = if cfg!(target_endian = "big") {
        Self::Big
    } else {
        Self::Little
    };

    fn differs_from_host(self) -> bool {
        self != Self::NATIVE
    }
}

mod sealed {
    pub trait Sealed {}
}

/// 可以与字节相互转换的定宽整数。
///
/// 该 trait 是封闭的，下游 crate 无法为其他类型实现。
pub trait FixedWidth: sealed::Sealed + Copy {
    /// 编码后的字节数。
    const WIDTH: usize;

    /// 按 `order` 编码到暂存区，前 `WIDTH` 个字节有效。
    fn to_bytes(self, order: Endianness) -> [u8; MAX_WIDTH];

    /// 按 `order` 从恰好 `WIDTH` 个字节解码。
    fn from_bytes(bytes: &[u8], order: Endianness) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl FixedWidth for $ty {
                const WIDTH: usize = core::mem::size_of::<$ty>();

                fn to_bytes(self, order: Endianness) -> [u8; MAX_WIDTH] {
                    let mut scratch = [0u8; MAX_WIDTH];
                    scratch[..Self::WIDTH].copy_from_slice(&self.to_ne_bytes());
                    if order.differs_from_host() {
                        scratch[..Self::WIDTH].reverse();
                    }
                    scratch
                }

                fn from_bytes(bytes: &[u8], order: Endianness) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    if order.differs_from_host() {
                        raw.reverse();
                    }
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_fixed_width!(u8, i8, u16, i16, u32, i32, u64, i64);

/// 字节输出能力。
pub trait ByteSink {
    /// 写入全部 `bytes`。
    ///
    /// 目标一次能容纳 `bytes` 时，失败不得留下部分写入；
    /// 只能分多个窗口写入时（例如供应方给出的窗口短于请求），实现可以不具备原子性。
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError>;

    /// 写入单个字节。
    fn write_byte(&mut self, byte: u8) -> Result<(), CursorError> {
        self.write_bytes(&[byte])
    }
}

/// 字节输入能力。
pub trait ByteSource {
    /// 读取恰好 `destination.len()` 个字节；数据不足时返回错误且不消费任何字节。
    fn read_bytes_exact(&mut self, destination: &mut [u8]) -> Result<(), CursorError>;

    /// 读取单个字节。
    fn read_byte(&mut self) -> Result<u8, CursorError> {
        let mut byte = [0u8; 1];
        self.read_bytes_exact(&mut byte)?;
        Ok(byte[0])
    }
}

impl<W: ByteSink + ?Sized> ByteSink for &mut W {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        (**self).write_bytes(bytes)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), CursorError> {
        (**self).write_byte(byte)
    }
}

impl<R: ByteSource + ?Sized> ByteSource for &mut R {
    fn read_bytes_exact(&mut self, destination: &mut [u8]) -> Result<(), CursorError> {
        (**self).read_bytes_exact(destination)
    }

    fn read_byte(&mut self) -> Result<u8, CursorError> {
        (**self).read_byte()
    }
}

impl ByteSink for WindowedWriter<'_, u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        self.write(bytes)
    }
}

impl<S> ByteSink for GrowableWriter<u8, S>
where
    S: ChunkSupplier<u8>,
{
    /// 先以 `bytes.len()` 为建议长度补充窗口，再一次写入；
    /// 补充失败时已写数据与缓冲状态保持不变。
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        if !bytes.is_empty() {
            self.ensure(bytes.len())?;
        }
        self.write(bytes)
    }
}

impl ByteSource for SegmentedReader<'_, u8> {
    fn read_bytes_exact(&mut self, destination: &mut [u8]) -> Result<(), CursorError> {
        if !self.try_copy_to(destination) {
            return Err(CursorError::OutOfRange {
                requested: destination.len() as u64,
                available: self.remaining(),
            });
        }
        self.advance(destination.len() as u64)
    }

    fn read_byte(&mut self) -> Result<u8, CursorError> {
        self.try_read().ok_or(CursorError::OutOfRange {
            requested: 1,
            available: 0,
        })
    }
}

/// 按 `order` 写入定宽整数。
pub fn write_fixed<V, W>(sink: &mut W, value: V, order: Endianness) -> Result<(), CursorError>
where
    V: FixedWidth,
    W: ByteSink + ?Sized,
{
    let scratch = value.to_bytes(order);
    sink.write_bytes(&scratch[..V::WIDTH])
}

/// 按 `order` 读取定宽整数；数据不足时不消费任何字节。
pub fn read_fixed<V, R>(source: &mut R, order: Endianness) -> Result<V, CursorError>
where
    V: FixedWidth,
    R: ByteSource + ?Sized,
{
    let mut scratch = [0u8; MAX_WIDTH];
    source.read_bytes_exact(&mut scratch[..V::WIDTH])?;
    Ok(V::from_bytes(&scratch[..V::WIDTH], order))
}

/// 写入单字节。
pub fn write_u8<W: ByteSink + ?Sized>(sink: &mut W, value: u8) -> Result<(), CursorError> {
    sink.write_byte(value)
}

/// 以补码写入有符号单字节。
pub fn write_i8<W: ByteSink + ?Sized>(sink: &mut W, value: i8) -> Result<(), CursorError> {
    sink.write_byte(value as u8)
}

/// 读取单字节。
pub fn read_u8<R: ByteSource + ?Sized>(source: &mut R) -> Result<u8, CursorError> {
    source.read_byte()
}

/// 以补码读取有符号单字节。
pub fn read_i8<R: ByteSource + ?Sized>(source: &mut R) -> Result<i8, CursorError> {
    source.read_byte().map(|byte| byte as i8)
}

macro_rules! endian_helpers {
    ($($ty:ty => $write_le:ident, $write_be:ident, $read_le:ident, $read_be:ident;)*) => {
        $(
            #[doc = concat!("以小端写入 `", stringify!($ty), "`。")]
            pub fn $write_le<W: ByteSink + ?Sized>(sink: &mut W, value: $ty) -> Result<(), CursorError> {
                write_fixed(sink, value, Endianness::Little)
            }

            #[doc = concat!("以大端写入 `", stringify!($ty), "`。")]
            pub fn $write_be<W: ByteSink + ?Sized>(sink: &mut W, value: $ty) -> Result<(), CursorError> {
                write_fixed(sink, value, Endianness::Big)
            }

            #[doc = concat!("以小端读取 `", stringify!($ty), "`。")]
            pub fn $read_le<R: ByteSource + ?Sized>(source: &mut R) -> Result<$ty, CursorError> {
                read_fixed(source, Endianness::Little)
            }

            #[doc = concat!("以大端读取 `", stringify!($ty), "`。")]
            pub fn $read_be<R: ByteSource + ?Sized>(source: &mut R) -> Result<$ty, CursorError> {
                read_fixed(source, Endianness::Big)
            }
        )*
    };
}

endian_helpers! {
    u16 => write_u16_le, write_u16_be, read_u16_le, read_u16_be;
    i16 => write_i16_le, write_i16_be, read_i16_le, read_i16_be;
    u32 => write_u32_le, write_u32_be, read_u32_le, read_u32_be;
    i32 => write_i32_le, write_i32_be, read_i32_le, read_i32_be;
    u64 => write_u64_le, write_u64_be, read_u64_le, read_u64_be;
    i64 => write_i64_le, write_i64_be, read_i64_le, read_i64_be;
}
