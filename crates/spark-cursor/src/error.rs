//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为读写游标、分片链、分配器与定宽编解码提供唯一的错误域，调用方只需处理一个类型；
//! - 所有错误都是同步、立即、不可重试的编程/契约错误，不存在“瞬时失败”语义。
//!
//! ## 设计要求（What）
//! - 变体使用 `thiserror::Error` 派生，保证与 `std::error::Error` 生态兼容；
//! - 每个变体都映射到 [`codes`] 中的稳定错误码，便于日志聚合与告警规则按码值检索；
//! - 变体携带诊断所需的数值上下文（请求量、可用量），避免调用方再去拼接状态。

use alloc::borrow::Cow;

use thiserror::Error;

/// 游标错误码常量。
///
/// # 契约说明（What）
/// - 遵循 `<领域>.<语义>` 命名约定，与 `CursorError::code` 一一对应；
/// - 码值一经发布即视为稳定接口，新增语义只能追加，不得复用旧码。
pub mod codes {
    /// 读游标前移/回退超出可用数据。
    pub const OUT_OF_RANGE: &str = "cursor.out_of_range";
    /// 写入或推进超出当前窗口/已报告容量。
    pub const OVERRUN: &str = "cursor.overrun";
    /// 外部分配器或块供应方违反契约（例如返回空块）。
    pub const CONTRACT_VIOLATION: &str = "cursor.contract_violation";
    /// 参数非法（零容量、非法配置等）。
    pub const INVALID_ARGUMENT: &str = "cursor.invalid_argument";
}

/// 错误分类，便于调用方在不解构字段的情况下做分支。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorErrorKind {
    /// 见 [`CursorError::OutOfRange`]。
    OutOfRange,
    /// 见 [`CursorError::Overrun`]。
    Overrun,
    /// 见 [`CursorError::ContractViolation`]。
    ContractViolation,
    /// 见 [`CursorError::InvalidArgument`]。
    InvalidArgument,
}

/// 游标层统一错误类型。
///
/// # 教案式说明
/// - **意图 (Why)**：读路径、写路径与分配器在不同位置产生的失败需要合流为同一个错误域，
///   以便上层编解码器直接使用 `?` 传播；
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`，可跨线程传递；
///   - 返回错误时，产生错误的游标状态保持调用前的样子（原子失败）；
/// - **设计权衡 (Trade-offs)**：`ContractViolation` 的描述使用 `Cow<'static, str>`，
///   常见路径零分配，需要拼接上下文时才落到堆上。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    /// 读游标请求前移或回退的元素数超过该方向上可用的数据。
    ///
    /// - **契约 (What)**：`requested` 为请求的元素数，`available` 为该方向上实际可用的元素数；
    ///   读游标的 `Consumed`、当前块与块内偏移保持调用前的值。
    #[error("cursor out of range: requested {requested} elements, only {available} available")]
    OutOfRange {
        /// 请求移动的元素数。
        requested: u64,
        /// 该方向上实际可用的元素数。
        available: u64,
    },

    /// 写游标推进/写入超过当前窗口，或向供应方报告的数量超过其容量。
    #[error("window overrun: requested {requested} elements, only {available} writable")]
    Overrun {
        /// 请求写入或报告的元素数。
        requested: usize,
        /// 当前窗口或剩余容量中可写的元素数。
        available: usize,
    },

    /// 外部协作者违反契约，例如分配器/供应方为非零请求返回了空块。
    ///
    /// - **风险 (Trade-offs)**：该错误表示协作者存在缺陷而非输入数据有误，调用方不应重试。
    #[error("contract violation: {detail}")]
    ContractViolation {
        /// 违约行为的描述。
        detail: Cow<'static, str>,
    },

    /// 需要正数的位置传入了零值，或配置项非法。
    #[error("invalid argument `{argument}`: {detail}")]
    InvalidArgument {
        /// 非法参数或配置项的名称。
        argument: &'static str,
        /// 非法原因。
        detail: Cow<'static, str>,
    },
}

impl CursorError {
    /// 构造 `ContractViolation`。
    pub fn contract_violation(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::ContractViolation {
            detail: detail.into(),
        }
    }

    /// 构造 `InvalidArgument`。
    pub fn invalid_argument(argument: &'static str, detail: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument {
            argument,
            detail: detail.into(),
        }
    }

    /// 返回稳定错误码，见 [`codes`]。
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => codes::OUT_OF_RANGE,
            Self::Overrun { .. } => codes::OVERRUN,
            Self::ContractViolation { .. } => codes::CONTRACT_VIOLATION,
            Self::InvalidArgument { .. } => codes::INVALID_ARGUMENT,
        }
    }

    /// 返回错误分类。
    pub fn kind(&self) -> CursorErrorKind {
        match self {
            Self::OutOfRange { .. } => CursorErrorKind::OutOfRange,
            Self::Overrun { .. } => CursorErrorKind::Overrun,
            Self::ContractViolation { .. } => CursorErrorKind::ContractViolation,
            Self::InvalidArgument { .. } => CursorErrorKind::InvalidArgument,
        }
    }
}

#[cfg(feature = "std")]
impl From<CursorError> for std::io::Error {
    /// 将游标错误桥接到 `std::io`，供基于 `Read`/`Write` 的上层代码复用。
    ///
    /// - 读越界映射为 `UnexpectedEof`，与 `read_exact` 的语义一致；
    /// - 写越界映射为 `WriteZero`，与 `write_all` 在空间耗尽时的语义一致。
    fn from(err: CursorError) -> Self {
        use std::io::ErrorKind;

        let kind = match err.kind() {
            CursorErrorKind::OutOfRange => ErrorKind::UnexpectedEof,
            CursorErrorKind::Overrun => ErrorKind::WriteZero,
            CursorErrorKind::InvalidArgument => ErrorKind::InvalidInput,
            CursorErrorKind::ContractViolation => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
