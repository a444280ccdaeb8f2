//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“解码 → 透明化 → 编码”链路中的所有错误来源，
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，
//! 同时让编排层可按分支匹配。

/// 图片变换链路统一错误类型。
///
/// 该类型会在编排层被记录日志并转换为用户通知，
/// 不会中断批处理中的其余条目。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    /// 输入不是受支持的栅格格式，或内容被截断/损坏。
    #[error("解码错误：{0}")]
    Decode(String),

    /// 当前构建无法产出目标格式。
    #[error("编码错误：{0}")]
    Encode(String),

    /// 隔离执行上下文无法创建或通信中断。
    #[error("执行上下文错误：{0}")]
    Context(String),

    /// 图片尺寸或预计内存超出配置上限。
    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ProcessingError {
    /// 稳定错误码，随 `WorkerResponse` 跨隔离边界传递。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Context(_) => "context",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }

    /// 不含分类前缀的原始描述。
    pub fn message(&self) -> &str {
        match self {
            Self::Decode(msg)
            | Self::Encode(msg)
            | Self::Context(msg)
            | Self::ResourceLimit(msg) => msg,
        }
    }

    /// 由错误码与描述还原错误；未知错误码归为上下文错误。
    pub fn from_code(code: Option<&str>, message: String) -> Self {
        match code {
            Some("decode") => Self::Decode(message),
            Some("encode") => Self::Encode(message),
            Some("resource_limit") => Self::ResourceLimit(message),
            _ => Self::Context(message),
        }
    }
}

impl From<ProcessingError> for String {
    fn from(error: ProcessingError) -> Self {
        error.to_string()
    }
}
