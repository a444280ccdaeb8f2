//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义 crate 级统一的 `AppError` 枚举，汇总变换链路、落盘与设置三类错误，
//! 替代各处分散的 `.map_err(|e| e.to_string())` 等不一致模式。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ProcessingError` / `SaveError` / `io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于宿主侧展示。

use serde::Serialize;

use crate::image_handler::ProcessingError;
use crate::vault::SaveError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片变换链路错误（解码 / 编码 / 执行上下文）
    #[error("{0}")]
    Processing(#[from] ProcessingError),

    /// 落盘或重命名失败
    #[error("{0}")]
    Save(#[from] SaveError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置读取或保存失败
    #[error("设置错误: {0}")]
    Settings(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
