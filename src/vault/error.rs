//! # 持久化错误模型
//!
//! 覆盖读取、创建、覆写、重命名（含链接改写）四类操作。
//! 所有失败对当前条目都是终态：不自动重试，由编排层记录并通知用户。

/// 库内持久化统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("文件不存在: {0}")]
    NotFound(String),

    #[error("目标路径已被占用: {0}")]
    AlreadyExists(String),

    #[error("路径无效: {0}")]
    InvalidPath(String),

    #[error("读写 '{path}' 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("重命名 '{from}' -> '{to}' 失败: {reason}")]
    Rename {
        from: String,
        to: String,
        reason: String,
    },

    /// 文件已移动到新路径，但笔记中的链接未能全部改写。
    #[error("'{from}' 已改名为 '{to}'，但自动更新链接失败: {reason}")]
    Relink {
        from: String,
        to: String,
        reason: String,
    },
}

impl SaveError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
