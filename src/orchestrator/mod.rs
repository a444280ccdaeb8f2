//! # 编排模块（orchestrator）
//!
//! ## 设计思路
//!
//! 两个入口共享同一条变换链路，只在结果去向上不同：
//! - `paste`：粘贴事件 → 逐个变换 → 新建文件 → 在光标处插入嵌入链接
//! - `context_menu`：选中的已有文件 → 逐个变换 → `FileReconciler` 原地写回
//!
//! ## 实现思路
//!
//! - 同一批次严格按输入顺序逐个处理，前一个（含落盘）完成后才开始下一个。
//! - 单个条目的变换失败在此处被吞掉并记录日志，不影响批次内其余条目。
//! - 编辑器、通知、确认弹窗均为宿主能力，以 trait / 闭包注入。

pub mod context_menu;
pub mod paste;

pub use context_menu::{BatchReport, ContextMenuOrchestrator, FileOutcome, IlluminateOutcome};
pub use paste::{PasteOrchestrator, PastedImage};

use crate::image_handler::{
    CodecLimits, TransformRequest, TransformResult, TransformSource, TransformWorker,
};
use crate::settings::IlluminatorSettings;

/// 用户可见的通知文案。
pub mod messages {
    pub const REPORT_TITLE: &str = "✨ 图片处理完成";
    pub const PROCESSED: &str = "张图片已处理";
    pub const ILLUMINATED: &str = "已处理: ";
    pub const ERROR_PROCESS: &str = "图片处理失败: ";
    pub const ERROR_SAVE: &str = "图片保存失败: ";
    pub const ERROR_UPDATE_LINKS: &str = "自动更新链接失败，请手动检查链接: ";
}

/// 宿主编辑器的最小能力。
pub trait Editor {
    /// 当前活动文档的库内路径。
    fn active_file(&self) -> Option<String>;

    /// 用 `text` 替换当前选区（无选区时在光标处插入）。
    fn replace_selection(&mut self, text: &str);
}

/// 宿主通知能力。
pub trait Notifier {
    fn notice(&self, message: &str);
}

/// 为单个条目创建一次性 worker 并等待结果。
///
/// 失败时记录日志并返回 `Err` 中的可读描述，由调用方决定是否通知用户。
pub(crate) async fn run_transform(
    source: TransformSource,
    settings: &IlluminatorSettings,
    limits: &CodecLimits,
    label: &str,
) -> Result<TransformResult, String> {
    let request = TransformRequest::from_settings(source, settings).with_limits(limits.clone());

    TransformWorker::new(request).run().await.map_err(|err| {
        log::error!("图片变换失败 [{}]: {}", label, err);
        err.to_string()
    })
}
