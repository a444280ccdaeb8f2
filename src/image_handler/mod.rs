//! # 图片变换模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“签名识别 → 解码校验 → 透明化 → 编码 → 隔离执行”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `transform`：逐像素透明化（纯函数，无 I/O）
//! - `pipeline`：解码、资源上限、编码（`ImageCodec`）
//! - `worker`：一次性隔离执行器（`TransformWorker`）
//! - `config/error/source`：配置常量、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! orchestrator（粘贴 / 右键菜单）
//!    ↓ TransformRequest
//! worker.rs（spawn_blocking + oneshot，单请求单响应）
//!    ├─ pipeline.rs（签名识别 + 尺寸限制 + 解码）
//!    ├─ transform.rs（阈值透明化，可选）
//!    └─ pipeline.rs（编码为 PNG / WebP）
//!    ↓ WorkerResponse → TransformResult / ProcessingError
//! ```

mod config;
mod error;
mod pipeline;
mod source;
pub mod transform;
mod worker;

pub use config::{
    CodecLimits, ENCODE_QUALITY, OutputFormat, SUPPORTED_EXTENSIONS, is_supported_extension,
    is_supported_file_name,
};
pub use error::ProcessingError;
pub use pipeline::ImageCodec;
pub use source::{
    BitmapHandle, PixelBuffer, TransformRequest, TransformResult, TransformSource, WorkerResponse,
};
pub use transform::apply_alpha_mask;
pub use worker::TransformWorker;
