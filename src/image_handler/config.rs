//! # 配置模块
//!
//! ## 设计思路
//!
//! 将变换链路中“可调策略”与“固定常量”集中管理：
//! - `CodecLimits`：解码阶段的像素/内存上限，防止超大图片拖垮进程
//! - `OutputFormat`：输出格式（传统 PNG / 现代 WebP）及其扩展名、MIME
//! - `ENCODE_QUALITY`：有损编码质量，固定为 0.85，不对用户开放
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的上限配置。
//! - 扩展名白名单在收集阶段使用，未命中的文件直接忽略而不是报错。

use image::ImageFormat;

/// 有损编码质量（0~1）。
///
/// 有意设为常量：插件行为需要在不同设备间保持一致。
pub const ENCODE_QUALITY: f32 = 0.85;

/// 受支持的输入扩展名（小写）。
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// 判断扩展名是否在白名单中（大小写不敏感）。
pub fn is_supported_extension(ext: &str) -> bool {
    let lower = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&lower.as_str())
}

/// 从文件名中取出扩展名并判断是否受支持。
///
/// 没有扩展名的文件一律视为不支持。
pub fn is_supported_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| is_supported_extension(ext))
        .unwrap_or(false)
}

/// 解码阶段的资源上限。
#[derive(Debug, Clone)]
pub struct CodecLimits {
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
        }
    }
}

/// 输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 传统栅格格式（PNG）。
    Png,
    /// 现代栅格格式（WebP）。
    WebP,
}

impl OutputFormat {
    /// 按设置开关选择输出格式。
    pub fn from_webp_flag(do_webp: bool) -> Self {
        if do_webp { Self::WebP } else { Self::Png }
    }

    /// 输出文件扩展名。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}
