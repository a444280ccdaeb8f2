//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `PixelBuffer` 表示已解码的 RGBA 像素
//! - `BitmapHandle` 表示调用方移交给 worker 的临时位图资源
//! - `TransformRequest` / `TransformResult` 表示一次变换的请求与产出
//! - `WorkerResponse` 表示跨隔离边界传回的消息形状

use serde::{Deserialize, Serialize};

use super::{CodecLimits, ENCODE_QUALITY, OutputFormat, ProcessingError};
use crate::settings::IlluminatorSettings;

/// 已解码的 RGBA8 像素缓冲（行优先，每像素 4 字节）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// 构建像素缓冲，要求 `data.len() == width * height * 4`。
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ProcessingError> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ProcessingError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if data.len() != expected_len {
            return Err(ProcessingError::Decode(format!(
                "像素数据长度异常：期望 {} 字节，实际 {} 字节",
                expected_len,
                data.len()
            )));
        }

        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA 字节切片。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// 读取单个像素，越界时返回 `None`。
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// 临时位图句柄。
///
/// 由调用方创建并以所有权转移的方式交给 worker。无论 worker 成功、
/// 返回错误还是 panic，句柄都会在调用返回前被关闭且只关闭一次：
/// 正常路径由 worker 显式 `close()`，其余路径由 `Drop` 兜底。
pub struct BitmapHandle {
    pixels: Option<PixelBuffer>,
    on_close: Option<CloseHook>,
    closed: bool,
}

impl BitmapHandle {
    pub fn new(pixels: PixelBuffer) -> Self {
        Self {
            pixels: Some(pixels),
            on_close: None,
            closed: false,
        }
    }

    /// 附带关闭回调的句柄，回调在关闭时恰好触发一次。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use illuminator::image_handler::{BitmapHandle, PixelBuffer};
    ///
    /// let pixels = PixelBuffer::new(1, 1, vec![0, 0, 0, 255])?;
    /// let handle = BitmapHandle::with_close_hook(pixels, || log::debug!("bitmap released"));
    /// # Ok::<(), illuminator::image_handler::ProcessingError>(())
    /// ```
    pub fn with_close_hook<F>(pixels: PixelBuffer, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            pixels: Some(pixels),
            on_close: Some(Box::new(hook)),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixels.as_ref().map(|p| (p.width(), p.height()))
    }

    /// 将位图内容“绘制”到工作画布：取出像素后立即关闭句柄。
    pub(crate) fn draw_and_close(&mut self) -> Result<PixelBuffer, ProcessingError> {
        let pixels = self
            .pixels
            .take()
            .ok_or_else(|| ProcessingError::Context("位图句柄已关闭".to_string()));
        self.close();
        pixels
    }

    /// 释放像素并触发关闭回调；重复调用无副作用。
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pixels = None;
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Drop for BitmapHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BitmapHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapHandle")
            .field("dimensions", &self.dimensions())
            .field("closed", &self.closed)
            .finish()
    }
}

/// 变换输入：原始字节，或调用方已解码的位图句柄。
#[derive(Debug)]
pub enum TransformSource {
    Bytes(Vec<u8>),
    Bitmap(BitmapHandle),
}

/// 一次变换请求，构造后不可变。
#[derive(Debug)]
pub struct TransformRequest {
    pub(crate) source: TransformSource,
    pub(crate) threshold: u8,
    pub(crate) apply_alpha_mask: bool,
    pub(crate) output_format: OutputFormat,
    pub(crate) quality: f32,
    pub(crate) limits: CodecLimits,
}

impl TransformRequest {
    pub fn new(
        source: TransformSource,
        threshold: u8,
        apply_alpha_mask: bool,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            source,
            threshold,
            apply_alpha_mask,
            output_format,
            quality: ENCODE_QUALITY,
            limits: CodecLimits::default(),
        }
    }

    /// 按当前设置构建请求（阈值、透明化开关、WebP 开关）。
    pub fn from_settings(source: TransformSource, settings: &IlluminatorSettings) -> Self {
        Self::new(
            source,
            settings.threshold,
            settings.do_transparency,
            OutputFormat::from_webp_flag(settings.do_webp),
        )
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn apply_alpha_mask(&self) -> bool {
        self.apply_alpha_mask
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }
}

/// 变换产出：编码后的字节与对应扩展名，返回后归调用方独占。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// 跨隔离边界回传的消息。
///
/// 形状固定为 `{ success, blob?, ext?, error? }`，错误以可读字符串携带，
/// 任何异常都不会直接穿越边界。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 错误分类码，见 [`ProcessingError::code`]。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl WorkerResponse {
    pub(crate) fn ok(result: TransformResult) -> Self {
        Self {
            success: true,
            blob: Some(result.bytes),
            ext: Some(result.extension.to_string()),
            error: None,
            error_code: None,
        }
    }

    pub(crate) fn failed(error: &ProcessingError) -> Self {
        Self {
            success: false,
            blob: None,
            ext: None,
            error: Some(error.message().to_string()),
            error_code: Some(error.code().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn pixel_buffer_rejects_mismatched_length() {
        let result = PixelBuffer::new(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(ProcessingError::Decode(_))));

        let buffer = PixelBuffer::new(2, 2, vec![0; 16]).expect("valid buffer");
        assert_eq!(buffer.as_bytes().len(), 16);
        assert_eq!(buffer.pixel(2, 0), None);
    }

    #[test]
    fn bitmap_handle_closes_once_on_explicit_close_and_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        let pixels = PixelBuffer::new(1, 1, vec![1, 2, 3, 4]).expect("valid buffer");

        let mut handle = BitmapHandle::with_close_hook(pixels, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.close();
        handle.close();
        drop(handle);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn draw_and_close_hands_out_pixels_once() {
        let pixels = PixelBuffer::new(1, 1, vec![9, 9, 9, 9]).expect("valid buffer");
        let mut handle = BitmapHandle::new(pixels.clone());

        assert_eq!(handle.draw_and_close().expect("first draw"), pixels);
        assert!(handle.is_closed());
        assert!(matches!(handle.draw_and_close(), Err(ProcessingError::Context(_))));
    }

    #[test]
    fn worker_response_serializes_without_empty_fields() {
        let response = WorkerResponse::failed(&ProcessingError::Decode("bad".to_string()));
        let json = serde_json::to_value(&response).expect("serialize response");

        assert_eq!(json["success"], false);
        assert!(json.get("blob").is_none());
        assert_eq!(json["error"], "bad");
        assert_eq!(json["error_code"], "decode");
    }
}
