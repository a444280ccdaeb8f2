//! # 解码与编码模块（ImageCodec）
//!
//! ## 设计思路
//!
//! 将“字节 → RGBA”与“RGBA → 字节”集中管理，并在解码前增加资源上限控制。
//! 优先做签名与尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 解码：
//! 1. 通过文件签名（magic bytes）识别格式，仅接受 PNG / JPEG / WebP
//! 2. 读取 header 尺寸并按像素/内存上限快速拒绝
//! 3. 完整解码并转换为 RGBA，校验字节长度一致性
//!
//! 编码：
//! 1. 检查当前构建是否具备目标格式的编码器，缺失时明确报错，不降级为其他格式
//! 2. 直接从 RGBA 切片写出，避免额外拷贝

use image::{ExtendedColorType, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

use super::{CodecLimits, OutputFormat, PixelBuffer, ProcessingError};

/// 图片编解码器。
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    limits: CodecLimits,
}

impl ImageCodec {
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    /// 将原始字节解码为 RGBA 像素缓冲。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use illuminator::image_handler::ImageCodec;
    ///
    /// let bytes = std::fs::read("cat.png")?;
    /// let pixels = ImageCodec::default().decode(&bytes)?;
    /// println!("{}x{}", pixels.width(), pixels.height());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, ProcessingError> {
        let format = Self::detect_format(bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(bytes, format)?;
        self.validate_pixel_limits(header_width, header_height)?;
        self.validate_decoded_memory_limits(header_width, header_height)?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ProcessingError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        self.validate_pixel_limits(width, height)?;
        self.validate_decoded_memory_limits(width, height)?;

        let buffer = PixelBuffer::new(width, height, decoded.to_rgba8().into_raw())?;

        log::debug!(
            "图片解码成功 - 格式: {:?} 尺寸: {}x{}",
            format,
            width,
            height
        );

        Ok(buffer)
    }

    /// 将像素缓冲编码为目标格式。
    ///
    /// `quality` 仅对有损编码器生效。PNG 与 `image` 的 WebP 编码器均为无损，
    /// 因此这里只记录该参数而不改变输出。
    pub fn encode(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ProcessingError> {
        let image_format = format.image_format();
        if !image_format.writing_enabled() {
            return Err(ProcessingError::Encode(format!(
                "当前构建不支持输出 {}",
                format.mime_type()
            )));
        }

        let mut cursor = Cursor::new(Vec::new());
        image::write_buffer_with_format(
            &mut cursor,
            buffer.as_bytes(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
            image_format,
        )
        .map_err(|e| ProcessingError::Encode(format!("编码 {} 失败：{}", format.mime_type(), e)))?;

        let bytes = cursor.into_inner();
        log::debug!(
            "图片编码成功 - 格式: {} 质量: {:.2} 输出: {} 字节",
            format.mime_type(),
            quality,
            bytes.len()
        );

        Ok(bytes)
    }

    /// 通过文件签名识别格式，白名单之外一律视为解码错误。
    fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ProcessingError> {
        if bytes.is_empty() {
            return Err(ProcessingError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ProcessingError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ProcessingError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        match kind.mime_type() {
            "image/png" => Ok(ImageFormat::Png),
            "image/jpeg" => Ok(ImageFormat::Jpeg),
            "image/webp" => Ok(ImageFormat::WebP),
            other => Err(ProcessingError::Decode(format!("不支持的图片格式：{}", other))),
        }
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<(u32, u32), ProcessingError> {
        ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| ProcessingError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(&self, width: u32, height: u32) -> Result<(), ProcessingError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ProcessingError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > self.limits.max_decoded_pixels {
            return Err(ProcessingError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.limits.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(&self, width: u32, height: u32) -> Result<(), ProcessingError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ProcessingError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > self.limits.max_decoded_bytes {
            return Err(ProcessingError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                self.limits.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgba};

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn decode_png_produces_rgba_buffer() {
        let codec = ImageCodec::default();
        let buffer = codec.decode(&create_png_bytes(16, 8)).expect("decode should succeed");

        assert_eq!(buffer.width(), 16);
        assert_eq!(buffer.height(), 8);
        assert_eq!(buffer.as_bytes().len(), 16 * 8 * 4);
        assert_eq!(buffer.pixel(3, 2), Some([3, 2, 5, 255]));
    }

    #[test]
    fn decode_rejects_non_image_bytes() {
        let codec = ImageCodec::default();
        let result = codec.decode(b"%PDF-1.7 definitely not a picture");
        assert!(matches!(result, Err(ProcessingError::Decode(_))));

        let empty = codec.decode(&[]);
        assert!(matches!(empty, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn decode_rejects_unsupported_raster_format() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Bmp)
            .expect("failed to encode bmp");

        let result = ImageCodec::default().decode(&cursor.into_inner());
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn decode_rejects_truncated_png() {
        let mut png = create_png_bytes(32, 32);
        png.truncate(png.len() / 2);

        let result = ImageCodec::default().decode(&png);
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn stress_rejects_too_many_pixels() {
        let codec = ImageCodec::new(CodecLimits {
            max_decoded_pixels: 1_000,
            ..CodecLimits::default()
        });

        let result = codec.decode(&create_png_bytes(100, 100));
        assert!(matches!(result, Err(ProcessingError::ResourceLimit(_))));
    }

    #[test]
    fn encode_png_preserves_pixels() {
        let codec = ImageCodec::default();
        let buffer = PixelBuffer::new(2, 1, vec![255, 255, 255, 0, 10, 10, 10, 255])
            .expect("valid buffer");

        let png = codec
            .encode(&buffer, OutputFormat::Png, 0.85)
            .expect("encode should succeed");

        assert_eq!(codec.decode(&png).expect("decode encoded png"), buffer);
    }

    #[test]
    fn encode_webp_produces_webp_signature() {
        let codec = ImageCodec::default();
        let buffer = PixelBuffer::new(2, 2, vec![200; 16]).expect("valid buffer");

        let webp = codec
            .encode(&buffer, OutputFormat::WebP, 0.85)
            .expect("encode should succeed");

        let kind = infer::get(&webp).expect("detectable output");
        assert_eq!(kind.mime_type(), "image/webp");
    }
}
