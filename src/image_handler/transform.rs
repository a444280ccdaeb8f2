//! # 像素变换模块
//!
//! 纯函数：按逐通道阈值把近白/近灰背景设为透明，不做任何 I/O。
//!
//! 判定条件为 R、G、B 三个通道**各自严格大于**阈值，而不是平均亮度。
//! 彩色但明亮的像素（如 (250, 250, 100)）因此不会被移除，这是可观测行为，
//! 不要替换为亮度公式。

use super::PixelBuffer;

/// 对满足 `R > t && G > t && B > t` 的像素将 alpha 置 0，其余字节保持不变。
///
/// - 单遍、逐像素、与顺序无关，不采样邻域
/// - `threshold = 255` 时不会屏蔽任何像素
/// - 同一阈值重复调用结果不变
pub fn apply_alpha_mask(buffer: &mut PixelBuffer, threshold: u8) {
    for px in buffer.as_bytes_mut().chunks_exact_mut(4) {
        if px[0] > threshold && px[1] > threshold && px[2] > threshold {
            px[3] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn buffer_from(pixels: &[[u8; 4]]) -> PixelBuffer {
        let data = pixels.iter().flatten().copied().collect::<Vec<_>>();
        PixelBuffer::new(pixels.len() as u32, 1, data).expect("valid buffer")
    }

    #[test]
    fn masks_white_and_keeps_dark() {
        let mut buffer = buffer_from(&[[255, 255, 255, 255], [10, 10, 10, 255]]);
        apply_alpha_mask(&mut buffer, 235);

        assert_eq!(buffer.pixel(0, 0), Some([255, 255, 255, 0]));
        assert_eq!(buffer.pixel(1, 0), Some([10, 10, 10, 255]));
    }

    #[test]
    fn bright_colored_pixel_is_not_masked() {
        let mut buffer = buffer_from(&[[250, 250, 100, 255]]);
        apply_alpha_mask(&mut buffer, 235);
        assert_eq!(buffer.pixel(0, 0), Some([250, 250, 100, 255]));
    }

    #[test]
    fn comparison_is_strict() {
        let mut buffer = buffer_from(&[[235, 236, 236, 200], [236, 236, 236, 200]]);
        apply_alpha_mask(&mut buffer, 235);

        assert_eq!(buffer.pixel(0, 0), Some([235, 236, 236, 200]));
        assert_eq!(buffer.pixel(1, 0), Some([236, 236, 236, 0]));
    }

    #[test]
    fn threshold_extremes() {
        let mut buffer = buffer_from(&[[255, 255, 255, 255], [1, 1, 1, 255], [0, 5, 5, 255]]);
        let untouched = buffer.clone();

        apply_alpha_mask(&mut buffer, 255);
        assert_eq!(buffer, untouched);

        apply_alpha_mask(&mut buffer, 0);
        assert_eq!(buffer.pixel(0, 0), Some([255, 255, 255, 0]));
        assert_eq!(buffer.pixel(1, 0), Some([1, 1, 1, 0]));
        assert_eq!(buffer.pixel(2, 0), Some([0, 5, 5, 255]));
    }

    proptest! {
        #[test]
        fn only_alpha_of_qualifying_pixels_changes(
            pixels in prop::collection::vec(any::<[u8; 4]>(), 1..64),
            threshold in any::<u8>(),
        ) {
            let original = buffer_from(&pixels);
            let mut masked = original.clone();
            apply_alpha_mask(&mut masked, threshold);

            for (before, after) in original
                .as_bytes()
                .chunks_exact(4)
                .zip(masked.as_bytes().chunks_exact(4))
            {
                prop_assert_eq!(&before[..3], &after[..3]);
                let qualifies = before[0] > threshold && before[1] > threshold && before[2] > threshold;
                let expected_alpha = if qualifies { 0 } else { before[3] };
                prop_assert_eq!(after[3], expected_alpha);
            }
        }

        #[test]
        fn masking_is_idempotent(
            pixels in prop::collection::vec(any::<[u8; 4]>(), 1..64),
            threshold in any::<u8>(),
        ) {
            let mut once = buffer_from(&pixels);
            apply_alpha_mask(&mut once, threshold);
            let mut twice = once.clone();
            apply_alpha_mask(&mut twice, threshold);
            prop_assert_eq!(once, twice);
        }
    }
}
