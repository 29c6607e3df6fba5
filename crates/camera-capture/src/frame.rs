//! Video frame types and processing

use image::GrayImage;
use std::time::Duration;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp relative to stream start (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Uniform frame, handy for tests and synthetic sources
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], timestamp_ns: u64, sequence: u32) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(data, width, height, timestamp_ns, sequence)
    }

    /// Capture timestamp as a monotonic duration since stream start
    pub fn timestamp(&self) -> Duration {
        Duration::from_nanos(self.timestamp_ns)
    }

    /// Luma (BT.601 weights), one byte per pixel
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|px| (px[0] as f32 * 0.299 + px[1] as f32 * 0.587 + px[2] as f32 * 0.114) as u8)
            .collect()
    }

    /// Grayscale copy as an `image` buffer
    pub fn to_gray_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.to_grayscale())
    }

    /// Mirror the frame left-to-right in place (selfie view)
    pub fn flip_horizontal(&mut self) {
        let row_len = (self.width * 3) as usize;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let (mut left, mut right) = (0usize, self.width as usize - 1);
            while left < right {
                for c in 0..3 {
                    row.swap(left * 3 + c, right * 3 + c);
                }
                left += 1;
                right -= 1;
            }
        }
    }
}

/// Convert packed YUYV (4:2:2) to RGB24
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for chunk in yuyv.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        VideoFrame::new(data, width, height, 0, 0)
    }

    #[test]
    fn test_flip_horizontal() {
        let mut frame = gradient(5, 2);
        frame.flip_horizontal();
        assert_eq!(&frame.data[0..3], &[4, 0, 0]);
        // Second row, last pixel
        assert_eq!(&frame.data[27..30], &[0, 1, 0]);
        // Middle column stays put
        assert_eq!(&frame.data[21..24], &[2, 1, 0]);
    }

    #[test]
    fn test_grayscale() {
        let frame = VideoFrame::filled(4, 4, [255, 255, 255], 0, 0);
        let gray = frame.to_gray_image().unwrap();
        assert_eq!(gray.dimensions(), (4, 4));
        assert!(gray.pixels().all(|p| p.0[0] >= 254));
    }

    #[test]
    fn test_yuyv_neutral_chroma() {
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1);
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_timestamp() {
        let frame = VideoFrame::filled(1, 1, [0, 0, 0], 1_500_000_000, 3);
        assert_eq!(frame.timestamp(), Duration::from_millis(1500));
    }

    proptest! {
        #[test]
        fn prop_flip_twice_is_identity(
            width in 1u32..16,
            height in 1u32..8,
            seed in any::<u8>(),
        ) {
            let data: Vec<u8> = (0..width * height * 3)
                .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
                .collect();
            let original = VideoFrame::new(data, width, height, 0, 0);
            let mut frame = original.clone();
            frame.flip_horizontal();
            frame.flip_horizontal();
            prop_assert_eq!(frame.data, original.data);
        }

        #[test]
        fn prop_yuyv_output_is_rgb24(pairs in 1u32..64, height in 1u32..4) {
            let width = pairs * 2;
            let yuyv = vec![128u8; (width * height * 2) as usize];
            prop_assert_eq!(
                yuyv_to_rgb(&yuyv, width, height).len(),
                (width * height * 3) as usize
            );
        }
    }
}
