// ============================================================
// Layer 4: Image Preprocessor
// ============================================================
// Turns a decoded picture into the ImageTensor the encoder
// consumes:
//
//   1. Resize to the configured size (bilinear / triangle filter)
//   2. Scale 8-bit samples to [0, 1]
//   3. Normalise each channel: (x - mean) / std, mean = std = 0.5
//   4. Lay out channel-major (C × H × W)
//
// Grayscale sources are normalised as one plane and then
// replicated to three channels.

use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};

use crate::domain::image::ImageTensor;

pub const DEFAULT_IMAGE_SIZE: [usize; 2] = [224, 224];
pub const CHANNEL_MEAN: f32 = 0.5;
pub const CHANNEL_STD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// `[height, width]`
    size: [usize; 2],
}

impl ImagePreprocessor {
    pub fn new(size: [usize; 2]) -> Self {
        Self { size }
    }

    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    /// Decode an image file and prepare it.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ImageTensor> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        tracing::debug!("Loaded '{}' ({}x{})", path.display(), img.width(), img.height());
        self.prepare(&img)
    }

    /// Resize, normalise and lay out an already decoded image.
    pub fn prepare(&self, img: &DynamicImage) -> Result<ImageTensor> {
        let [h, w] = self.size;
        let resized = img.resize_exact(w as u32, h as u32, FilterType::Triangle);

        let single_channel = resized.color().channel_count() <= 2;
        let tensor = if single_channel {
            let luma = resized.to_luma8();
            let data = luma.pixels().map(|p| normalize(p.0[0])).collect();
            ImageTensor::new(1, h, w, data)?.to_encoder_channels()?
        } else {
            let rgb = resized.to_rgb8();
            let mut data = vec![0.0f32; 3 * h * w];
            for (x, y, px) in rgb.enumerate_pixels() {
                let offset = y as usize * w + x as usize;
                for c in 0..3 {
                    data[c * h * w + offset] = normalize(px.0[c]);
                }
            }
            ImageTensor::new(3, h, w, data)?
        };
        Ok(tensor)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SIZE)
    }
}

fn normalize(sample: u8) -> f32 {
    (sample as f32 / 255.0 - CHANNEL_MEAN) / CHANNEL_STD
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(255), 1.0);
    }

    #[test]
    fn test_rgb_is_channel_major() {
        let img = RgbImage::from_pixel(4, 4, Rgb([255, 0, 255]));
        let t   = ImagePreprocessor::new([4, 4]).prepare(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(t.shape(), [3, 4, 4]);
        assert!(t.plane(0).unwrap().iter().all(|&v| v == 1.0));
        assert!(t.plane(1).unwrap().iter().all(|&v| v == -1.0));
        assert!(t.plane(2).unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_gray_matches_equivalent_rgb() {
        let gray = GrayImage::from_pixel(6, 5, Luma([128]));
        let rgb  = RgbImage::from_pixel(6, 5, Rgb([128, 128, 128]));
        let pre  = ImagePreprocessor::new([8, 8]);
        let a = pre.prepare(&DynamicImage::ImageLuma8(gray)).unwrap();
        let b = pre.prepare(&DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(a.shape(), [3, 8, 8]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImagePreprocessor::default().load(dir.path().join("nope.png")).is_err());
    }

    #[test]
    fn test_load_png_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("eq.png");
        RgbImage::from_pixel(10, 3, Rgb([0, 0, 0])).save(&path).unwrap();
        let t = ImagePreprocessor::new([16, 32]).load(&path).unwrap();
        assert_eq!(t.shape(), [3, 16, 32]);
    }
}
