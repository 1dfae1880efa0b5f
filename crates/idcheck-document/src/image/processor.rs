// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decodes uploaded card photos and normalises them before
// text recognition. Operates on in-memory images using the `image` and
// `imageproc` crates.

use image::DynamicImage;
use imageproc::contrast::equalize_histogram;
use idcheck_core::error::IdCheckError;
use tracing::{debug, instrument};

/// Longest side, in pixels, handed to the recognizer. Phone photos of a card
/// are routinely 4000px wide; recognition quality does not improve past this.
pub const DEFAULT_MAX_SIDE: u32 = 2000;

/// Processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so calls
/// chain:
///
/// ```ignore
/// let prepared = ImageProcessor::from_bytes(&upload)?
///     .downscale(2000)
///     .grayscale()
///     .equalize()
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, IdCheckError> {
        let img = image::load_from_memory(data).map_err(|err| {
            IdCheckError::ImageError(format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Shrink the image so that neither side exceeds `max_side`, preserving
    /// aspect ratio. Images already within bounds are returned untouched.
    #[instrument(skip(self), fields(max_side))]
    pub fn downscale(self, max_side: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        if w <= max_side && h <= max_side {
            return self;
        }
        let resized = self
            .image
            .resize(max_side, max_side, image::imageops::FilterType::Lanczos3);
        debug!(
            from_w = w,
            from_h = h,
            new_w = resized.width(),
            new_h = resized.height(),
            "Downscaled for recognition"
        );
        Self { image: resized }
    }

    /// Convert to single-channel 8-bit luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Spread the luma histogram over the full range. Lifts faded print on
    /// laminated cards photographed under poor light.
    pub fn equalize(self) -> Self {
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(equalize_histogram(&gray)),
        }
    }

    /// The standard preparation before OCR: bound the size, drop colour and
    /// normalise contrast.
    pub fn prepare_for_recognition(self, max_side: u32) -> Self {
        self.downscale(max_side).grayscale().equalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};

    fn encoded(image: DynamicImage) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_png_bytes() {
        let bytes = encoded(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            20,
            Rgb([10, 20, 30]),
        )));
        let image = ImageProcessor::from_bytes(&bytes).unwrap().into_dynamic();
        assert_eq!((image.width(), image.height()), (40, 20));
    }

    #[test]
    fn garbage_is_an_image_error() {
        let result = ImageProcessor::from_bytes(b"not an image");
        assert!(matches!(result, Err(IdCheckError::ImageError(_))));
    }

    #[test]
    fn downscale_preserves_aspect_ratio() {
        let big = DynamicImage::ImageRgb8(RgbImage::new(400, 100));
        let image = ImageProcessor::from_dynamic(big).downscale(200).into_dynamic();
        assert_eq!((image.width(), image.height()), (200, 50));
    }

    #[test]
    fn downscale_leaves_small_images_alone() {
        let small = DynamicImage::ImageRgb8(RgbImage::new(120, 80));
        let image = ImageProcessor::from_dynamic(small).downscale(200).into_dynamic();
        assert_eq!((image.width(), image.height()), (120, 80));
    }

    #[test]
    fn equalize_stretches_low_contrast() {
        let faded = GrayImage::from_fn(16, 16, |x, _| Luma([if x < 8 { 120 } else { 130 }]));
        let out = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(faded))
            .equalize()
            .into_dynamic()
            .to_luma8();

        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max - min > 10, "range {min}..{max} was not stretched");
    }

    #[test]
    fn prepare_for_recognition_yields_luma() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(3000, 1500, Rgb([200, 10, 10])));
        let prepared = ImageProcessor::from_dynamic(rgb)
            .prepare_for_recognition(DEFAULT_MAX_SIDE)
            .into_dynamic();
        assert!(matches!(prepared, DynamicImage::ImageLuma8(_)));
        assert_eq!(prepared.width(), DEFAULT_MAX_SIDE);
        assert_eq!(prepared.height(), 1000);
    }
}
