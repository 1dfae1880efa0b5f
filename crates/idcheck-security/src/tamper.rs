// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Photo tamper heuristics: error-level analysis (ELA) and noise uniformity.
//
// ELA re-saves the image as JPEG and looks at how much each pixel moves.
// Regions pasted in from another source recompress differently from the rest
// of the picture. The noise check flags images whose grayscale spread is
// implausibly flat (airbrushed) or implausibly wide (synthetic noise).
//
// Note that `ela_score` is variance over mean of values confined to 0..=255,
// so it can never exceed 255. With the stock threshold of 3000 the ELA flag
// is informational and only the noise check can reject an image; lower
// `TamperConfig::ela_threshold` to make it bite.

use idcheck_core::config::TamperConfig;
use idcheck_core::error::{IdCheckError, Result};
use idcheck_core::types::TamperVerdict;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use tracing::{debug, instrument, warn};

/// Guard against division by zero for perfectly recompressible images.
const ELA_EPSILON: f64 = 1e-5;

/// Decide whether an uploaded photo looks digitally altered.
///
/// Never fails: an image that cannot be analysed (corrupt bytes, unsupported
/// codec) is logged and reported as *not* tampered, so that decoder
/// shortcomings never block a legitimate upload.
pub fn detect_tampering(image_bytes: &[u8], config: &TamperConfig) -> bool {
    match analyze(image_bytes, config) {
        Ok(verdict) => verdict.is_tampered(),
        Err(err) => {
            warn!(error = %err, "tamper analysis failed; treating image as untampered");
            false
        }
    }
}

/// Run both heuristics and return the scores alongside the verdict.
#[instrument(skip_all, fields(bytes_len = image_bytes.len()))]
pub fn analyze(image_bytes: &[u8], config: &TamperConfig) -> Result<TamperVerdict> {
    let original = image::load_from_memory(image_bytes)
        .map_err(|err| IdCheckError::ImageError(format!("failed to decode image: {err}")))?
        .to_rgb8();

    if original.width() == 0 || original.height() == 0 {
        return Err(IdCheckError::ImageError("image has no pixels".into()));
    }

    let recompressed = recompress(&original, config.jpeg_quality)?;
    let ela_score = error_level_score(&original, &recompressed, config.amplification);
    let noise_std_dev = grayscale_std_dev(&original);

    let verdict = TamperVerdict {
        ela_score,
        noise_std_dev,
        ela_suspicious: ela_score > config.ela_threshold,
        uniform_noise: noise_std_dev < config.min_noise_std_dev
            || noise_std_dev > config.max_noise_std_dev,
    };

    debug!(
        ela_score,
        noise_std_dev,
        ela_suspicious = verdict.ela_suspicious,
        uniform_noise = verdict.uniform_noise,
        "tamper analysis complete"
    );
    Ok(verdict)
}

/// Encode `image` as JPEG at `quality` and decode it straight back.
fn recompress(image: &RgbImage, quality: u8) -> Result<RgbImage> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|err| IdCheckError::ImageError(format!("JPEG re-encode failed: {err}")))?;

    let decoded = image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg)
        .map_err(|err| IdCheckError::ImageError(format!("JPEG re-decode failed: {err}")))?;
    Ok(decoded.to_rgb8())
}

/// Variance over mean of the amplified difference image, both averaged
/// across the three channels.
fn error_level_score(original: &RgbImage, recompressed: &RgbImage, amplification: f64) -> f64 {
    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];

    for (a, b) in original.pixels().zip(recompressed.pixels()) {
        for channel in 0..3 {
            let diff = f64::from(a.0[channel].abs_diff(b.0[channel]));
            let level = (diff * amplification).min(255.0).floor();
            sum[channel] += level;
            sum_sq[channel] += level * level;
        }
    }

    let n = f64::from(original.width()) * f64::from(original.height());
    let mut mean_total = 0.0;
    let mut var_total = 0.0;
    for channel in 0..3 {
        let mean = sum[channel] / n;
        mean_total += mean;
        var_total += (sum_sq[channel] / n - mean * mean).max(0.0);
    }

    let mean = mean_total / 3.0;
    let var = var_total / 3.0;
    var / (mean + ELA_EPSILON)
}

/// Population standard deviation of ITU-R 601-2 luma.
fn grayscale_std_dev(image: &RgbImage) -> f64 {
    let mut sum = 0f64;
    let mut sum_sq = 0f64;

    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let luma = (19595 * u32::from(r) + 38470 * u32::from(g) + 7471 * u32::from(b) + 0x8000)
            >> 16;
        let luma = f64::from(luma);
        sum += luma;
        sum_sq += luma * luma;
    }

    let n = f64::from(image.width()) * f64::from(image.height());
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, Rgb};

    fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut out), format)
            .unwrap();
        out
    }

    /// Smooth horizontal grey ramp from 40 to 200.
    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            let v = (40 + x * 160 / (width - 1)) as u8;
            Rgb([v, v, v])
        })
    }

    /// Deterministic per-channel noise in 60..200.
    fn noise(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x9E37_79B9;
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (60 + state % 140) as u8
            };
            Rgb([next(), next(), next()])
        })
    }

    #[test]
    fn fresh_gradient_png_is_not_tampered() {
        let bytes = encode(gradient(64, 64), ImageFormat::Png);
        let verdict = analyze(&bytes, &TamperConfig::default()).unwrap();
        assert!(!verdict.is_tampered(), "{verdict:?}");
        assert!(verdict.noise_std_dev > 5.0 && verdict.noise_std_dev < 80.0);
        assert!(!detect_tampering(&bytes, &TamperConfig::default()));
    }

    #[test]
    fn fresh_gradient_jpeg_is_not_tampered() {
        let bytes = encode(gradient(96, 48), ImageFormat::Jpeg);
        assert!(!detect_tampering(&bytes, &TamperConfig::default()));
    }

    #[test]
    fn flat_image_is_flagged_as_over_smoothed() {
        let flat = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        let verdict = analyze(&encode(flat, ImageFormat::Png), &TamperConfig::default()).unwrap();
        assert!(verdict.uniform_noise);
        assert!(verdict.noise_std_dev < 1e-9);
        assert!(verdict.is_tampered());
    }

    #[test]
    fn checkerboard_is_flagged_as_over_noisy() {
        let board = RgbImage::from_fn(32, 32, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let bytes = encode(board, ImageFormat::Png);
        let verdict = analyze(&bytes, &TamperConfig::default()).unwrap();
        assert!(verdict.noise_std_dev > 80.0);
        assert!(detect_tampering(&bytes, &TamperConfig::default()));
    }

    #[test]
    fn recompressed_noise_trips_lowered_ela_threshold() {
        let bytes = encode(noise(64, 64), ImageFormat::Png);

        let stock = analyze(&bytes, &TamperConfig::default()).unwrap();
        assert!(!stock.uniform_noise, "{stock:?}");
        assert!(!stock.ela_suspicious);
        assert!(stock.ela_score <= 255.0 + 1e-6);

        let strict = TamperConfig {
            ela_threshold: 5.0,
            ..TamperConfig::default()
        };
        let verdict = analyze(&bytes, &strict).unwrap();
        assert!(verdict.ela_suspicious, "{verdict:?}");
        assert!(detect_tampering(&bytes, &strict));
    }

    #[test]
    fn corrupt_bytes_fail_open() {
        let garbage = b"\xff\xd8\xff\xe0 definitely not a jpeg";
        assert!(analyze(garbage, &TamperConfig::default()).is_err());
        assert!(!detect_tampering(garbage, &TamperConfig::default()));
        assert!(!detect_tampering(&[], &TamperConfig::default()));
    }
}
