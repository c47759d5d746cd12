//! Watermark mask construction.
//!
//! The watermark is a grey overlay on a darker background, so candidate pixels are
//! found by their brightness alone:
//! 1. **Luminance**: unweighted mean of the three channels
//! 2. **Threshold**: keep pixels strictly inside `(low, high)`
//! 3. **Dilation**: grow the marked regions with a square neighbourhood so the
//!    anti-aliased edges of the overlay are covered too

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::error::{Error, Result};

/// Mask value for a pixel that must be repaired.
pub const MARKED: u8 = 255;

/// Per-pixel luminance of an RGB image.
pub type LuminanceMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Unweighted mean of the three channel values.
#[must_use]
pub fn luminance(px: &Rgb<u8>) -> f32 {
    let sum = u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2]);
    f32::from(sum) / 3.0
}

/// Compute the luminance of every pixel.
#[must_use]
pub fn luminance_map(img: &RgbImage) -> LuminanceMap {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        Luma([luminance(img.get_pixel(x, y))])
    })
}

/// Build a binary mask of the pixels whose luminance lies strictly between
/// `low` and `high`.
///
/// Values equal to either bound are excluded. Marked pixels are [`MARKED`],
/// everything else is 0.
#[must_use]
pub fn threshold_mask(luma: &LuminanceMap, low: u8, high: u8) -> GrayImage {
    let (low, high) = (f32::from(low), f32::from(high));
    ImageBuffer::from_fn(luma.width(), luma.height(), |x, y| {
        let value = luma.get_pixel(x, y)[0];
        if value > low && value < high {
            Luma([MARKED])
        } else {
            Luma([0])
        }
    })
}

/// Dilate `mask` with a square `kernel_size` x `kernel_size` neighbourhood,
/// `iterations` times.
///
/// Pixels outside the image never contribute, so regions touching the border
/// grow only inwards.
///
/// # Errors
///
/// Returns [`Error::InvalidOptions`] if `kernel_size` is zero or even.
pub fn dilate_mask(mask: &GrayImage, kernel_size: u8, iterations: u32) -> Result<GrayImage> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(Error::InvalidOptions(format!(
            "kernel size must be odd and non-zero, got {kernel_size}"
        )));
    }

    // Chebyshev radius of the square kernel.
    let reach = kernel_size / 2;
    let mut current = mask.clone();
    for pass in 1..=iterations {
        current = morphology::dilate(&current, Norm::LInf, reach);
        log::debug!("dilation pass {pass}: {} pixels marked", count_marked(&current));
    }
    Ok(current)
}

/// Number of marked (non-zero) pixels in a mask.
#[must_use]
pub fn count_marked(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != 0).count() as u64
}
