//! Telea inpainting constrained to a mask.
//!
//! The fill itself is done by the `inpaint` crate. This wrapper keeps two
//! guarantees the crate does not state:
//! - only marked pixels are copied back, so unmarked pixels stay byte-identical
//! - a mask with no unmarked pixels leaves the image unchanged, since there is
//!   nothing to propagate from

use image::{GrayImage, RgbImage};
use inpaint::prelude::*;

use crate::error::{Error, Result};
use crate::mask;

/// Upper bound on the neighbourhood radius.
const MAX_RADIUS: u32 = 100;

/// Fill the marked (non-zero) pixels of `mask` in-place using Telea's
/// fast-marching method.
///
/// `radius` is the neighbourhood used to estimate each pixel; it is clamped to
/// `1..=100`.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if `mask` and `image` differ in size,
/// and [`Error::Inpaint`] if the fill itself fails.
pub fn telea_inpaint(image: &mut RgbImage, mask: &GrayImage, radius: u32) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch {
            image: image.dimensions(),
            mask: mask.dimensions(),
        });
    }

    let marked = mask::count_marked(mask);
    let total = u64::from(image.width()) * u64::from(image.height());
    if marked == 0 || marked == total {
        log::debug!("inpainting skipped: {marked} of {total} pixels marked");
        return Ok(());
    }

    let radius = radius.clamp(1, MAX_RADIUS);
    let mut filled = image.clone();
    filled
        .telea_inpaint(
            mask,
            radius
                .try_into()
                .map_err(|_| Error::Inpaint(format!("radius {radius} out of range")))?,
        )
        .map_err(|e| Error::Inpaint(format!("{e:?}")))?;

    for ((dst, src), m) in image.pixels_mut().zip(filled.pixels()).zip(mask.pixels()) {
        if m[0] != 0 {
            *dst = *src;
        }
    }
    log::debug!("inpainting: {marked} pixels filled");
    Ok(())
}
