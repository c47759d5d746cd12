//! Core watermark removal pipeline.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageError, RgbImage};

use crate::error::{Error, Result};
use crate::inpaint;
use crate::mask;
use crate::report::SizeReport;

/// Source image read by [`JobPaths::default()`].
pub const DEFAULT_INPUT: &str = "workers/assets/glass_tiled.png";
/// Lossy output written by [`JobPaths::default()`].
pub const DEFAULT_LOSSY_OUTPUT: &str = "workers/assets/glass_tiled.webp";
/// Lossless output written by [`JobPaths::default()`].
pub const DEFAULT_LOSSLESS_OUTPUT: &str = "workers/assets/glass_tiled_clean.png";

/// Highest WebP encoder effort level.
const MAX_WEBP_METHOD: u8 = 6;

/// Parameters of the removal pipeline.
///
/// The defaults are tuned for one image: a grey star overlay on a dark tiled
/// background. They are not derived from the input and may need re-tuning for
/// anything else.
#[derive(Debug, Clone)]
pub struct RemovalOptions {
    /// Exclusive lower luminance bound of watermark pixels.
    pub luminance_low: u8,
    /// Exclusive upper luminance bound of watermark pixels.
    pub luminance_high: u8,
    /// Side length of the square dilation neighbourhood (odd).
    pub kernel_size: u8,
    /// Number of dilation passes.
    pub dilate_iterations: u32,
    /// Neighbourhood radius used by the inpainting step, in pixels.
    pub inpaint_radius: u32,
    /// Lossy WebP quality (0-100).
    pub webp_quality: f32,
    /// WebP encoder effort (0 = fastest, 6 = smallest output).
    pub webp_method: u8,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            luminance_low: 110,
            luminance_high: 225,
            kernel_size: 5,
            dilate_iterations: 2,
            inpaint_radius: 5,
            webp_quality: 90.0,
            webp_method: MAX_WEBP_METHOD,
        }
    }
}

impl RemovalOptions {
    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] describing the first bad parameter.
    pub fn validate(&self) -> Result<()> {
        if self.luminance_low >= self.luminance_high {
            return Err(Error::InvalidOptions(format!(
                "luminance range ({}, {}) is empty",
                self.luminance_low, self.luminance_high
            )));
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(Error::InvalidOptions(format!(
                "kernel size must be odd and non-zero, got {}",
                self.kernel_size
            )));
        }
        if self.inpaint_radius == 0 {
            return Err(Error::InvalidOptions(
                "inpaint radius must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.webp_quality) {
            return Err(Error::InvalidOptions(format!(
                "WebP quality must be between 0 and 100, got {}",
                self.webp_quality
            )));
        }
        if self.webp_method > MAX_WEBP_METHOD {
            return Err(Error::InvalidOptions(format!(
                "WebP method must be between 0 and {MAX_WEBP_METHOD}, got {}",
                self.webp_method
            )));
        }
        Ok(())
    }
}

/// Locations of the source image and the two outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    /// Image to clean.
    pub input: PathBuf,
    /// Lossy WebP output.
    pub lossy_output: PathBuf,
    /// Lossless PNG output.
    pub lossless_output: PathBuf,
}

impl Default for JobPaths {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            lossy_output: PathBuf::from(DEFAULT_LOSSY_OUTPUT),
            lossless_output: PathBuf::from(DEFAULT_LOSSLESS_OUTPUT),
        }
    }
}

impl JobPaths {
    /// The default file names, placed in `dir` instead of `workers/assets`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        let name = |p: &str| dir.join(Path::new(p).file_name().unwrap_or_default());
        Self {
            input: name(DEFAULT_INPUT),
            lossy_output: name(DEFAULT_LOSSY_OUTPUT),
            lossless_output: name(DEFAULT_LOSSLESS_OUTPUT),
        }
    }
}

/// A step completed by [`WatermarkRemover::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<'a> {
    /// About to read the source image.
    Loading,
    /// Source image decoded.
    Loaded {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Mask thresholded and dilated.
    MaskCreated {
        /// Number of pixels that will be inpainted.
        pixels: u64,
    },
    /// Masked pixels filled.
    Inpainted,
    /// Lossy output written.
    SavedLossy {
        /// Destination path.
        path: &'a Path,
    },
    /// Lossless output written.
    SavedLossless {
        /// Destination path.
        path: &'a Path,
    },
}

/// Output of [`WatermarkRemover::clean`].
#[derive(Debug, Clone)]
pub struct Cleaned {
    /// Repaired image, same dimensions as the source.
    pub image: RgbImage,
    /// Dilated mask the repair was constrained to.
    pub mask: GrayImage,
    /// Marked pixels after thresholding, before dilation.
    pub thresholded_pixels: u64,
    /// Marked pixels after dilation.
    pub masked_pixels: u64,
}

/// Threshold-and-inpaint watermark remover.
#[derive(Debug, Clone)]
pub struct WatermarkRemover {
    opts: RemovalOptions,
}

impl WatermarkRemover {
    /// Create a remover after validating `opts`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] if any parameter is out of range.
    pub fn new(opts: RemovalOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self { opts })
    }

    /// Parameters in use.
    #[must_use]
    pub fn options(&self) -> &RemovalOptions {
        &self.opts
    }

    /// Mark the pixels whose luminance lies strictly inside the configured range.
    #[must_use]
    pub fn build_mask(&self, image: &RgbImage) -> GrayImage {
        let luma = mask::luminance_map(image);
        mask::threshold_mask(&luma, self.opts.luminance_low, self.opts.luminance_high)
    }

    /// Dilate a thresholded mask so the edges of marked regions are covered.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::InvalidOptions`] from [`mask::dilate_mask`].
    pub fn expand_mask(&self, thresholded: &GrayImage) -> Result<GrayImage> {
        mask::dilate_mask(
            thresholded,
            self.opts.kernel_size,
            self.opts.dilate_iterations,
        )
    }

    /// Inpaint a copy of `source` inside `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `mask` does not match `source`
    /// and [`Error::Inpaint`] if the fill fails.
    pub fn repair(&self, source: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        let mut repaired = source.clone();
        inpaint::telea_inpaint(&mut repaired, mask, self.opts.inpaint_radius)?;
        Ok(repaired)
    }

    /// Run the in-memory part of the pipeline: threshold, dilate, inpaint.
    ///
    /// # Errors
    ///
    /// See [`WatermarkRemover::expand_mask`] and [`WatermarkRemover::repair`].
    pub fn clean(&self, source: &RgbImage) -> Result<Cleaned> {
        let thresholded = self.build_mask(source);
        let thresholded_pixels = mask::count_marked(&thresholded);
        let mask = self.expand_mask(&thresholded)?;
        let masked_pixels = mask::count_marked(&mask);
        log::debug!("mask: {thresholded_pixels} thresholded, {masked_pixels} after dilation");

        let image = self.repair(source, &mask)?;
        Ok(Cleaned {
            image,
            mask,
            thresholded_pixels,
            masked_pixels,
        })
    }

    /// Load `paths.input`, clean it, write both outputs and report file sizes.
    ///
    /// `on_progress` is called after each step in pipeline order. Any failure
    /// aborts the run; an output written before the failure is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the input cannot be read, [`Error::Write`],
    /// [`Error::Encode`] or [`Error::Image`] if an output cannot be written, and
    /// [`Error::Io`] if the file sizes cannot be read back.
    pub fn run<F>(&self, paths: &JobPaths, mut on_progress: F) -> Result<SizeReport>
    where
        F: FnMut(Progress<'_>),
    {
        on_progress(Progress::Loading);
        let source = load_rgb(&paths.input)?;
        on_progress(Progress::Loaded {
            width: source.width(),
            height: source.height(),
        });

        let mask = self.expand_mask(&self.build_mask(&source))?;
        on_progress(Progress::MaskCreated {
            pixels: mask::count_marked(&mask),
        });

        let repaired = self.repair(&source, &mask)?;
        drop(mask);
        drop(source);
        on_progress(Progress::Inpainted);

        save_webp(
            &repaired,
            &paths.lossy_output,
            self.opts.webp_quality,
            self.opts.webp_method,
        )?;
        on_progress(Progress::SavedLossy {
            path: &paths.lossy_output,
        });

        save_png_optimized(&repaired, &paths.lossless_output)?;
        on_progress(Progress::SavedLossless {
            path: &paths.lossless_output,
        });

        SizeReport::from_paths(paths)
    }
}

/// Load an image and convert it to 8-bit RGB.
///
/// # Errors
///
/// Returns [`Error::Load`] if the file is missing or cannot be decoded.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| Error::Load {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {} ({:?})", path.display(), img.color());
    Ok(img.to_rgb8())
}

/// Encode an RGB image as lossy WebP and write it to `path`, replacing any
/// existing file.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the encoder fails and [`Error::Write`] if the
/// file cannot be written.
pub fn save_webp(img: &RgbImage, path: &Path, quality: f32, method: u8) -> Result<()> {
    let mut config = webp::WebPConfig::new()
        .map_err(|()| Error::Encode("failed to initialise encoder config".to_string()))?;
    config.lossless = 0;
    config.quality = quality;
    config.method = i32::from(method);

    let encoded = webp::Encoder::from_rgb(img.as_raw(), img.width(), img.height())
        .encode_advanced(&config)
        .map_err(|e| Error::Encode(format!("{e:?}")))?;

    std::fs::write(path, &*encoded).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("wrote {} ({} bytes)", path.display(), encoded.len());
    Ok(())
}

/// Write an RGB image as PNG with maximum compression, replacing any existing
/// file.
///
/// # Errors
///
/// Returns [`Error::Write`] if the file cannot be created, written or flushed,
/// and [`Error::Image`] if encoding fails for any other reason.
pub fn save_png_optimized(img: &RgbImage, path: &Path) -> Result<()> {
    let write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);

    let encoder = PngEncoder::new_with_quality(
        &mut writer,
        CompressionType::Best,
        FilterType::Adaptive,
    );
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| match e {
            ImageError::IoError(source) => write_error(source),
            other => Error::Image(other),
        })?;

    // Dropping a BufWriter discards the final flush error.
    writer.flush().map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn default_options_match_tuned_constants() {
        let opts = RemovalOptions::default();
        assert_eq!(opts.luminance_low, 110);
        assert_eq!(opts.luminance_high, 225);
        assert_eq!(opts.kernel_size, 5);
        assert_eq!(opts.dilate_iterations, 2);
        assert_eq!(opts.inpaint_radius, 5);
        assert!((opts.webp_quality - 90.0).abs() < f32::EPSILON);
        assert_eq!(opts.webp_method, 6);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_options() {
        let bad = [
            RemovalOptions {
                luminance_low: 200,
                luminance_high: 100,
                ..RemovalOptions::default()
            },
            RemovalOptions {
                kernel_size: 4,
                ..RemovalOptions::default()
            },
            RemovalOptions {
                inpaint_radius: 0,
                ..RemovalOptions::default()
            },
            RemovalOptions {
                webp_quality: 101.0,
                ..RemovalOptions::default()
            },
            RemovalOptions {
                webp_quality: f32::NAN,
                ..RemovalOptions::default()
            },
            RemovalOptions {
                webp_method: 7,
                ..RemovalOptions::default()
            },
        ];
        for opts in bad {
            assert!(
                matches!(WatermarkRemover::new(opts.clone()), Err(Error::InvalidOptions(_))),
                "{opts:?} should be rejected"
            );
        }
    }

    #[test]
    fn default_paths_point_at_assets() {
        let paths = JobPaths::default();
        assert_eq!(paths.input, PathBuf::from("workers/assets/glass_tiled.png"));
        assert_eq!(
            paths.lossy_output,
            PathBuf::from("workers/assets/glass_tiled.webp")
        );
        assert_eq!(
            paths.lossless_output,
            PathBuf::from("workers/assets/glass_tiled_clean.png")
        );
    }

    #[test]
    fn in_dir_keeps_file_names() {
        let paths = JobPaths::in_dir(Path::new("/tmp/job"));
        assert_eq!(paths.input, PathBuf::from("/tmp/job/glass_tiled.png"));
        assert_eq!(paths.lossy_output, PathBuf::from("/tmp/job/glass_tiled.webp"));
        assert_eq!(
            paths.lossless_output,
            PathBuf::from("/tmp/job/glass_tiled_clean.png")
        );
    }

    #[test]
    fn clean_repairs_grey_star_on_dark_background() {
        let mut img = RgbImage::from_pixel(40, 40, Rgb([20, 25, 30]));
        for x in 18..22 {
            for y in 18..22 {
                img.put_pixel(x, y, Rgb([160, 160, 160]));
            }
        }

        let remover = WatermarkRemover::new(RemovalOptions::default()).unwrap();
        let cleaned = remover.clean(&img).unwrap();

        assert_eq!(cleaned.thresholded_pixels, 16);
        // 4x4 block grown by 4 pixels on every side.
        assert_eq!(cleaned.masked_pixels, 12 * 12);
        for px in cleaned.image.pixels() {
            for (ch, expected) in [20u8, 25, 30].into_iter().enumerate() {
                assert!(px[ch].abs_diff(expected) <= 2, "{px:?}");
            }
        }
    }

    #[test]
    fn png_into_missing_directory_is_write_error() {
        let img = RgbImage::new(8, 8);
        let err = save_png_optimized(&img, Path::new("/nonexistent/dir/clean.png")).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert!(err.to_string().contains("clean.png"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn png_on_full_disk_is_write_error() {
        let img = RgbImage::from_pixel(32, 32, Rgb([12, 34, 56]));
        let err = save_png_optimized(&img, Path::new("/dev/full")).unwrap_err();
        match err {
            Error::Write { path, .. } => assert_eq!(path, PathBuf::from("/dev/full")),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn webp_on_full_disk_is_write_error() {
        let img = RgbImage::from_pixel(32, 32, Rgb([12, 34, 56]));
        let err = save_webp(&img, Path::new("/dev/full"), 90.0, 6).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[test]
    fn load_missing_file_is_load_error() {
        let err = load_rgb(Path::new("/nonexistent/glass_tiled.png")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
        assert!(err.to_string().contains("glass_tiled.png"));
    }
}
