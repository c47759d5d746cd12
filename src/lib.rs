//! Remove grey watermark overlays by luminance thresholding and inpainting.
//!
//! Pixels whose mean channel value falls strictly between 110 and 225 are
//! treated as watermark, the resulting mask is dilated twice with a 5x5 square,
//! and the masked area is filled with Telea's fast-marching inpainting. The
//! cleaned image is written as lossy WebP and as lossless PNG.
//!
//! # Quick Start
//!
//! ```no_run
//! use threshold_watermark_removal::{RemovalOptions, WatermarkRemover};
//!
//! let remover = WatermarkRemover::new(RemovalOptions::default()).expect("valid options");
//! let img = image::open("photo.png").unwrap().to_rgb8();
//! let cleaned = remover.clean(&img).unwrap();
//! println!("{} pixels repaired", cleaned.masked_pixels);
//! cleaned.image.save("cleaned.png").unwrap();
//! ```
//!
//! # Full Run
//!
//! [`WatermarkRemover::run`] performs the whole job on fixed paths and reports
//! each step as a [`Progress`] event.
//!
//! ```no_run
//! use threshold_watermark_removal::{JobPaths, RemovalOptions, WatermarkRemover};
//!
//! let remover = WatermarkRemover::new(RemovalOptions::default()).unwrap();
//! let report = remover.run(&JobPaths::default(), |step| println!("{step:?}")).unwrap();
//! println!("{report}");
//! ```

#![deny(missing_docs)]

mod engine;
pub mod error;
pub mod inpaint;
pub mod mask;
pub mod report;

pub use engine::{
    load_rgb, save_png_optimized, save_webp, Cleaned, JobPaths, Progress, RemovalOptions,
    WatermarkRemover, DEFAULT_INPUT, DEFAULT_LOSSLESS_OUTPUT, DEFAULT_LOSSY_OUTPUT,
};
pub use error::{Error, Result};
pub use report::SizeReport;
