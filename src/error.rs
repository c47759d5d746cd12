//! Error types for the threshold-watermark-removal crate.

use std::path::PathBuf;

/// Errors that can occur while cleaning an image and writing its outputs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source image is missing or could not be decoded.
    #[error("failed to load {}: {source}", path.display())]
    Load {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying decode or I/O error.
        source: image::ImageError,
    },

    /// An output file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The WebP encoder rejected the raster or its configuration.
    #[error("WebP encoding failed: {0}")]
    Encode(String),

    /// The inpainting step failed.
    #[error("inpainting failed: {0}")]
    Inpaint(String),

    /// The inpainting mask does not have the same dimensions as the image.
    #[error("mask is {}x{} but image is {}x{}", mask.0, mask.1, image.0, image.1)]
    DimensionMismatch {
        /// Image `(width, height)`.
        image: (u32, u32),
        /// Mask `(width, height)`.
        mask: (u32, u32),
    },

    /// A removal parameter is outside its valid range.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// An I/O error occurred while inspecting files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during image encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
