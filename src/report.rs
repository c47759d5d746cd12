//! File-size report for a finished run.

use std::fmt;
use std::fs;

use crate::engine::JobPaths;
use crate::error::Result;

/// On-disk sizes of the source image and both outputs, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    /// Source image.
    pub original: u64,
    /// Lossy WebP output.
    pub lossy: u64,
    /// Lossless PNG output.
    pub lossless: u64,
}

impl SizeReport {
    /// Read the sizes of the three files named by `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if any file cannot be inspected.
    pub fn from_paths(paths: &JobPaths) -> Result<Self> {
        Ok(Self {
            original: fs::metadata(&paths.input)?.len(),
            lossy: fs::metadata(&paths.lossy_output)?.len(),
            lossless: fs::metadata(&paths.lossless_output)?.len(),
        })
    }

    /// Size reduction of the lossy output relative to the original, in percent.
    ///
    /// Negative when the output is larger. Returns 0 for an empty original.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_percent(&self) -> f64 {
        if self.original == 0 {
            return 0.0;
        }
        (1.0 - self.lossy as f64 / self.original as f64) * 100.0
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File sizes:")?;
        size_row(f, "Original PNG:", self.original)?;
        size_row(f, "WebP:", self.lossy)?;
        size_row(f, "Clean PNG:", self.lossless)?;
        write!(f, "  {:<14}{:.1}%", "Reduction:", self.reduction_percent())
    }
}

#[allow(clippy::cast_precision_loss)]
fn size_row(f: &mut fmt::Formatter<'_>, label: &str, bytes: u64) -> fmt::Result {
    writeln!(
        f,
        "  {label:<14}{} bytes ({:.1} KB)",
        group_thousands(bytes),
        bytes as f64 / 1024.0
    )
}

/// Format `n` with a comma between each group of three digits.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
