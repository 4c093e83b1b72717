//! Image resize collaborator.
//!
//! The pipeline only needs "load, scale, save to path". The [`ImageProcessor`]
//! trait keeps that seam narrow so the renamer and selector can be exercised
//! with fakes, while [`ImageCrateProcessor`] does the real work via `image`.

use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;

/// Error type for a single resize operation
#[derive(Debug, Error)]
pub enum ResizeError {
    /// Decoding or encoding failed (corrupt or zero-byte source, unwritable target)
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The requested target would have a zero-sized side
    #[error("Cannot scale {width}x{height} image to {target:?}")]
    ZeroDimension {
        width: u32,
        height: u32,
        target: ResizeTarget,
    },
}

/// How the output size derives from the source size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    /// Both sides halved, truncating
    Half,
    /// Fixed height, width scaled by `height / target_height` in floating
    /// point. Halves round away from zero; sources shorter than the target
    /// are upscaled.
    FixedHeight(u32),
}

impl ResizeTarget {
    /// Output dimensions for a `width` x `height` source.
    pub fn dimensions(self, width: u32, height: u32) -> Result<(u32, u32), ResizeError> {
        let (w, h) = match self {
            ResizeTarget::Half => (width / 2, height / 2),
            ResizeTarget::FixedHeight(target_height) => {
                let ratio = height as f64 / target_height as f64;
                let w = if ratio > 0.0 {
                    (width as f64 / ratio).round() as u32
                } else {
                    0
                };
                (w, target_height)
            }
        };

        if w == 0 || h == 0 {
            return Err(ResizeError::ZeroDimension {
                width,
                height,
                target: self,
            });
        }
        Ok((w, h))
    }
}

/// Load an image, scale it and save it to `destination`.
pub trait ImageProcessor: Send + Sync {
    fn resize_and_save(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
    ) -> Result<(), ResizeError>;
}

/// [`ImageProcessor`] backed by the `image` crate. Output format follows the
/// destination extension.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateProcessor {
    filter: FilterType,
}

impl ImageCrateProcessor {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl Default for ImageCrateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProcessor for ImageCrateProcessor {
    fn resize_and_save(
        &self,
        source: &Path,
        destination: &Path,
        target: ResizeTarget,
    ) -> Result<(), ResizeError> {
        let img = image::open(source)?;
        let (width, height) = target.dimensions(img.width(), img.height())?;
        let resized = img.resize_exact(width, height, self.filter);
        resized.save(destination)?;
        Ok(())
    }
}
