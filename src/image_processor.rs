//! # Image Processing Module
//!
//! Questo modulo normalizza le copertine dei video prima di incorporarle
//! nel file audio.
//!
//! ## Pipeline di normalizzazione
//!
//! 1. **Decodifica**: formato rilevato dai magic bytes (WebP, JPEG, PNG)
//! 2. **Crop centrale + resize**: quadrato `size × size` (default 512) con filtro Lanczos3
//! 3. **Ricodifica**: JPEG baseline con qualità configurabile (default 75)
//!
//! ## Formati Supportati
//!
//! | Formato | Input | Output |
//! |---------|-------|--------|
//! | JPEG    | ✅    | ✅     |
//! | PNG     | ✅    | ❌     |
//! | WebP    | ✅    | ❌     |
//!
//! ## Error Handling
//!
//! Ogni errore diventa `ConvertError::Thumbnail`: il chiamante tratta la
//! copertina come assente, il task NON fallisce.
//!
//! ## Concorrenza
//!
//! Decodifica e resize sono CPU-bound: `normalize_file` li esegue nel pool
//! bloccante di tokio (`spawn_blocking`).

use crate::config::Config;
use crate::error::ConvertError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Crops, resizes and re-encodes cover images
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    /// Edge of the square output in pixels
    size: u32,
    /// JPEG quality (1-100)
    quality: u8,
}

impl ImageProcessor {
    pub fn new(size: u32, quality: u8) -> Self {
        Self {
            size: size.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.thumbnail_size, config.jpeg_quality)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode `bytes`, center-crop to a square and encode as JPEG
    pub fn normalize(&self, bytes: &[u8]) -> Result<Vec<u8>, ConvertError> {
        let format = image::guess_format(bytes)
            .map_err(|e| ConvertError::Thumbnail(format!("Unrecognized image data: {}", e)))?;
        let img = image::load_from_memory_with_format(bytes, format)?;
        debug!("Decoded {:?} thumbnail {}x{}", format, img.width(), img.height());

        let cropped = self.fill(&img);
        let rgb = cropped.to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
        Ok(out)
    }

    /// Resize to cover the target square, then crop the center
    fn fill(&self, img: &DynamicImage) -> DynamicImage {
        img.resize_to_fill(self.size, self.size, FilterType::Lanczos3)
    }

    /// Normalize `bytes` and write the JPEG to `dst` off the async runtime
    pub async fn normalize_file(&self, bytes: Vec<u8>, dst: &Path) -> Result<PathBuf, ConvertError> {
        let processor = *self;
        let encoded = tokio::task::spawn_blocking(move || processor.normalize(&bytes))
            .await
            .map_err(|e| ConvertError::Thumbnail(format!("Image task failed: {}", e)))??;

        tokio::fs::write(dst, encoded)
            .await
            .map_err(|e| ConvertError::Thumbnail(format!("Failed to write {}: {}", dst.display(), e)))?;
        Ok(dst.to_path_buf())
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(512, 75)
    }
}
