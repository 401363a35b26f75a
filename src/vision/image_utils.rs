// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading, saving and format helpers

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::errors::RedactError;

/// Maximum image size (100MB)
const MAX_IMAGE_SIZE: usize = 100 * 1024 * 1024;

/// Suffix appended to the input file stem for the default output path
pub const OUTPUT_SUFFIX: &str = "_blurred";

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Image has zero width or height")]
    ZeroSized,

    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Decode raw image bytes
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    // Validate size
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::ZeroSized);
    }

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Read and decode an image file
///
/// Any failure is reported as [`RedactError::InvalidImage`] naming the path.
pub fn load_image(path: &Path) -> Result<(DynamicImage, ImageInfo), RedactError> {
    let invalid = |e: ImageError| RedactError::InvalidImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let bytes = std::fs::read(path).map_err(|e| invalid(ImageError::Read(e)))?;
    let (img, info) = decode_image_bytes(&bytes).map_err(invalid)?;

    debug!(
        "Decoded {}: {}x{} {:?}, {} bytes",
        path.display(),
        info.width,
        info.height,
        info.format,
        info.size_bytes
    );

    Ok((img, info))
}

/// Detect image format from magic bytes
///
/// Common formats are matched directly; anything else is left to the
/// codec's own signature table.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

/// `<dir>/<stem>_blurred.<ext>` next to the input
///
/// Inputs without an extension get `.png`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "png".to_string());
    input.with_file_name(format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext))
}

/// Output format from the path's extension, else `fallback`
pub fn output_format(path: &Path, fallback: ImageFormat) -> ImageFormat {
    ImageFormat::from_path(path).unwrap_or(fallback)
}

/// Fully written output waiting in a temporary file beside its destination
///
/// Dropping it without [`StagedFile::commit`] removes the temporary file, so
/// nothing is left at the destination.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    fn create(
        path: &Path,
        extension: &str,
        write: impl FnOnce(&mut BufWriter<&mut File>) -> Result<(), String>,
    ) -> Result<Self, RedactError> {
        let output_err = |reason: String| RedactError::Output {
            path: path.to_path_buf(),
            reason,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".text-blur-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&dir)
            .map_err(|e| output_err(e.to_string()))?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            write(&mut writer).map_err(output_err)?;
            writer.flush().map_err(|e| output_err(e.to_string()))?;
        }

        Ok(Self {
            tmp,
            path: path.to_path_buf(),
        })
    }

    /// Final destination
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file over its destination
    pub fn commit(self) -> Result<(), RedactError> {
        let path = self.path;
        self.tmp.persist(&path).map_err(|e| RedactError::Output {
            path: path.clone(),
            reason: e.error.to_string(),
        })?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Encode `image` for `path` into a staged temporary file
pub fn stage_image(
    image: &DynamicImage,
    path: &Path,
    format: ImageFormat,
) -> Result<StagedFile, RedactError> {
    // JPEG has no alpha channel
    let converted;
    let image = if format == ImageFormat::Jpeg && image.color().has_alpha() {
        converted = DynamicImage::ImageRgb8(image.to_rgb8());
        &converted
    } else {
        image
    };

    StagedFile::create(path, format_to_extension(format), |writer| {
        image.write_to(writer, format).map_err(|e| e.to_string())
    })
}

/// Stage raw bytes (e.g. a JSON report) for `path`
pub fn stage_bytes(bytes: &[u8], path: &Path) -> Result<StagedFile, RedactError> {
    StagedFile::create(path, "tmp", |writer| {
        writer.write_all(bytes).map_err(|e| e.to_string())
    })
}
