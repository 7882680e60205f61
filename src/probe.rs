use crate::models::{ImageDimensions, SourceImage};
use crate::{LookupError, Result};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Reads the header of a local image to learn its format and pixel size.
pub fn probe_file(path: &Path) -> Result<SourceImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().ok_or_else(|| {
        LookupError::Decode(format!(
            "unrecognized image format: {}",
            path.to_string_lossy()
        ))
    })?;
    let (width, height) = reader.into_dimensions()?;
    Ok(SourceImage {
        path: path.to_path_buf(),
        dimensions: ImageDimensions::new(width, height),
        format,
    })
}

/// Sniffs in-memory bytes; the format comes from content, never from a URL or header.
pub fn probe_bytes(bytes: &[u8]) -> Result<(ImageFormat, ImageDimensions)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| LookupError::Decode("unrecognized image format".to_string()))?;
    let (width, height) = reader.into_dimensions()?;
    Ok((format, ImageDimensions::new(width, height)))
}

pub fn format_extension(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| "img".to_string())
}
