use crate::Result;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A discovered or fallback replacement image.
///
/// Candidates scraped from a listing carry the claimed dimensions and no body.
/// Only a candidate with a decoded body may be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Remote URL, or the local path for a fallback copy.
    pub url: String,
    pub body: Option<Vec<u8>>,
    /// Extension without the leading dot.
    pub extension: Option<String>,
    pub dimensions: ImageDimensions,
    pub quality: u64,
}

impl Candidate {
    pub fn discovered(url: String, height: u32, width: u32) -> Self {
        let dimensions = ImageDimensions::new(width, height);
        Self {
            url,
            body: None,
            extension: None,
            quality: dimensions.area(),
            dimensions,
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn set_fetched(&mut self, body: Vec<u8>, extension: String, dimensions: ImageDimensions) {
        self.body = Some(body);
        self.extension = Some(extension);
        self.dimensions = dimensions;
        self.quality = dimensions.area();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Quality-descending. Empty when the listing held no usable entries.
    Candidates(Vec<Candidate>),
    NoLargeImageFound,
    Blocked,
}

/// The local file under consideration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub dimensions: ImageDimensions,
    pub format: image::ImageFormat,
}

impl SourceImage {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }

    /// Extension as written on disk, without the dot.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Wraps the original file as the chosen output.
    pub fn as_fallback_candidate(&self) -> Result<Candidate> {
        let body = self.read_bytes()?;
        Ok(Candidate {
            url: path_display(&self.path),
            body: Some(body),
            extension: Some(self.extension()),
            dimensions: self.dimensions,
            quality: self.dimensions.area(),
        })
    }
}

fn path_display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
