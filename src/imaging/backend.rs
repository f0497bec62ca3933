//! Rasterizer trait and shared error type.
//!
//! The production implementation is
//! [`PdfiumRasterizer`](super::pdfium_backend::PdfiumRasterizer). Tests use
//! the recording [`tests::MockRasterizer`].

use super::params::ThumbnailParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdfium library unavailable: {0}")]
    Library(String),
    #[error("Failed to open {path}: {message}")]
    Load { path: String, message: String },
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error("Encoding thumbnail failed: {0}")]
    Encode(String),
}

/// Renders the first page of a downloaded document to an image file.
pub trait Rasterizer: Sync {
    fn render_first_page(&self, params: &ThumbnailParams) -> Result<(), RasterError>;
}
