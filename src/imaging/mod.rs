//! Local thumbnail rendering for documents that have no image-service thumbnail.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Render page one** | `pdfium-render` |
//! | **Sharpen + encode** | `image` (`unsharpen`, JPEG encoder) |
//!
//! The module is split into:
//! - **Parameters**: what to render ([`ThumbnailParams`], [`Quality`], [`Sharpening`])
//! - **Backend**: [`Rasterizer`] trait + [`PdfiumRasterizer`]
//! - **Operations**: naming and planning on top of the backend

pub mod backend;
pub mod operations;
mod params;
pub mod pdfium_backend;

pub use backend::{RasterError, Rasterizer};
pub use operations::{ThumbnailConfig, create_thumbnail, thumbnail_file_name};
pub use params::{Quality, Sharpening, THUMBNAIL_WIDTH, ThumbnailParams};
pub use pdfium_backend::PdfiumRasterizer;
