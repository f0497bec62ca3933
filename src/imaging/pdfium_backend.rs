//! pdfium-backed rasterizer.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Open document | `pdfium_render::Pdfium::load_pdf_from_file` |
//! | Render page one | `PdfPage::render_with_config` at the target width |
//! | Sharpen | `image::imageops::unsharpen` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! pdfium is a shared library loaded at runtime. Binding happens on the first
//! render, so a harvest that never needs a local thumbnail runs fine on a
//! machine without it.

use super::backend::{RasterError, Rasterizer};
use super::params::ThumbnailParams;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct PdfiumRasterizer {
    /// Directory holding the pdfium shared library; `None` uses the system search path.
    library_dir: Option<PathBuf>,
    /// Bound lazily and reused; pdfium itself is not reentrant.
    pdfium: Mutex<Option<Pdfium>>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self {
            library_dir,
            pdfium: Mutex::new(None),
        }
    }

    fn bind(&self) -> Result<Pdfium, RasterError> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| RasterError::Library(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn render_first_page(&self, params: &ThumbnailParams) -> Result<(), RasterError> {
        let mut guard = self
            .pdfium
            .lock()
            .map_err(|_| RasterError::Library("pdfium lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.bind()?);
        }
        let Some(pdfium) = guard.as_ref() else {
            return Err(RasterError::Library("pdfium not bound".to_string()));
        };

        let document = pdfium
            .load_pdf_from_file(&params.source, None)
            .map_err(|e| RasterError::Load {
                path: params.source.display().to_string(),
                message: e.to_string(),
            })?;
        let page = document
            .pages()
            .first()
            .map_err(|e| RasterError::Render(format!("no first page: {e}")))?;

        let render_config = PdfRenderConfig::new().set_target_width(params.width as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RasterError::Render(e.to_string()))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
            RasterError::Render(format!("bitmap buffer does not match {width}x{height}"))
        })?;

        let rgba = match params.sharpening {
            Some(s) => image::imageops::unsharpen(&rgba, s.sigma, s.threshold),
            None => rgba,
        };
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let file = std::fs::File::create(&params.output)?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), params.quality.value());
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| RasterError::Encode(e.to_string()))
    }
}
