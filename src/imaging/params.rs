//! Parameter types for local thumbnail rendering.
//!
//! [`ThumbnailParams`] says *what* to render; the [`Rasterizer`](super::Rasterizer)
//! decides *how*. Keeping the two apart lets the bundle assembler be tested
//! against a recording mock without pdfium installed.

use std::path::PathBuf;

/// Width of every thumbnail, local or IIIF-derived (`full/159,/0/default.jpg`).
pub const THUMBNAIL_WIDTH: u32 = 159;

/// JPEG encoding quality (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Unsharp-mask applied after downscaling a rendered page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening; small renders of text pages go soft without it.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// Render page one of `source` to a JPEG at `output`, `width` pixels wide.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}
