//! High-level thumbnail operations.
//!
//! These decide output names and parameters, then hand off to a [`Rasterizer`].

use super::backend::{RasterError, Rasterizer};
use super::params::{Quality, Sharpening, THUMBNAIL_WIDTH, ThumbnailParams};
use std::path::{Path, PathBuf};

/// Extension every locally rendered thumbnail gets.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// Configuration for local thumbnail rendering.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub width: u32,
    pub quality: Quality,
    pub sharpening: Option<Sharpening>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: THUMBNAIL_WIDTH,
            quality: Quality::default(),
            sharpening: Some(Sharpening::light()),
        }
    }
}

/// Thumbnail filename for a downloaded original: same stem, image extension.
///
/// `article-46.pdf` → `article-46.jpg`, `scan` → `scan.jpg`.
pub fn thumbnail_file_name(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "thumbnail".to_string());
    PathBuf::from(stem).with_extension(THUMBNAIL_EXTENSION)
}

/// Plan a thumbnail render without executing it.
pub fn plan_thumbnail(
    source: &Path,
    thumbnails_dir: &Path,
    config: &ThumbnailConfig,
) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: thumbnails_dir.join(thumbnail_file_name(source)),
        width: config.width,
        quality: config.quality,
        sharpening: config.sharpening,
    }
}

/// Render page one of `source` into `thumbnails_dir`, returning the image path.
pub fn create_thumbnail(
    rasterizer: &impl Rasterizer,
    source: &Path,
    thumbnails_dir: &Path,
    config: &ThumbnailConfig,
) -> Result<PathBuf, RasterError> {
    let params = plan_thumbnail(source, thumbnails_dir, config);
    rasterizer.render_first_page(&params)?;
    Ok(params.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockRasterizer;

    #[test]
    fn thumbnail_name_swaps_extension() {
        assert_eq!(
            thumbnail_file_name(Path::new("/out/originals/article-46.pdf")),
            PathBuf::from("article-46.jpg")
        );
        assert_eq!(thumbnail_file_name(Path::new("scan")), PathBuf::from("scan.jpg"));
        assert_eq!(
            thumbnail_file_name(Path::new("report.v2.docx")),
            PathBuf::from("report.v2.jpg")
        );
    }

    #[test]
    fn plan_uses_config_width() {
        let params = plan_thumbnail(
            Path::new("/out/originals/a.pdf"),
            Path::new("/out/thumbnails"),
            &ThumbnailConfig::default(),
        );
        assert_eq!(params.width, 159);
        assert_eq!(params.output, PathBuf::from("/out/thumbnails/a.jpg"));
        assert_eq!(params.sharpening, Some(Sharpening::light()));
    }

    #[test]
    fn create_thumbnail_calls_rasterizer() {
        let rasterizer = MockRasterizer::new();
        let path = create_thumbnail(
            &rasterizer,
            Path::new("/out/originals/a.pdf"),
            Path::new("/out/thumbnails"),
            &ThumbnailConfig::default(),
        )
        .unwrap();

        assert_eq!(path, PathBuf::from("/out/thumbnails/a.jpg"));
        let rendered = rasterizer.get_rendered();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].source, PathBuf::from("/out/originals/a.pdf"));
    }

    #[test]
    fn create_thumbnail_propagates_failure() {
        let rasterizer = MockRasterizer::failing("bad page tree");
        let result = create_thumbnail(
            &rasterizer,
            Path::new("/a.pdf"),
            Path::new("/thumbs"),
            &ThumbnailConfig::default(),
        );
        assert!(matches!(result, Err(RasterError::Render(_))));
    }
}
