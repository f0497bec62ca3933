//! Bundle assembly: the (original, thumbnail) pair deposited with each article.
//!
//! | Selected kind | Original | Thumbnail |
//! |---|---|---|
//! | `pdf` | the galley link | image service on the link |
//! | `html` | reconstructed `article/download` URL | image service on that URL |
//! | `other-binary`, `missing` with a link | downloaded to `originals/` | page one rendered into `thumbnails/` |
//! | `missing` without a link | `""` | the fallback |
//!
//! The HTML case exists because the galley link for an HTML rendition points
//! at the OJS viewer; the deposit needs the file itself, which OJS serves at
//!
//! ```text
//! https://{host}/{base}/article/download/{submissionId}/{assocId}/{fileId}
//! ```
//!
//! where `host` and `base` (the first path segment, the journal path) come
//! from the galley's published URL.
//!
//! ## Local materialization
//!
//! Only the download branch can fail: a failed download or render is a
//! [`BundleError`], fatal for this article and no other. Filenames come from
//! `Content-Disposition`; two articles advertising the same name (or both
//! falling back to [`SENTINEL_FILENAME`]) collide in `originals/`.
//!
//! The collision is not prevented. Run one after the other, the second
//! download overwrites the first and a warning is logged. Run in parallel,
//! as the harvest does, the existence check and the write are not atomic:
//! the two writes can interleave, one article's thumbnail may be rendered
//! from the other's bytes, and the warning may not fire at all.

use crate::galley::{ContentKind, GalleySelection};
use crate::imaging::{RasterError, Rasterizer, ThumbnailConfig, create_thumbnail};
use crate::storage::Filesystem;
use crate::thumbnail;
use crate::transport::{Transport, TransportError};
use crate::types::Galley;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Filename used when the server does not advertise one.
pub const SENTINEL_FILENAME: &str = "download.pdf";

pub const ORIGINALS_DIR: &str = "originals";
pub const THUMBNAILS_DIR: &str = "thumbnails";

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("Download of {url} answered HTTP {status}")]
    DownloadStatus { url: String, status: u16 },
    #[error("Writing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Rendering a thumbnail of {path} failed: {source}")]
    Rasterize {
        path: PathBuf,
        #[source]
        source: RasterError,
    },
}

impl BundleError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The deposit pair for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBundle {
    /// URL or local path of the original file; `""` when there is none.
    pub original: String,
    /// URL or local path of the thumbnail; may be `""`.
    pub thumbnail: String,
    pub kind: ContentKind,
}

/// Download URL OJS serves an HTML galley's file at.
///
/// `None` when the galley's file descriptor is missing or lacks an id, or its
/// published URL has no host.
pub fn html_download_url(galley: &Galley) -> Option<String> {
    let file = galley.file.as_ref()?;
    let published = Url::parse(&galley.url_published).ok()?;
    let host = match (published.host_str()?, published.port()) {
        (host, Some(port)) => format!("{host}:{port}"),
        (host, None) => host.to_string(),
    };
    let base = published
        .path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|segment| !segment.is_empty());
    let tail = format!(
        "article/download/{}/{}/{}",
        file.submission_id?, file.assoc_id?, file.id?
    );
    Some(match base {
        Some(base) => format!("https://{host}/{base}/{tail}"),
        None => format!("https://{host}/{tail}"),
    })
}

/// Extract a safe filename from a `Content-Disposition` header.
///
/// Prefers the RFC 5987 `filename*=` form over `filename=`. Directory parts
/// are dropped so a hostile header cannot write outside `originals/`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let params: Vec<(String, &str)> = header
        .split(';')
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect();

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| {
            // charset'language'percent-encoded
            let encoded = value.splitn(3, '\'').nth(2)?;
            urlencoding::decode(encoded).ok().map(|s| s.into_owned())
        });
    let plain = || {
        params
            .iter()
            .find(|(key, _)| key == "filename")
            .map(|(_, value)| {
                value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(*value)
                    .replace("\\\"", "\"")
            })
    };

    let raw = extended.or_else(plain)?;
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// Turns a [`GalleySelection`] into an [`AssetBundle`].
pub struct BundleAssembler<'a, T, F, R> {
    pub transport: &'a T,
    pub fs: &'a F,
    pub rasterizer: &'a R,
    /// IIIF image-service base URL.
    pub image_service: &'a str,
    /// Root under which `originals/` and `thumbnails/` are created.
    pub output_dir: &'a Path,
    pub thumbnails: ThumbnailConfig,
}

impl<T: Transport, F: Filesystem, R: Rasterizer> BundleAssembler<'_, T, F, R> {
    pub fn assemble(
        &self,
        selection: &GalleySelection,
        fallback: &str,
    ) -> Result<AssetBundle, BundleError> {
        let link = selection.link.as_str();
        let (original, thumbnail) = match selection.kind {
            ContentKind::Pdf => {
                let thumb = thumbnail::resolve(self.transport, self.image_service, link, fallback);
                (link.to_string(), thumb)
            }
            ContentKind::Html => {
                let download = match selection.galley.as_ref().and_then(html_download_url) {
                    Some(url) => url,
                    None => {
                        warn!(%link, "cannot reconstruct download URL for HTML galley, using link");
                        link.to_string()
                    }
                };
                let thumb =
                    thumbnail::resolve(self.transport, self.image_service, &download, fallback);
                (download, thumb)
            }
            ContentKind::OtherBinary | ContentKind::Missing if !link.is_empty() => {
                let (original, thumb) = self.materialize(link)?;
                (
                    original.display().to_string(),
                    thumb.display().to_string(),
                )
            }
            ContentKind::OtherBinary | ContentKind::Missing => {
                (String::new(), fallback.to_string())
            }
        };

        Ok(AssetBundle {
            original,
            thumbnail,
            kind: selection.kind,
        })
    }

    /// Download `link` into `originals/` and render its thumbnail.
    fn materialize(&self, link: &str) -> Result<(PathBuf, PathBuf), BundleError> {
        let response = self
            .transport
            .get(link)
            .map_err(|source| BundleError::Download {
                url: link.to_string(),
                source,
            })?;
        if !response.is_ok() {
            return Err(BundleError::DownloadStatus {
                url: link.to_string(),
                status: response.status,
            });
        }

        let file_name = match response
            .header("content-disposition")
            .and_then(filename_from_disposition)
        {
            Some(name) => name,
            None => {
                warn!(%link, "no usable Content-Disposition filename, saving as {SENTINEL_FILENAME}");
                SENTINEL_FILENAME.to_string()
            }
        };

        let originals = self.output_dir.join(ORIGINALS_DIR);
        self.fs
            .ensure_dir(&originals)
            .map_err(|e| BundleError::io(&originals, e))?;
        let original = originals.join(&file_name);
        // Racy across workers; see the module docs.
        if self.fs.exists(&original) {
            warn!(path = %original.display(), "overwriting existing original; filename collision with another download");
        }
        self.fs
            .write(&original, &response.body)
            .map_err(|e| BundleError::io(&original, e))?;
        info!(path = %original.display(), bytes = response.body.len(), "downloaded original");

        let thumbnails = self.output_dir.join(THUMBNAILS_DIR);
        self.fs
            .ensure_dir(&thumbnails)
            .map_err(|e| BundleError::io(&thumbnails, e))?;
        let thumb = create_thumbnail(self.rasterizer, &original, &thumbnails, &self.thumbnails)
            .map_err(|source| BundleError::Rasterize {
                path: original.clone(),
                source,
            })?;
        debug!(path = %thumb.display(), "rendered local thumbnail");

        Ok((original, thumb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockRasterizer;
    use crate::test_helpers::*;
    use crate::thumbnail::thumbnail_url;
    use crate::types::{FileDescriptor, GalleyLocation};

    const SERVICE: &str = "https://iiif.example.org/iiif/2";

    fn html_galley(published: &str) -> Galley {
        Galley {
            location: GalleyLocation::Hosted,
            url_published: published.to_string(),
            file: Some(FileDescriptor {
                id: Some(3),
                submission_id: Some(1),
                assoc_id: Some(2),
                url: "https://host/sub/article/view/1/2".to_string(),
            }),
        }
    }

    fn selection(link: &str, kind: ContentKind, galley: Option<Galley>) -> GalleySelection {
        GalleySelection {
            link: link.to_string(),
            kind,
            galley,
        }
    }

    fn assembler<'a>(
        transport: &'a MockTransport,
        fs: &'a MemoryFs,
        rasterizer: &'a MockRasterizer,
    ) -> BundleAssembler<'a, MockTransport, MemoryFs, MockRasterizer> {
        BundleAssembler {
            transport,
            fs,
            rasterizer,
            image_service: SERVICE,
            output_dir: Path::new("/out/paj"),
            thumbnails: ThumbnailConfig::default(),
        }
    }

    #[test]
    fn html_download_url_from_published_url() {
        assert_eq!(
            html_download_url(&html_galley("https://host/sub/issue/view/7")).unwrap(),
            "https://host/sub/article/download/1/2/3"
        );
    }

    #[test]
    fn html_download_url_without_base_path_or_with_port() {
        assert_eq!(
            html_download_url(&html_galley("https://host/")).unwrap(),
            "https://host/article/download/1/2/3"
        );
        assert_eq!(
            html_download_url(&html_galley("http://host:8080/sub/article/view/1")).unwrap(),
            "https://host:8080/sub/article/download/1/2/3"
        );
    }

    #[test]
    fn html_download_url_needs_file_and_host() {
        let mut galley = html_galley("https://host/sub/issue/view/7");
        galley.file = None;
        assert_eq!(html_download_url(&galley), None);
        assert_eq!(html_download_url(&html_galley("not a url")), None);
    }

    #[test]
    fn html_without_assoc_id_falls_back_to_link() {
        let mut galley = html_galley("https://host/sub/issue/view/7");
        if let Some(file) = galley.file.as_mut() {
            file.assoc_id = None;
        }
        assert_eq!(html_download_url(&galley), None);

        let link = "https://host/sub/article/view/1/2";
        let thumb = thumbnail_url(SERVICE, link);
        let transport = MockTransport::new().respond(&thumb, response(200, "image/jpeg"));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection(link, ContentKind::Html, Some(galley)), "")
            .unwrap();

        assert_eq!(bundle.original, link);
        assert_eq!(bundle.thumbnail, thumb);
    }

    #[test]
    fn disposition_filename_forms() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="article-46.pdf""#).as_deref(),
            Some("article-46.pdf")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=plain.docx").as_deref(),
            Some("plain.docx")
        );
        assert_eq!(
            filename_from_disposition(
                r#"attachment; filename="fallback.pdf"; filename*=UTF-8''%C3%A9tude%20un.pdf"#
            )
            .as_deref(),
            Some("étude un.pdf")
        );
    }

    #[test]
    fn disposition_strips_directories_and_rejects_garbage() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition(r#"attachment; filename="""#), None);
        assert_eq!(filename_from_disposition(r#"attachment; filename="..""#), None);
    }

    #[test]
    fn pdf_uses_image_service_thumbnail() {
        let link = "https://host/sub/article/download/1/2/3.pdf";
        let thumb = thumbnail_url(SERVICE, link);
        let transport = MockTransport::new().respond(&thumb, response(200, "image/jpeg"));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection(link, ContentKind::Pdf, None), "default.png")
            .unwrap();

        assert_eq!(bundle.original, link);
        assert_eq!(bundle.thumbnail, thumb);
        assert_eq!(bundle.kind, ContentKind::Pdf);
        assert!(fs.file_paths().is_empty());
    }

    #[test]
    fn pdf_with_unreachable_thumbnail_uses_fallback() {
        let transport = MockTransport::new();
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection("https://host/a.pdf", ContentKind::Pdf, None), "default.png")
            .unwrap();

        assert_eq!(bundle.thumbnail, "default.png");
    }

    #[test]
    fn html_reconstructs_download_url() {
        let galley = html_galley("https://host/sub/issue/view/7");
        let download = "https://host/sub/article/download/1/2/3";
        let thumb = thumbnail_url(SERVICE, download);
        let transport = MockTransport::new().respond(&thumb, response(200, "image/jpeg"));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(
                &selection("https://host/sub/article/view/1/2", ContentKind::Html, Some(galley)),
                "",
            )
            .unwrap();

        assert_eq!(bundle.original, download);
        assert_eq!(bundle.thumbnail, thumb);
        assert_eq!(transport.requested_urls(), vec![thumb]);
    }

    #[test]
    fn other_binary_is_downloaded_and_rendered() {
        let link = "https://host/sub/article/download/1/2/3";
        let transport = MockTransport::new().respond(
            link,
            response_with(
                200,
                &[
                    ("Content-Type", "application/octet-stream"),
                    ("Content-Disposition", r#"attachment; filename="essay.pdf""#),
                ],
                b"%PDF-1.7",
            ),
        );
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection(link, ContentKind::OtherBinary, None), "default.png")
            .unwrap();

        assert_eq!(bundle.original, "/out/paj/originals/essay.pdf");
        assert_eq!(bundle.thumbnail, "/out/paj/thumbnails/essay.jpg");
        assert_eq!(
            fs.read(Path::new("/out/paj/originals/essay.pdf")).unwrap(),
            b"%PDF-1.7"
        );
        assert!(fs.has_dir(Path::new("/out/paj/thumbnails")));

        let rendered = rasterizer.get_rendered();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].source, PathBuf::from("/out/paj/originals/essay.pdf"));
        assert_eq!(rendered[0].width, 159);
    }

    #[test]
    fn missing_disposition_uses_sentinel_name() {
        let link = "https://host/sub/article/view/1";
        let transport = MockTransport::new().respond(link, response(200, "text/html"));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection(link, ContentKind::Missing, None), "")
            .unwrap();

        assert_eq!(bundle.original, "/out/paj/originals/download.pdf");
        assert_eq!(bundle.thumbnail, "/out/paj/thumbnails/download.jpg");
        assert_eq!(bundle.kind, ContentKind::Missing);
    }

    #[test]
    fn second_download_with_same_name_overwrites() {
        let link = "https://host/a";
        let transport = MockTransport::new().respond(link, response(200, ""));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());
        let assembler = assembler(&transport, &fs, &rasterizer);

        assembler
            .assemble(&selection(link, ContentKind::OtherBinary, None), "")
            .unwrap();
        assembler
            .assemble(&selection(link, ContentKind::OtherBinary, None), "")
            .unwrap();

        assert_eq!(fs.file_paths(), vec![PathBuf::from("/out/paj/originals/download.pdf")]);
    }

    #[test]
    fn missing_without_link_uses_fallback() {
        let transport = MockTransport::new();
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());

        let bundle = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection("", ContentKind::Missing, None), "default.png")
            .unwrap();

        assert_eq!(bundle.original, "");
        assert_eq!(bundle.thumbnail, "default.png");
        assert!(transport.requested_urls().is_empty());
        assert!(!fs.has_dir(Path::new("/out/paj/originals")));
    }

    #[test]
    fn failed_download_is_an_error() {
        let transport = MockTransport::new()
            .fail("https://host/a")
            .respond("https://host/b", response(500, "text/html"));
        let (fs, rasterizer) = (MemoryFs::new(), MockRasterizer::new());
        let assembler = assembler(&transport, &fs, &rasterizer);

        assert!(matches!(
            assembler.assemble(&selection("https://host/a", ContentKind::OtherBinary, None), ""),
            Err(BundleError::Download { .. })
        ));
        assert!(matches!(
            assembler.assemble(&selection("https://host/b", ContentKind::Missing, None), ""),
            Err(BundleError::DownloadStatus { status: 500, .. })
        ));
        assert!(rasterizer.get_rendered().is_empty());
    }

    #[test]
    fn failed_render_is_an_error() {
        let link = "https://host/a";
        let transport = MockTransport::new().respond(link, response(200, "application/zip"));
        let fs = MemoryFs::new();
        let rasterizer = MockRasterizer::failing("not a PDF");

        let result = assembler(&transport, &fs, &rasterizer)
            .assemble(&selection(link, ContentKind::OtherBinary, None), "");

        assert!(matches!(result, Err(BundleError::Rasterize { .. })));
    }
}
