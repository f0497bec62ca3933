//! Galley selection: which rendition of a publication becomes the bundle original.
//!
//! Galleys are scanned in the order the journal lists them and the first one
//! that verifies wins. There is no scoring; a reachable HTML galley listed
//! before a reachable PDF galley is chosen over it.
//!
//! For each galley:
//!
//! 1. GET the published URL and read its `Content-Type`. Anything other than
//!    `application/pdf` (typically the OJS HTML viewer page) switches the
//!    candidate to the galley's file URL, whose type is then read the same way.
//! 2. Classify the type into a [`ContentKind`].
//! 3. GET the candidate again to verify: it must answer 200 and the galley must
//!    be hosted by the journal, not a remote link.
//!
//! Each step gates the next, and each galley gates the one after it, so the
//! scan is strictly sequential. When nothing verifies, the publication's own
//! published URL is the link (kind [`ContentKind::Missing`]), or `""` if the
//! journal sent none.

use crate::transport::{Transport, TransportError};
use crate::types::{Galley, GalleyLocation, Publication};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Content-type family of the selected rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Pdf,
    Html,
    OtherBinary,
    /// No galley verified; the link (if any) is the publication landing page.
    Missing,
}

impl ContentKind {
    /// Classify a `Content-Type` header value.
    pub fn classify(content_type: &str) -> Self {
        let lowered = content_type.to_ascii_lowercase();
        let essence = lowered.split(';').next().unwrap_or_default().trim();
        if essence == PDF_MEDIA_TYPE {
            ContentKind::Pdf
        } else if lowered.contains("text/html") {
            ContentKind::Html
        } else {
            ContentKind::OtherBinary
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Html => "html",
            ContentKind::OtherBinary => "other-binary",
            ContentKind::Missing => "missing",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a galley scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleySelection {
    pub link: String,
    pub kind: ContentKind,
    /// The accepted galley; `None` when the scan fell back.
    pub galley: Option<Galley>,
}

impl GalleySelection {
    /// No galley verified and there is no fallback URL either.
    pub fn is_empty(&self) -> bool {
        self.galley.is_none() && self.link.is_empty()
    }
}

/// Why a galley was passed over.
#[derive(Error, Debug)]
enum Rejection {
    #[error(transparent)]
    Unreachable(#[from] TransportError),
    #[error("not a PDF and has no file URL to fall back to")]
    NoFile,
    #[error("verification answered HTTP {0}")]
    Status(u16),
    #[error("remote galley")]
    Remote,
}

fn probe(transport: &impl Transport, galley: &Galley) -> Result<(String, ContentKind), Rejection> {
    let mut link = galley.url_published.clone();
    let mut content_type = transport.get(&link)?.content_type().to_string();

    if ContentKind::classify(&content_type) != ContentKind::Pdf {
        let file = galley
            .file
            .as_ref()
            .filter(|f| !f.url.is_empty())
            .ok_or(Rejection::NoFile)?;
        link = file.url.clone();
        content_type = transport.get(&link)?.content_type().to_string();
    }
    let kind = ContentKind::classify(&content_type);

    let verified = transport.get(&link)?;
    if !verified.is_ok() {
        return Err(Rejection::Status(verified.status));
    }
    if galley.location == GalleyLocation::Remote {
        return Err(Rejection::Remote);
    }
    Ok((link, kind))
}

/// Scan the publication's galleys and pick the first that verifies.
pub fn resolve(transport: &impl Transport, publication: &Publication) -> GalleySelection {
    for (index, galley) in publication.galleys.iter().enumerate() {
        match probe(transport, galley) {
            Ok((link, kind)) => {
                debug!(index, %link, %kind, "galley accepted");
                return GalleySelection {
                    link,
                    kind,
                    galley: Some(galley.clone()),
                };
            }
            Err(reason) => {
                warn!(index, url = %galley.url_published, "skipping galley: {reason}");
            }
        }
    }

    let link = publication.fallback_url().unwrap_or_default().to_string();
    if link.is_empty() {
        warn!("no galley verified and publication has no published URL");
    } else {
        debug!(%link, "no galley verified, falling back to published URL");
    }
    GalleySelection {
        link,
        kind: ContentKind::Missing,
        galley: None,
    }
}
