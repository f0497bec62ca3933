//! IIIF image-service thumbnails.
//!
//! The image service addresses a source document by the URL-safe base64 of
//! its URL. The thumbnail for `source` is therefore fully determined by the
//! string itself:
//!
//! ```text
//! {image_service}/{base64url(source)};1/full/159,/0/default.jpg
//! ```
//!
//! (`;1` selects page one; `full/159,` is a 159px-wide rendering.)
//!
//! One GET probes the constructed URL. A 200 returns it; anything else,
//! including a transport error, returns the caller's fallback untouched.

use crate::imaging::THUMBNAIL_WIDTH;
use crate::transport::Transport;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use tracing::{debug, warn};

/// Build the IIIF thumbnail URL for `source_url`. Pure and deterministic.
pub fn thumbnail_url(image_service: &str, source_url: &str) -> String {
    let encoded = URL_SAFE.encode(source_url.as_bytes());
    format!(
        "{}/{encoded};1/full/{THUMBNAIL_WIDTH},/0/default.jpg",
        image_service.trim_end_matches('/')
    )
}

/// Probe the image service; return its thumbnail URL or `fallback`.
pub fn resolve(
    transport: &impl Transport,
    image_service: &str,
    source_url: &str,
    fallback: &str,
) -> String {
    let candidate = thumbnail_url(image_service, source_url);
    match transport.get(&candidate) {
        Ok(response) if response.is_ok() => {
            debug!(%candidate, "image service thumbnail available");
            candidate
        }
        Ok(response) => {
            warn!(
                source_url,
                status = response.status,
                "image service has no thumbnail, using fallback"
            );
            fallback.to_string()
        }
        Err(e) => {
            warn!(source_url, "image service unreachable, using fallback: {e}");
            fallback.to_string()
        }
    }
}
