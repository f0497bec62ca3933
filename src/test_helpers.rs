//! Shared fakes for the ojs-harvest test suite.
//!
//! - [`MockTransport`]: scripted HTTP responses keyed by absolute URL, with a
//!   log of every request made. Unscripted URLs fail like a refused connection.
//! - [`MemoryFs`]: in-memory [`Filesystem`] that enforces "directory must exist
//!   before writing into it".
//! - [`response`] / [`response_with`]: terse response builders.
//!
//! The rasterizer fake lives next to its trait in `imaging::backend::tests`.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let transport = MockTransport::new()
//!     .respond("https://j.org/a.pdf", response(200, "application/pdf"))
//!     .fail("https://j.org/down");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::Filesystem;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

// =========================================================================
// Responses
// =========================================================================

/// A response with a status and `Content-Type`, empty body.
pub fn response(status: u16, content_type: &str) -> HttpResponse {
    response_with(status, &[("content-type", content_type)], b"")
}

/// A response with arbitrary headers and body.
pub fn response_with(status: u16, headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        body: body.to_vec(),
    }
}

// =========================================================================
// Transport
// =========================================================================

enum Scripted {
    Respond(HttpResponse),
    Fail,
}

/// Scripted transport. The same URL always gets the same answer.
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, Scripted>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn normalize(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, response: HttpResponse) -> Self {
        self.routes
            .insert(normalize(url), Scripted::Respond(response));
        self
    }

    pub fn fail(mut self, url: &str) -> Self {
        self.routes.insert(normalize(url), Scripted::Fail);
        self
    }

    /// Absolute URLs requested so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.full_url().map(|u| u.to_string()).unwrap_or_else(|_| r.url.clone()))
            .collect()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.requested_urls().iter().filter(|u| **u == url).count()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let url = request.full_url()?.to_string();
        match self.routes.get(&url) {
            Some(Scripted::Respond(response)) => Ok(response.clone()),
            Some(Scripted::Fail) | None => Err(TransportError::RequestFailed {
                url,
                message: "connection refused".to_string(),
            }),
        }
    }
}

// =========================================================================
// Filesystem
// =========================================================================

/// In-memory filesystem.
#[derive(Default)]
pub struct MemoryFs {
    dirs: Mutex<BTreeSet<PathBuf>>,
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl Filesystem for MemoryFs {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.lock().unwrap();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path) || self.has_dir(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        if !parent.as_os_str().is_empty() && !self.has_dir(parent) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", parent.display()),
            ));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
