//! Journal REST API client and issue records.
//!
//! Two endpoints are used, both relative to the journal's base URL and both
//! authenticated with the journal's API token as a bearer credential:
//!
//! | Endpoint | Payload |
//! |---|---|
//! | `GET {url}/api/v1/issues` | `{ "items": [Issue] }` |
//! | `GET {url}/api/v1/issues/{id}` | `{ "articles": [ArticleRecord] }` |
//!
//! Only the first page of issues is read.

use crate::transport::{HttpRequest, Transport, TransportError};
use crate::types::{ArticleRecord, Issue, IssueDetail, IssueList};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

pub const ISSUE_TYPE: &str = "Issue";

#[derive(Error, Debug)]
pub enum JournalError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Journal API {url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Journal API {url} returned unexpected JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct JournalClient<'a, T> {
    transport: &'a T,
    base_url: String,
    token: String,
}

impl<'a, T: Transport> JournalClient<'a, T> {
    /// `token` may be empty for journals that publish their API anonymously.
    pub fn new(transport: &'a T, base_url: &str, token: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D, JournalError> {
        let url = format!("{}/api/v1/{path}", self.base_url);
        let mut request = HttpRequest::get(&url);
        if !self.token.is_empty() {
            request = request.bearer(&self.token);
        }

        let response = self.transport.send(&request)?;
        if !response.is_ok() {
            return Err(JournalError::Status {
                url,
                status: response.status,
            });
        }
        debug!(%url, bytes = response.body.len(), "journal API response");
        serde_json::from_slice(&response.body).map_err(|source| JournalError::Decode { url, source })
    }

    pub fn issues(&self) -> Result<Vec<Issue>, JournalError> {
        Ok(self.get_json::<IssueList>("issues")?.items)
    }

    pub fn issue_articles(&self, issue_id: u64) -> Result<Vec<ArticleRecord>, JournalError> {
        Ok(self
            .get_json::<IssueDetail>(&format!("issues/{issue_id}"))?
            .articles)
    }
}

/// The flat per-issue record, keyed by repository column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueRow {
    #[serde(rename = "bundle:THUMBNAIL")]
    pub thumbnail: String,
    #[serde(rename = "dcterms.available")]
    pub available: String,
    #[serde(rename = "dc.description")]
    pub description: String,
    #[serde(rename = "dc.title")]
    pub title: String,
    #[serde(rename = "dc.identifier")]
    pub identifier: String,
    #[serde(rename = "dc.created")]
    pub created: String,
    #[serde(rename = "dcterms.type")]
    pub entity_type: String,
}

impl IssueRow {
    pub fn from_issue(issue: &Issue, journal_title: &str) -> Self {
        Self {
            thumbnail: issue.cover_image(),
            available: issue.date_published.clone().unwrap_or_default(),
            description: issue.description(),
            title: format!(
                "{journal_title}: {}",
                issue.identification.as_deref().unwrap_or_default()
            ),
            identifier: issue.number.clone().unwrap_or_default(),
            created: issue.year.map(|y| y.to_string()).unwrap_or_default(),
            entity_type: ISSUE_TYPE.to_string(),
        }
    }
}
