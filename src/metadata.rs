//! Dublin Core metadata via OAI-PMH `GetRecord`.
//!
//! For each article one record is requested from the journal's OAI endpoint:
//!
//! ```text
//! {endpoint}?verb=GetRecord&metadataPrefix=oai_dc&identifier=oai:{host}:article/{id}
//! ```
//!
//! The response is parsed namespace-aware: elements are matched by namespace
//! URI plus local name, never by prefix, so a repository that binds `dc` to a
//! different prefix still parses. From `oai_dc:dc` we keep the first `title`,
//! `date` and `source`, and every `creator` and `subject` in document order.
//!
//! ## Degradation
//!
//! Metadata is never fatal. A transport error, a non-200 status, a body that
//! is not well-formed XML, or an OAI-PMH `<error>` response all produce a
//! [`MetadataUnavailable`] from [`fetch_record`]; [`resolve`] logs it and
//! returns an empty [`DublinCoreRecord`], which is a valid value.

use crate::transport::{HttpRequest, Transport, TransportError};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const OAI_NS: &[u8] = b"http://www.openarchives.org/OAI/2.0/";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";

/// Delimiter for multi-valued fields in flat records.
pub const MULTI_VALUE_DELIMITER: &str = "||";

#[derive(Error, Debug)]
pub enum MetadataUnavailable {
    #[error("OAI endpoint {0} has no host")]
    Endpoint(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("OAI endpoint answered HTTP {0}")]
    Status(u16),
    #[error("Malformed OAI-PMH response: {0}")]
    Malformed(String),
    #[error("OAI-PMH error {code}: {message}")]
    Protocol { code: String, message: String },
}

/// Dublin Core fields kept from an `oai_dc` record. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DublinCoreRecord {
    pub title: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub creators: Vec<String>,
    pub subjects: Vec<String>,
}

impl DublinCoreRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Creators joined with `||`, `""` when there are none.
    pub fn creator_field(&self) -> String {
        join_values(&self.creators)
    }

    /// Subjects joined with `||`, `""` when there are none.
    pub fn subject_field(&self) -> String {
        join_values(&self.subjects)
    }
}

pub fn join_values(values: &[String]) -> String {
    values.join(MULTI_VALUE_DELIMITER)
}

/// `oai:{host}:article/{id}` for the endpoint's host.
pub fn record_identifier(endpoint: &str, article_id: u64) -> Result<String, MetadataUnavailable> {
    let host = Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| MetadataUnavailable::Endpoint(endpoint.to_string()))?;
    Ok(format!("oai:{host}:article/{article_id}"))
}

/// Fetch and parse one record, reporting why it is unavailable.
pub fn fetch_record(
    transport: &impl Transport,
    article_id: u64,
    endpoint: &str,
) -> Result<DublinCoreRecord, MetadataUnavailable> {
    let identifier = record_identifier(endpoint, article_id)?;
    let request = HttpRequest::get(endpoint)
        .query("verb", "GetRecord")
        .query("metadataPrefix", "oai_dc")
        .query("identifier", identifier);
    let response = transport.send(&request)?;
    if !response.is_ok() {
        return Err(MetadataUnavailable::Status(response.status));
    }
    parse_record(&response.text())
}

/// Resolve metadata for an article; failures degrade to an empty record.
pub fn resolve(transport: &impl Transport, article_id: u64, endpoint: &str) -> DublinCoreRecord {
    match fetch_record(transport, article_id, endpoint) {
        Ok(record) => {
            debug!(article_id, creators = record.creators.len(), "harvested oai_dc record");
            record
        }
        Err(e) => {
            warn!(article_id, "metadata unavailable, continuing with empty record: {e}");
            DublinCoreRecord::default()
        }
    }
}

#[derive(Clone, Copy)]
enum DcField {
    Title,
    Creator,
    Subject,
    Date,
    Source,
}

fn dc_field(local_name: &[u8]) -> Option<DcField> {
    match local_name {
        b"title" => Some(DcField::Title),
        b"creator" => Some(DcField::Creator),
        b"subject" => Some(DcField::Subject),
        b"date" => Some(DcField::Date),
        b"source" => Some(DcField::Source),
        _ => None,
    }
}

/// What the parser is currently collecting text for.
enum Capture {
    Field(DcField),
    ProtocolError { code: String },
}

/// Parse an OAI-PMH `GetRecord` response body.
pub fn parse_record(xml: &str) -> Result<DublinCoreRecord, MetadataUnavailable> {
    let mut reader = NsReader::from_str(xml);
    let mut record = DublinCoreRecord::default();

    let mut depth = 0usize;
    let mut saw_root = false;
    // (capture, depth at which it was opened)
    let mut capture: Option<(Capture, usize)> = None;
    let mut text = String::new();
    let mut protocol_error: Option<(String, String)> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| MetadataUnavailable::Malformed(e.to_string()))?;
        match event {
            Event::Start(e) => {
                saw_root = true;
                depth += 1;
                if capture.is_none() {
                    let local = e.local_name();
                    capture = match ns {
                        ResolveResult::Bound(Namespace(DC_NS)) => {
                            dc_field(local.as_ref()).map(|f| (Capture::Field(f), depth))
                        }
                        ResolveResult::Bound(Namespace(OAI_NS)) if local.as_ref() == b"error" => {
                            let code = e
                                .try_get_attribute("code")
                                .ok()
                                .flatten()
                                .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                                .unwrap_or_default();
                            Some((Capture::ProtocolError { code }, depth))
                        }
                        _ => None,
                    };
                    text.clear();
                }
            }
            Event::Empty(_) => saw_root = true,
            Event::Text(e) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| MetadataUnavailable::Malformed(e.to_string()))?;
                if depth == 0 {
                    if !unescaped.trim().is_empty() {
                        return Err(MetadataUnavailable::Malformed(
                            "text outside the root element".to_string(),
                        ));
                    }
                } else if capture.is_some() {
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if capture.as_ref().is_some_and(|(_, d)| *d == depth) {
                    if let Some((captured, _)) = capture.take() {
                        let value = text.trim().to_string();
                        match captured {
                            Capture::Field(field) => record.push(field, value),
                            Capture::ProtocolError { code } => {
                                protocol_error = Some((code, value));
                            }
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root || depth != 0 {
        return Err(MetadataUnavailable::Malformed(
            "document ended before the root element closed".to_string(),
        ));
    }
    if let Some((code, message)) = protocol_error {
        return Err(MetadataUnavailable::Protocol { code, message });
    }
    Ok(record)
}

impl DublinCoreRecord {
    fn push(&mut self, field: DcField, value: String) {
        if value.is_empty() {
            return;
        }
        match field {
            DcField::Title => {
                self.title.get_or_insert(value);
            }
            DcField::Date => {
                self.date.get_or_insert(value);
            }
            DcField::Source => {
                self.source.get_or_insert(value);
            }
            DcField::Creator => self.creators.push(value),
            DcField::Subject => self.subjects.push(value),
        }
    }
}
