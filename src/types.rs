//! Journal API payloads, validated at the ingestion boundary.
//!
//! The OJS REST API is loosely shaped: localized strings arrive either as a
//! plain string or as a locale map, most fields may be `null`, and a galley's
//! remote flag is encoded as "is `urlRemote` non-empty". Everything is decoded
//! into explicit types here so the resolvers never touch raw JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locales tried in order before falling back to the first non-empty value.
const PREFERRED_LOCALES: &[&str] = &["en", "en_US", "en-US"];

/// A string the API may send plain or keyed by locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, Option<String>>),
}

impl LocalizedText {
    /// Resolve to a single string, preferring English.
    pub fn best(&self) -> Option<&str> {
        match self {
            LocalizedText::Plain(s) => Some(s.as_str()).filter(|s| !s.is_empty()),
            LocalizedText::Localized(map) => {
                let non_empty = |key: &str| {
                    map.get(key)
                        .and_then(|v| v.as_deref())
                        .filter(|s| !s.is_empty())
                };
                PREFERRED_LOCALES
                    .iter()
                    .find_map(|locale| non_empty(*locale))
                    .or_else(|| {
                        map.values()
                            .filter_map(|v| v.as_deref())
                            .find(|s| !s.is_empty())
                    })
            }
        }
    }
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

fn best_or_empty(text: &Option<LocalizedText>) -> String {
    text.as_ref()
        .and_then(LocalizedText::best)
        .unwrap_or_default()
        .to_string()
}

/// An article as listed in `GET /api/v1/issues/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: u64,
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub status: Option<u32>,
    #[serde(default)]
    pub status_label: Option<String>,
}

impl ArticleRecord {
    /// The publication resolution runs against: the first one listed.
    pub fn primary_publication(&self) -> Option<&Publication> {
        self.publications.first()
    }

    /// Human-readable status. Older OJS versions only send the numeric code.
    pub fn status_label(&self) -> String {
        if let Some(label) = self.status_label.as_deref().filter(|s| !s.is_empty()) {
            return label.to_string();
        }
        match self.status {
            Some(1) => "Queued",
            Some(3) => "Published",
            Some(4) => "Declined",
            Some(5) => "Scheduled",
            _ => "",
        }
        .to_string()
    }
}

/// One version of an article.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    #[serde(default)]
    pub full_title: Option<LocalizedText>,
    #[serde(default)]
    pub authors_string: Option<String>,
    #[serde(default)]
    pub galleys: Vec<Galley>,
    /// Landing page of the publication, used when no galley verifies.
    #[serde(default)]
    pub url_published: Option<String>,
}

impl Publication {
    pub fn title(&self) -> String {
        best_or_empty(&self.full_title)
    }

    pub fn authors(&self) -> &str {
        self.authors_string.as_deref().unwrap_or_default()
    }

    /// The fallback published URL, if the API sent a non-empty one.
    pub fn fallback_url(&self) -> Option<&str> {
        self.url_published.as_deref().filter(|u| !u.is_empty())
    }
}

/// Whether a galley's content lives in OJS or is only a link elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleyLocation {
    Hosted,
    /// `urlRemote` is set: the galley points at content OJS does not serve.
    Remote,
}

/// A published rendition (PDF, HTML, ...) of a publication.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawGalley")]
pub struct Galley {
    pub location: GalleyLocation,
    pub url_published: String,
    pub file: Option<FileDescriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGalley {
    #[serde(default)]
    url_remote: Option<String>,
    #[serde(default)]
    url_published: Option<String>,
    #[serde(default)]
    file: Option<serde_json::Value>,
}

impl From<RawGalley> for Galley {
    fn from(raw: RawGalley) -> Self {
        let location = match raw.url_remote.as_deref() {
            Some(remote) if !remote.trim().is_empty() => GalleyLocation::Remote,
            _ => GalleyLocation::Hosted,
        };
        // A descriptor that is not an object is dropped for this galley only.
        let file = raw
            .file
            .and_then(|value| serde_json::from_value::<FileDescriptor>(value).ok());
        Galley {
            location,
            url_published: raw.url_published.unwrap_or_default(),
            file,
        }
    }
}

/// The submission file attached to a galley.
///
/// The ids address the file's download URL; any of them may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub submission_id: Option<u64>,
    #[serde(default)]
    pub assoc_id: Option<u64>,
    #[serde(default)]
    pub url: String,
}

/// An issue as listed in `GET /api/v1/issues`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    #[serde(default)]
    pub identification: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub cover_image_url: Option<LocalizedText>,
}

impl Issue {
    pub fn description(&self) -> String {
        best_or_empty(&self.description)
    }

    pub fn cover_image(&self) -> String {
        best_or_empty(&self.cover_image_url)
    }

    /// Label used in progress output.
    pub fn label(&self) -> String {
        self.identification
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("issue {}", self.id))
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueList {
    #[serde(default)]
    pub items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
pub struct IssueDetail {
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_text_prefers_english() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"fr_CA": "Bonjour", "en_US": "Hello"}"#).unwrap();
        assert_eq!(text.best(), Some("Hello"));
    }

    #[test]
    fn localized_text_falls_back_to_first_non_empty() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"de": null, "en_US": "", "fr_CA": "Bonjour"}"#).unwrap();
        assert_eq!(text.best(), Some("Bonjour"));
    }

    #[test]
    fn localized_text_accepts_plain_string() {
        let text: LocalizedText = serde_json::from_str(r#""Plain title""#).unwrap();
        assert_eq!(text.best(), Some("Plain title"));
        assert_eq!(LocalizedText::default().best(), None);
    }

    #[test]
    fn galley_remote_flag_from_url_remote() {
        let remote: Galley = serde_json::from_str(
            r#"{"urlRemote": "https://elsewhere.org/x", "urlPublished": "https://j/a", "file": null}"#,
        )
        .unwrap();
        assert_eq!(remote.location, GalleyLocation::Remote);
        assert!(remote.file.is_none());

        let hosted: Galley =
            serde_json::from_str(r#"{"urlRemote": "", "urlPublished": "https://j/a"}"#).unwrap();
        assert_eq!(hosted.location, GalleyLocation::Hosted);
        assert_eq!(hosted.url_published, "https://j/a");
    }

    #[test]
    fn incomplete_file_descriptor_stays_with_its_galley() {
        let detail: IssueDetail = serde_json::from_str(
            r#"{"articles": [
                {"id": 1, "publications": [{"galleys": [{
                    "urlPublished": "https://j.org/paj/article/view/1/2",
                    "file": {"id": 3, "submissionId": 1, "assocId": 2, "url": "https://j.org/f.pdf"}
                }]}]},
                {"id": 2, "publications": [{"galleys": [
                    {"urlPublished": "https://j.org/paj/article/view/2/5",
                     "file": {"id": 6, "submissionId": 2, "assocId": null, "url": "https://j.org/g.pdf"}},
                    {"urlPublished": "https://j.org/paj/article/view/2/7",
                     "file": {"url": "https://j.org/h.pdf"}},
                    {"urlPublished": "https://j.org/paj/article/view/2/8",
                     "file": "unexpected"}
                ]}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(detail.articles.len(), 2);

        let healthy = &detail.articles[0].primary_publication().unwrap().galleys[0];
        assert_eq!(healthy.file.as_ref().unwrap().assoc_id, Some(2));

        let galleys = &detail.articles[1].primary_publication().unwrap().galleys;
        assert_eq!(galleys.len(), 3);
        let null_assoc = galleys[0].file.as_ref().unwrap();
        assert_eq!(null_assoc.assoc_id, None);
        assert_eq!(null_assoc.url, "https://j.org/g.pdf");
        let url_only = galleys[1].file.as_ref().unwrap();
        assert_eq!((url_only.id, url_only.submission_id), (None, None));
        assert!(galleys[2].file.is_none());
    }

    #[test]
    fn article_without_publications_has_no_primary() {
        let article: ArticleRecord = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert!(article.primary_publication().is_none());
        assert_eq!(article.status_label(), "");
    }

    #[test]
    fn status_label_derived_from_code() {
        let article: ArticleRecord = serde_json::from_str(r#"{"id": 1, "status": 3}"#).unwrap();
        assert_eq!(article.status_label(), "Published");

        let labelled: ArticleRecord =
            serde_json::from_str(r#"{"id": 1, "status": 3, "statusLabel": "Publié"}"#).unwrap();
        assert_eq!(labelled.status_label(), "Publié");
    }

    #[test]
    fn parse_issue_detail_fixture() {
        let detail: IssueDetail =
            serde_json::from_str(include_str!("../fixtures/ojs/issue-7.json")).unwrap();
        assert_eq!(detail.articles.len(), 2);

        let first = &detail.articles[0];
        let publication = first.primary_publication().unwrap();
        assert_eq!(publication.title(), "Staging the Archive");
        assert_eq!(publication.authors(), "Ada Byron, Grace Hopper");
        assert_eq!(publication.galleys.len(), 2);
        let file = publication.galleys[0].file.as_ref().unwrap();
        assert_eq!(
            (file.submission_id, file.assoc_id, file.id),
            (Some(46), Some(40), Some(112))
        );
        assert_eq!(publication.galleys[1].location, GalleyLocation::Remote);

        assert!(detail.articles[1].primary_publication().is_none());
    }

    #[test]
    fn parse_issue_list_fixture() {
        let list: IssueList =
            serde_json::from_str(include_str!("../fixtures/ojs/issues.json")).unwrap();
        assert_eq!(list.items.len(), 2);
        let issue = &list.items[0];
        assert_eq!(issue.label(), "Vol. 3 No. 1 (2021)");
        assert_eq!(issue.cover_image(), "https://journal.example.org/public/cover_7.png");
        assert_eq!(issue.description(), "Spring issue");
        assert_eq!(list.items[1].label(), "issue 8");
    }
}
