//! Per-article resolution: metadata and bundle composed into one [`ArticleRow`].
//!
//! ```text
//! ArticleRecord ─┬─ metadata::resolve ──────────────────────────┐
//!                └─ galley::resolve ─→ BundleAssembler::assemble ┴─→ ArticleRow
//!                                          └─ thumbnail::resolve
//! ```
//!
//! Metadata and galley resolution are independent of each other. Everything
//! on the metadata, galley and thumbnail paths degrades to a best-effort
//! value; only the bundle's local download/render branch and a record with
//! no publication can fail an article.

use crate::bundle::{AssetBundle, BundleAssembler, BundleError};
use crate::galley;
use crate::config::{ConfigError, HarvestConfig};
use crate::imaging::{Quality, Rasterizer, Sharpening, THUMBNAIL_WIDTH, ThumbnailConfig};
use crate::metadata;
use crate::storage::Filesystem;
use crate::transport::Transport;
use crate::types::ArticleRecord;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub const ENTITY_TYPE: &str = "Publication";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("article {0} has no publication")]
    NoPublication(u64),
    #[error("bundle failed: {source}")]
    Bundle {
        id: u64,
        #[source]
        source: BundleError,
    },
}

impl ResolveError {
    pub fn article_id(&self) -> u64 {
        match self {
            ResolveError::NoPublication(id) | ResolveError::Bundle { id, .. } => *id,
        }
    }
}

/// The flat per-article record, keyed by repository column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleRow {
    #[serde(rename = "bundle:ORIGINAL")]
    pub original: String,
    #[serde(rename = "bundle:THUMBNAIL")]
    pub thumbnail: String,
    #[serde(rename = "dc.title")]
    pub title: String,
    #[serde(rename = "dc.creator")]
    pub creator: String,
    #[serde(rename = "dc.date")]
    pub date: String,
    #[serde(rename = "dc.source")]
    pub source: String,
    #[serde(rename = "dc.subject")]
    pub subject: String,
    #[serde(rename = "dspace.entity.type")]
    pub entity_type: String,
    #[serde(rename = "dc.description.status")]
    pub status: String,
    #[serde(rename = "relation.isIssueOfPublication")]
    pub issue_relation: String,
}

/// A successfully resolved article. `Unresolved` rows had no reachable
/// galley and no fallback URL, so their bundle columns are placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Resolved(ArticleRow),
    Unresolved(ArticleRow),
}

impl ArticleOutcome {
    pub fn row(&self) -> &ArticleRow {
        match self {
            ArticleOutcome::Resolved(row) | ArticleOutcome::Unresolved(row) => row,
        }
    }

    pub fn into_row(self) -> ArticleRow {
        match self {
            ArticleOutcome::Resolved(row) | ArticleOutcome::Unresolved(row) => row,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ArticleOutcome::Resolved(_))
    }
}

/// Per-journal values the engine passes through.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub oai_endpoint: String,
    pub image_service: String,
    pub output_dir: PathBuf,
    /// Thumbnail used whenever the image service has none. May be empty.
    pub default_thumbnail: String,
    pub thumbnails: ThumbnailConfig,
}

impl EngineSettings {
    /// Settings for the journal `name`, combined with the shared harvest settings.
    pub fn from_config(config: &HarvestConfig, name: &str) -> Result<Self, ConfigError> {
        let journal = config.journal(name)?;
        Ok(Self {
            oai_endpoint: journal.oai_endpoint(),
            image_service: config.harvest.image_service.clone(),
            output_dir: journal.output_dir(name),
            default_thumbnail: journal.default_thumbnail.clone(),
            thumbnails: ThumbnailConfig {
                width: THUMBNAIL_WIDTH,
                quality: Quality::new(config.thumbnails.quality),
                sharpening: config.thumbnails.sharpen.then(Sharpening::light),
            },
        })
    }
}

/// Resolves articles against injected transport, filesystem and rasterizer.
pub struct Engine<'a, T, F, R> {
    transport: &'a T,
    fs: &'a F,
    rasterizer: &'a R,
    settings: &'a EngineSettings,
}

impl<'a, T: Transport, F: Filesystem, R: Rasterizer> Engine<'a, T, F, R> {
    pub fn new(transport: &'a T, fs: &'a F, rasterizer: &'a R, settings: &'a EngineSettings) -> Self {
        Self {
            transport,
            fs,
            rasterizer,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        self.settings
    }

    pub fn resolve_article(&self, article: &ArticleRecord) -> Result<ArticleOutcome, ResolveError> {
        let publication = article
            .primary_publication()
            .ok_or(ResolveError::NoPublication(article.id))?;

        let record = metadata::resolve(self.transport, article.id, &self.settings.oai_endpoint);
        let selection = galley::resolve(self.transport, publication);

        let assembler = BundleAssembler {
            transport: self.transport,
            fs: self.fs,
            rasterizer: self.rasterizer,
            image_service: &self.settings.image_service,
            output_dir: &self.settings.output_dir,
            thumbnails: self.settings.thumbnails.clone(),
        };
        let bundle = assembler
            .assemble(&selection, &self.settings.default_thumbnail)
            .map_err(|source| ResolveError::Bundle {
                id: article.id,
                source,
            })?;

        let title = match record.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => publication.title(),
        };
        let AssetBundle {
            original,
            thumbnail,
            kind,
        } = bundle;

        let row = ArticleRow {
            original,
            thumbnail,
            title,
            creator: record.creator_field(),
            date: record.date.clone().unwrap_or_default(),
            source: record.source.clone().unwrap_or_default(),
            subject: record.subject_field(),
            entity_type: ENTITY_TYPE.to_string(),
            status: article.status_label(),
            issue_relation: String::new(),
        };

        if selection.is_empty() {
            warn!(article = article.id, "no reachable galley and no published URL");
            Ok(ArticleOutcome::Unresolved(row))
        } else {
            info!(article = article.id, %kind, "resolved");
            Ok(ArticleOutcome::Resolved(row))
        }
    }
}
