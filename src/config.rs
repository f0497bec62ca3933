//! Harvest configuration.
//!
//! Loaded from a single `config.toml` (path chosen with `--config`). User
//! values are merged on top of stock defaults, unknown keys are rejected,
//! and the merged result is validated before anything touches the network.
//!
//! ## Configuration Options
//!
//! ```toml
//! [harvest]
//! image_service = "http://localhost:8182/iiif/2"  # IIIF Image API base URL
//! empty_bundle = "emit"     # or "skip": articles with nothing to deposit
//!
//! [thumbnails]
//! quality = 85              # JPEG quality of locally rendered thumbnails (1-100)
//! sharpen = true            # Light unsharp mask after downscaling
//! # pdfium_library = "/opt/pdfium/lib"   # Directory holding libpdfium
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [journals.paj]
//! url = "https://journal.example.org/index.php/paj"
//! token = "..."
//! oai_endpoint = "https://journal.example.org/index.php/paj/oai"   # default: {url}/oai
//! output_directory = "output/paj"                                  # default: output/{name}
//! journal_title = "Performance Arts Journal"
//! default_thumbnail = ""
//! publisher = "Performance Arts Press"   # descriptive, carried but unread
//! ```
//!
//! Unknown keys are rejected to catch typos early, except inside a
//! `[journals.<name>]` table: extra keys there are the journal's descriptive
//! fields and pass through untouched.

use crate::harvest::EmptyBundlePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("No journal named '{name}' in config (known: {known})")]
    UnknownJournal { name: String, known: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    pub harvest: HarvestSettings,
    pub thumbnails: ThumbnailsConfig,
    pub processing: ProcessingConfig,
    /// Journals by short name.
    pub journals: BTreeMap<String, JournalConfig>,
}

impl HarvestConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("harvest.image_service", &self.harvest.image_service)?;
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (name, journal) in &self.journals {
            require_url(&format!("journals.{name}.url"), &journal.url)?;
            if let Some(endpoint) = &journal.oai_endpoint {
                require_url(&format!("journals.{name}.oai_endpoint"), endpoint)?;
            }
        }
        Ok(())
    }

    /// Look up a journal by name.
    pub fn journal(&self, name: &str) -> Result<&JournalConfig, ConfigError> {
        self.journals
            .get(name)
            .ok_or_else(|| ConfigError::UnknownJournal {
                name: name.to_string(),
                known: if self.journals.is_empty() {
                    "none".to_string()
                } else {
                    self.journals.keys().cloned().collect::<Vec<_>>().join(", ")
                },
            })
    }
}

fn require_url(key: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if url.host_str().is_some() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{key} must be an absolute URL with a host, got '{value}'"
        ))),
    }
}

/// Settings shared by every journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestSettings {
    /// IIIF Image API base URL used for remote thumbnails.
    pub image_service: String,
    /// Articles with no reachable galley and no published URL.
    pub empty_bundle: EmptyBundlePolicy,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            image_service: "http://localhost:8182/iiif/2".to_string(),
            empty_bundle: EmptyBundlePolicy::Emit,
        }
    }
}

/// Locally rendered thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// JPEG quality (1-100).
    pub quality: u32,
    pub sharpen: bool,
    /// Directory holding the pdfium shared library. System search path when absent.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            sharpen: true,
            pdfium_library: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of articles resolved in parallel.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// One journal to harvest.
///
/// Keys other than the ones below are the journal's descriptive fields
/// (publisher, ISSN, ...). They are kept in [`JournalConfig::descriptive`]
/// and never read by the harvest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal base URL; the REST API lives under `{url}/api/v1`.
    pub url: String,
    /// API token sent as a bearer credential. Empty for anonymous access.
    #[serde(default)]
    pub token: String,
    /// OAI-PMH endpoint. Defaults to `{url}/oai`.
    #[serde(default)]
    pub oai_endpoint: Option<String>,
    /// Where CSVs, originals and thumbnails are written. Defaults to `output/{name}`.
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    /// Prefix of every issue title.
    #[serde(default)]
    pub journal_title: String,
    /// Thumbnail reference used when the image service has none.
    #[serde(default)]
    pub default_thumbnail: String,
    #[serde(flatten)]
    pub descriptive: BTreeMap<String, toml::Value>,
}

impl JournalConfig {
    pub fn oai_endpoint(&self) -> String {
        match &self.oai_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/oai", self.url.trim_end_matches('/')),
        }
    }

    pub fn output_dir(&self, name: &str) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| Path::new("output").join(name))
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(HarvestConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HarvestConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HarvestConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over stock defaults and validated.
///
/// A missing file yields the stock defaults, which define no journals.
pub fn load_config(path: &Path) -> Result<HarvestConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ojs-harvest configuration
# ========================
# Values shown below are the defaults, except for the example journal.
# Unknown keys will cause an error, except in [journals.*] tables where
# extra keys are kept as descriptive fields and otherwise ignored.

# ---------------------------------------------------------------------------
# Harvest
# ---------------------------------------------------------------------------
[harvest]
# IIIF Image API base URL. Thumbnails are requested as
#   {image_service}/{base64url(file URL)};1/full/159,/0/default.jpg
image_service = "http://localhost:8182/iiif/2"

# Articles with no reachable galley and no published URL:
#   "emit" writes them with empty bundle columns, "skip" leaves them out.
empty_bundle = "emit"

# ---------------------------------------------------------------------------
# Local thumbnails (files the image service cannot serve)
# ---------------------------------------------------------------------------
[thumbnails]
# JPEG quality (1 = worst, 100 = best).
quality = 85

# Light unsharp mask after downscaling.
sharpen = true

# Directory holding the pdfium shared library.
# Omit to use the system library search path.
# pdfium_library = "/opt/pdfium/lib"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum articles resolved in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Journals (one table per journal, selected with --journal NAME)
# ---------------------------------------------------------------------------
# [journals.paj]
# url = "https://journal.example.org/index.php/paj"
# token = "your-api-token"
# oai_endpoint = "https://journal.example.org/index.php/paj/oai"
# output_directory = "output/paj"
# journal_title = "Performance Arts Journal"
# default_thumbnail = ""
# publisher = "Performance Arts Press"
"##
}
