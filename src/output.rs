//! CSV files and terminal summaries.
//!
//! # Files
//!
//! A harvest writes two CSVs into the journal's output directory, next to
//! the `originals/` and `thumbnails/` directories the bundle step fills:
//!
//! ```text
//! output/paj/
//! ├── issues.csv       # one IssueRow per issue
//! ├── articles.csv     # one ArticleRow per harvested article
//! ├── originals/       # downloaded files the image service cannot render
//! └── thumbnails/      # page-one renders of those files
//! ```
//!
//! Both CSVs always carry their header row, even with no data rows.
//!
//! # Summaries
//!
//! ```text
//! Issues
//! 001 Performance Arts Journal: Vol. 3 No. 1 (2021)
//!     Published: 2021-04-15
//! 002 Performance Arts Journal: Vol. 3 No. 2 (2021)
//!
//! Harvested 2 issues, 14 articles (1 skipped, 1 failed)
//!     issue 9: Journal API ... answered HTTP 500
//!     article 48: bundle failed: Download of https://... answered HTTP 404
//! → output/paj/issues.csv
//! → output/paj/articles.csv
//! ```
//!
//! Each summary has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::engine::ArticleRow;
use crate::harvest::HarvestReport;
use crate::journal::IssueRow;
use crate::storage::Filesystem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ISSUES_CSV: &str = "issues.csv";
pub const ARTICLES_CSV: &str = "articles.csv";

pub const ISSUE_COLUMNS: [&str; 7] = [
    "bundle:THUMBNAIL",
    "dcterms.available",
    "dc.description",
    "dc.title",
    "dc.identifier",
    "dc.created",
    "dcterms.type",
];

pub const ARTICLE_COLUMNS: [&str; 10] = [
    "bundle:ORIGINAL",
    "bundle:THUMBNAIL",
    "dc.title",
    "dc.creator",
    "dc.date",
    "dc.source",
    "dc.subject",
    "dspace.entity.type",
    "dc.description.status",
    "relation.isIssueOfPublication",
];

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
    #[error("Writing {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn to_csv<S: Serialize>(columns: &[&str], rows: &[S]) -> Result<Vec<u8>, OutputError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Buffer(e.to_string()))
}

fn write_csv<S: Serialize>(
    fs: &impl Filesystem,
    dir: &Path,
    file_name: &str,
    columns: &[&str],
    rows: &[S],
) -> Result<PathBuf, OutputError> {
    let bytes = to_csv(columns, rows)?;
    let path = dir.join(file_name);
    fs.ensure_dir(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs.write(&path, &bytes).map_err(|source| OutputError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write `issues.csv` into `dir`.
pub fn write_issues(
    fs: &impl Filesystem,
    dir: &Path,
    rows: &[IssueRow],
) -> Result<PathBuf, OutputError> {
    write_csv(fs, dir, ISSUES_CSV, &ISSUE_COLUMNS, rows)
}

/// Write `articles.csv` into `dir`.
pub fn write_articles(
    fs: &impl Filesystem,
    dir: &Path,
    rows: &[ArticleRow],
) -> Result<PathBuf, OutputError> {
    write_csv(fs, dir, ARTICLES_CSV, &ARTICLE_COLUMNS, rows)
}

// ============================================================================
// Summaries
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Format the issue listing.
pub fn format_issues(rows: &[IssueRow]) -> Vec<String> {
    let mut lines = vec!["Issues".to_string()];
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), row.title));
        if !row.available.is_empty() {
            lines.push(format!("    Published: {}", row.available));
        }
    }
    if rows.is_empty() {
        lines.push("    (none)".to_string());
    }
    lines
}

pub fn print_issues(rows: &[IssueRow]) {
    for line in format_issues(rows) {
        println!("{}", line);
    }
}

/// Format the end-of-harvest summary.
pub fn format_harvest_report(report: &HarvestReport, written: &[PathBuf]) -> Vec<String> {
    let articles = &report.articles;
    let mut lines = Vec::new();

    let mut detail = Vec::new();
    if !articles.skipped.is_empty() {
        detail.push(format!("{} skipped", articles.skipped.len()));
    }
    if !articles.failures.is_empty() {
        detail.push(format!("{} failed", articles.failures.len()));
    }
    let detail = if detail.is_empty() {
        String::new()
    } else {
        format!(" ({})", detail.join(", "))
    };
    lines.push(format!(
        "Harvested {} issues, {} articles{}",
        report.issues.len(),
        articles.rows.len(),
        detail
    ));

    for failure in &report.failed_issues {
        lines.push(format!("    issue {}: {}", failure.issue_id, failure.reason));
    }
    for failure in &articles.failures {
        lines.push(format!("    article {}: {}", failure.article_id, failure.reason));
    }
    for path in written {
        lines.push(format!("\u{2192} {}", path.display()));
    }
    lines
}

pub fn print_harvest_report(report: &HarvestReport, written: &[PathBuf]) {
    for line in format_harvest_report(report, written) {
        println!("{}", line);
    }
}
