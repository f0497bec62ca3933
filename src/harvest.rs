//! Batch harvesting: every issue of a journal, every article of an issue.
//!
//! Articles within an issue are resolved in parallel with rayon. Each worker
//! returns its article's result and the results are merged, in article order,
//! once the whole issue is done; no worker appends to shared output.
//!
//! One article failing (no publication, a failed download or render) never
//! stops the batch. The failure is logged and recorded in the report, and the
//! article is left out of the rows.

use crate::engine::{ArticleOutcome, ArticleRow, Engine};
use crate::imaging::Rasterizer;
use crate::journal::{IssueRow, JournalClient, JournalError};
use crate::storage::Filesystem;
use crate::transport::Transport;
use crate::types::ArticleRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// What to do with an article that has neither a reachable galley nor a
/// published URL to fall back on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyBundlePolicy {
    /// Keep the row with empty bundle columns.
    #[default]
    Emit,
    /// Leave the article out of the output.
    Skip,
}

/// An article that could not be harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFailure {
    pub article_id: u64,
    pub reason: String,
}

/// Merged result of one batch of articles.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: Vec<ArticleRow>,
    pub failures: Vec<ArticleFailure>,
    /// Unresolved articles dropped by [`EmptyBundlePolicy::Skip`].
    pub skipped: Vec<u64>,
}

impl BatchReport {
    fn merge(&mut self, other: BatchReport) {
        self.rows.extend(other.rows);
        self.failures.extend(other.failures);
        self.skipped.extend(other.skipped);
    }
}

/// An issue whose article list could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFailure {
    pub issue_id: u64,
    pub reason: String,
}

/// Everything a journal harvest produced.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub issues: Vec<IssueRow>,
    pub articles: BatchReport,
    pub failed_issues: Vec<IssueFailure>,
}

/// Resolve a batch of articles, isolating per-article failures.
pub fn harvest_articles<T, F, R>(
    engine: &Engine<'_, T, F, R>,
    articles: &[ArticleRecord],
    policy: EmptyBundlePolicy,
) -> BatchReport
where
    T: Transport,
    F: Filesystem,
    R: Rasterizer,
{
    let results: Vec<_> = articles
        .par_iter()
        .map(|article| (article.id, engine.resolve_article(article)))
        .collect();

    let mut report = BatchReport::default();
    for (article_id, result) in results {
        match result {
            Ok(ArticleOutcome::Resolved(row)) => report.rows.push(row),
            Ok(ArticleOutcome::Unresolved(row)) => match policy {
                EmptyBundlePolicy::Emit => report.rows.push(row),
                EmptyBundlePolicy::Skip => {
                    info!(article = article_id, "skipping article with empty bundle");
                    report.skipped.push(article_id);
                }
            },
            Err(e) => {
                error!(article = article_id, "article failed: {e}");
                report.failures.push(ArticleFailure {
                    article_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}

/// Issue rows for every issue the journal lists.
pub fn collect_issues<T: Transport>(
    client: &JournalClient<'_, T>,
    journal_title: &str,
) -> Result<Vec<IssueRow>, JournalError> {
    Ok(client
        .issues()?
        .iter()
        .map(|issue| IssueRow::from_issue(issue, journal_title))
        .collect())
}

/// Harvest every issue of a journal.
///
/// Listing the issues must succeed; an issue whose articles cannot be
/// fetched is recorded and skipped.
pub fn harvest_journal<T, F, R>(
    client: &JournalClient<'_, T>,
    engine: &Engine<'_, T, F, R>,
    journal_title: &str,
    policy: EmptyBundlePolicy,
) -> Result<HarvestReport, JournalError>
where
    T: Transport,
    F: Filesystem,
    R: Rasterizer,
{
    let issues = client.issues()?;
    let mut report = HarvestReport::default();

    for issue in &issues {
        report.issues.push(IssueRow::from_issue(issue, journal_title));

        let articles = match client.issue_articles(issue.id) {
            Ok(articles) => articles,
            Err(e) => {
                warn!(issue = issue.id, "cannot list articles: {e}");
                report.failed_issues.push(IssueFailure {
                    issue_id: issue.id,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        info!(issue = %issue.label(), articles = articles.len(), "harvesting issue");
        report
            .articles
            .merge(harvest_articles(engine, &articles, policy));
    }

    Ok(report)
}
