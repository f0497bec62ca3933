//! # ojs-harvest
//!
//! Harvests the articles of an Open Journal Systems (OJS) journal into flat,
//! repository-ready records: Dublin Core metadata from the journal's OAI-PMH
//! endpoint plus an asset bundle (original file and thumbnail) per article.
//!
//! # Architecture
//!
//! ```text
//! journal API ─→ issues ─→ articles ─┬─ metadata   (OAI-PMH GetRecord → Dublin Core)
//!                                    └─ galley     (first reachable rendition)
//!                                         └─ bundle   (original + thumbnail)
//!                                              └─ thumbnail (IIIF image service)
//! ```
//!
//! Every step that talks to the outside world does so through an injected
//! capability: [`transport::Transport`] for HTTP, [`storage::Filesystem`]
//! for the output directory, [`imaging::Rasterizer`] for local thumbnails.
//! The resolvers are plain functions over those traits, so the whole engine
//! runs against scripted fakes in tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`metadata`] | OAI-PMH `GetRecord` request and namespaced `oai_dc` parsing |
//! | [`galley`] | Ordered probe-and-verify scan over a publication's galleys |
//! | [`bundle`] | Turns the selected galley into an (original, thumbnail) pair |
//! | [`thumbnail`] | IIIF thumbnail URL derivation and reachability probe |
//! | [`imaging`] | Local page-one rendering of downloaded files via pdfium |
//! | [`engine`] | Per-article composition into an [`engine::ArticleRow`] |
//! | [`harvest`] | Parallel batch over articles with per-article failure isolation |
//! | [`journal`] | Journal REST API client and issue records |
//! | [`output`] | `issues.csv` / `articles.csv` writers and terminal summaries |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Journal API payloads decoded into explicit types |
//! | [`transport`] | HTTP seam and the blocking `reqwest` implementation |
//! | [`storage`] | Filesystem seam and the local implementation |
//!
//! # Failure Model
//!
//! Most things that go wrong degrade instead of failing. An unreachable or
//! broken OAI endpoint yields empty Dublin Core fields; an unreachable galley
//! is skipped; an image service without a thumbnail yields the journal's
//! default thumbnail. Only the local download-and-render branch of the bundle
//! step can fail an article, and [`harvest`] contains that failure to the one
//! article.

pub mod bundle;
pub mod config;
pub mod engine;
pub mod galley;
pub mod harvest;
pub mod imaging;
pub mod journal;
pub mod metadata;
pub mod output;
pub mod storage;
pub mod thumbnail;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
