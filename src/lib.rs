//! # Event Scout
//!
//! A context-aware event recommendation service.
//!
//! Event Scout answers free-text queries ("I want something fun in
//! December") with up to three entries from a fixed event catalog, by
//! combining lightweight context detection with semantic similarity
//! ranking over precomputed embeddings.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────┐
//!  events.xlsx ──▶│    Catalog      │── descriptions ──┐
//!                 │ (loaded once)   │                  ▼
//!                 └───────┬────────┘          ┌────────────────┐
//!                         │ month filter      │   Embedder      │
//!  query ──▶ month ───────┘                   │ (startup cache  │
//!    │       detect                           │  + per query)   │
//!    ├─────▶ sentiment ──▶ threshold          └───────┬────────┘
//!    │                                                │
//!    └────────────────────────────▶ ranking ◀─────────┘
//!                                      │
//!                              top-3 above threshold
//!                                      │
//!                              ┌───────┴───────┐
//!                              ▼               ▼
//!                          ┌───────┐      ┌────────┐
//!                          │  CLI  │      │  HTTP  │
//!                          │ (evs) │      │ server │
//!                          └───────┘      └────────┘
//! ```
//!
//! The sentiment class influences exactly one thing: which similarity
//! threshold applies (positive 0.4, neutral 0.3, negative 0.5). Catalog
//! embeddings are computed once at startup; month-filtered requests index
//! into that cache instead of re-embedding the subset.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`catalog`] | Workbook loading and month filtering |
//! | [`month`] | Lexical month detection |
//! | [`sentiment`] | Sentiment classifiers and the threshold mapping |
//! | [`embedding`] | Embedding backends and cosine similarity |
//! | [`net`] | Shared retry/backoff plumbing for remote backends |
//! | [`rank`] | Threshold filtering and top-k selection |
//! | [`engine`] | The per-process pipeline context |
//! | [`server`] | HTTP server |

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod models;
pub mod month;
pub mod net;
pub mod rank;
pub mod sentiment;
pub mod server;
