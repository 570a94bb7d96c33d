//! # Metaseek
//!
//! A resilient metasearch core: web search with a sequential fallback
//! cascade over heterogeneous engine adapters, plus concurrent fan-out
//! aggregators for image search and in-page video discovery.
//!
//! The design rests on a few rules:
//!
//! - **Uniform adapter contract**: every engine, whether a JSON API, an HTML
//!   scrape, or a headless render, answers with the same response shape.
//! - **Classified failures**: every failed attempt collapses to one
//!   canonical `{PREFIX}_{REASON}` code that drives retry-or-escalate.
//! - **Degrade, never throw**: public entry points return empty results and
//!   an audit trail instead of errors.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use metaseek::prelude::*;
//!
//! let service = Metaseek::with_defaults();
//! let outcome = service.search("golden retriever puppies").await;
//! for hit in &outcome.results {
//!     println!("{} {}", hit.title, hit.url);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregate;
pub mod canonical;
pub mod cascade;
pub mod classify;
pub mod config;
pub mod engines;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod observability;
pub mod records;
pub mod service;
pub mod testing;

#[cfg(feature = "browser")]
pub mod session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::{ImageAggregator, VideoAggregator};
    pub use crate::cascade::Cascade;
    pub use crate::classify::{classify, Reason};
    pub use crate::config::{
        AggregatorConfig, CascadeConfig, EnginesConfig, FetchConfig, MetaseekConfig,
    };
    pub use crate::engines::{build_engines, Engine};
    pub use crate::errors::MetaseekError;
    pub use crate::records::{
        CascadeLog, EngineResponse, ImageRecord, SearchHit, SearchOutcome, VideoRecord,
    };
    pub use crate::service::Metaseek;
}

pub use service::Metaseek;
