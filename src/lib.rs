//! # sitelens - Concurrent Site Analysis for Large URL Lists
//!
//! This crate enriches a list of web-form URLs with derived metadata: the page
//! language, a bounded summary of the homepage content, HTTP reachability and
//! the platforms/technologies the site is built on.
//!
//! ## Features
//!
//! - Static HTTP fetching with an optional headless-browser render for
//!   script-only pages
//! - Layered content extraction (readability first, heuristic walk second)
//!   with an advertising/tracking region filter
//! - Declarative signature matching merged with an external detector
//! - Chunked abstractive summarization with an extractive fallback
//! - Bounded-concurrency batch orchestration with per-URL fault isolation
//!   and periodic checkpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitelens::batch::{BatchConfig, BatchOrchestrator};
//! use sitelens::model::mock_model::MockCompletionModel;
//! use sitelens::summarizer::Summarizer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summarizer = Summarizer::<MockCompletionModel>::extractive_only(Default::default());
//!     let orchestrator = BatchOrchestrator::builder(summarizer)
//!         .config(BatchConfig::builder().concurrency(10).build())
//!         .build()?;
//!
//!     let urls = vec!["https://example.com".to_string()];
//!     let output = orchestrator.run(&urls).await;
//!     for record in output.expand() {
//!         println!("{} -> {:?}", record.url, record.platforms);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

pub mod batch;
pub mod classifier;
pub mod extractor;
pub mod fetcher;
pub mod language;
pub mod summarizer;

pub use error::{Error, SiteError};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::error::SiteError;
}
