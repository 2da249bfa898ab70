//! websift: CLI batch scraper producing title/link/meta records as JSON or CSV.

pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod markup;
pub mod model;
pub mod pipeline;
pub mod sink;

// Re-exports for CLI and consumers.
pub use config::ScrapeConfig;
pub use extract::{extract, ExtractRules};
pub use fetch::{Deadline, Fetch, FetchError, FetchedPage, HttpFetcher, RateGate};
pub use markup::{scan, MarkupVisitor};
pub use model::{PageRecord, ScrapeOutcome};
pub use pipeline::{run, scrape_all, PipelineError, RunOptions};
pub use sink::{write_outcomes, OutputFormat, SinkError};
