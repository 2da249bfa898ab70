//! Batch orchestration: URLs in, one outcome per URL out, results written
//! once at the end.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ScrapeConfig};
use crate::extract;
use crate::fetch::{Deadline, Fetch, HttpFetcher, RateGate};
use crate::model::ScrapeOutcome;
use crate::sink::{self, SinkError};

/// Per-run knobs that are not configuration: a `(current, total)` progress
/// callback and an optional externally armed deadline.
#[derive(Default)]
pub struct RunOptions<'a> {
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    pub deadline: Option<Deadline>,
}

/// Failures that abort a whole run. Per-URL fetch failures never appear
/// here; they become outcome entries instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0}")]
    Sink(#[from] SinkError),
}

/// Scrape every URL and write the collected outcomes to the configured
/// destination.
///
/// Produces exactly one outcome per input URL, in input order, no matter
/// how many URLs fail. The run itself only fails for invalid config,
/// client construction, or the final write.
pub fn run(
    urls: &[String],
    config: &ScrapeConfig,
    options: &RunOptions<'_>,
) -> Result<Vec<ScrapeOutcome>, PipelineError> {
    config.validate()?;
    let deadline = options.deadline.or_else(|| {
        config
            .run_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(Deadline::after)
    });
    let gate = Arc::new(RateGate::new(config.delay()));
    let mut fetcher = HttpFetcher::new(config, gate)?.with_deadline(deadline);
    let resolved = RunOptions {
        progress: options.progress,
        deadline,
    };
    let outcomes = scrape_all(&mut fetcher, urls, &resolved);
    sink::write_outcomes(&outcomes, config)?;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        "Wrote {} result(s) to {} ({} failed)",
        outcomes.len(),
        config.output_path.display(),
        failed
    );
    Ok(outcomes)
}

/// Map URLs to outcomes with a caller-supplied fetcher. Never fails; every
/// URL yields exactly one outcome, in order. Once the deadline expires the
/// remaining URLs are recorded as failures without being fetched.
pub fn scrape_all<F: Fetch>(
    fetcher: &mut F,
    urls: &[String],
    options: &RunOptions<'_>,
) -> Vec<ScrapeOutcome> {
    let total = urls.len() as u32;
    let mut outcomes = Vec::with_capacity(urls.len());
    for (index, url) in urls.iter().enumerate() {
        if let Some(progress) = options.progress {
            progress(index as u32 + 1, total);
        }
        if options.deadline.map_or(false, |d| d.expired()) {
            warn!("Run deadline exceeded; skipping fetch for {}", url);
            outcomes.push(ScrapeOutcome::failure(
                url,
                format!("Run deadline exceeded before fetching: {url}"),
            ));
            continue;
        }
        outcomes.push(scrape_one(fetcher, url));
    }
    outcomes
}

/// Fetch one URL and extract its record; any fetch failure becomes the
/// outcome's error string.
pub fn scrape_one<F: Fetch>(fetcher: &mut F, url: &str) -> ScrapeOutcome {
    info!("Scraping {}", url);
    match fetcher.fetch(url) {
        Ok(page) => {
            let record = extract::extract(&page.body, None);
            info!(
                "Scraped {} (HTTP {}, {} links)",
                url,
                page.status,
                record.links.len()
            );
            ScrapeOutcome::success(url, page.status, record)
        }
        Err(e) => {
            error!("Failed to scrape {}: {}", url, e);
            ScrapeOutcome::failure(url, e.to_string())
        }
    }
}
