//! Data model for scrape results.
//!
//! One [`ScrapeOutcome`] per input URL, success or not; [`PageRecord`] is the
//! extracted payload. The sink serializes these shapes as-is, so field names
//! here are the output contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured data pulled from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Trimmed `<title>` text, empty if the page had none.
    pub title: String,
    /// Every `href` of every `<a>` tag, document order, verbatim values,
    /// duplicates kept.
    pub links: Vec<String>,
    /// `<meta name content>` pairs; later tags overwrite earlier ones.
    pub meta: BTreeMap<String, String>,
}

/// Result of processing one URL.
///
/// Exactly one of `data` and `error` is set; `status` is the HTTP status of
/// the successful response, a convenience marker rather than anything
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub status: Option<u16>,
    pub data: Option<PageRecord>,
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn success(url: impl Into<String>, status: u16, data: PageRecord) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn sample_record() -> PageRecord {
        PageRecord {
            title: "Example Domain".to_string(),
            links: vec!["/a".to_string(), "/b".to_string(), "/a".to_string()],
            meta: BTreeMap::from([("description".to_string(), "An example page".to_string())]),
        }
    }

    #[test]
    fn success_outcome_serializes_with_null_error() -> Result<(), Box<dyn Error>> {
        let outcome = ScrapeOutcome::success("https://example.com/", 200, sample_record());
        let json = serde_json::to_string(&outcome)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        let obj = value.as_object().expect("root must be object");
        assert_eq!(obj["url"].as_str(), Some("https://example.com/"));
        assert_eq!(obj["status"].as_u64(), Some(200));
        assert!(obj["error"].is_null());
        let data = obj["data"].as_object().expect("data must be object");
        assert_eq!(data["title"].as_str(), Some("Example Domain"));
        assert_eq!(
            data["links"].as_array().map(|links| links.len()),
            Some(3),
            "duplicate links must survive serialization"
        );
        assert_eq!(data["meta"]["description"].as_str(), Some("An example page"));
        Ok(())
    }

    #[test]
    fn failure_outcome_serializes_with_null_data_and_status() -> Result<(), Box<dyn Error>> {
        let outcome = ScrapeOutcome::failure("https://example.com/down", "boom");
        let json = serde_json::to_string(&outcome)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        let obj = value.as_object().expect("root must be object");
        assert!(obj["status"].is_null());
        assert!(obj["data"].is_null());
        assert_eq!(obj["error"].as_str(), Some("boom"));
        Ok(())
    }

    #[test]
    fn outcome_round_trips_through_json() -> Result<(), Box<dyn Error>> {
        let outcome = ScrapeOutcome::success("https://example.com/", 200, sample_record());
        let json = serde_json::to_string(&outcome)?;
        let round_tripped: ScrapeOutcome = serde_json::from_str(&json)?;
        assert_eq!(round_tripped, outcome);
        Ok(())
    }

    #[test]
    fn constructors_keep_data_and_error_mutually_exclusive() {
        let ok = ScrapeOutcome::success("u", 204, PageRecord::default());
        assert!(ok.is_success());
        assert!(ok.data.is_some() && ok.error.is_none());

        let bad = ScrapeOutcome::failure("u", "nope");
        assert!(!bad.is_success());
        assert!(bad.data.is_none() && bad.error.is_some());
        assert_eq!(bad.status, None);
    }
}
