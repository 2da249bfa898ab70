//! Result sink: the whole outcome batch serialized to one JSON or CSV file.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::config::ScrapeConfig;
use crate::model::ScrapeOutcome;

/// Output format selector for the sink and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// File extension conventionally paired with the format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(SinkError::UnsupportedFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// Errors from the result sink. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unsupported output format: {value}. Use json or csv.")]
    UnsupportedFormat { value: String },

    #[error("Failed to write results: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode results as JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

const CSV_HEADER: [&str; 5] = ["URL", "Status", "Title", "Links", "Error"];

/// Serialize the whole batch and overwrite `config.output_path` in full.
///
/// The output is rendered in memory first, so an encoding failure never
/// touches the destination file. Unsupported format strings never reach
/// this point: they are rejected when parsed into [`OutputFormat`].
pub fn write_outcomes(outcomes: &[ScrapeOutcome], config: &ScrapeConfig) -> Result<(), SinkError> {
    let rendered = match config.format {
        OutputFormat::Json => render_json(outcomes)?,
        OutputFormat::Csv => render_csv(outcomes),
    };
    fs::write(&config.output_path, rendered).map_err(|e| SinkError::Io {
        path: config.output_path.clone(),
        source: e,
    })
}

/// Pretty-printed JSON array, one element per outcome, in batch order.
fn render_json(outcomes: &[ScrapeOutcome]) -> Result<String, SinkError> {
    Ok(serde_json::to_string_pretty(outcomes)?)
}

/// Header plus one row per outcome; links joined with `", "`.
fn render_csv(outcomes: &[ScrapeOutcome]) -> String {
    let mut out = String::new();
    push_row(&mut out, &CSV_HEADER.map(String::from));
    for outcome in outcomes {
        let status = outcome.status.map(|s| s.to_string()).unwrap_or_default();
        let (title, links) = match &outcome.data {
            Some(record) => (record.title.clone(), record.links.join(", ")),
            None => (String::new(), String::new()),
        };
        let error = outcome.error.clone().unwrap_or_default();
        push_row(&mut out, &[outcome.url.clone(), status, title, links, error]);
    }
    out
}

/// Fields containing the separator, a quote, or a line break are quoted,
/// with embedded quotes doubled.
fn push_row(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(field) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}
