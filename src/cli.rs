//! CLI parsing and orchestration. Gathers URLs, layers flags over the config
//! file, runs the pipeline, and maps errors to exit codes.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{
    self, ConfigError, FileConfig, ScrapeConfig, DEFAULT_DELAY_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::pipeline::{self, PipelineError, RunOptions};
use crate::sink::OutputFormat;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Config(_) => 1,
            CliRunError::Pipeline(_) => 2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "websift")]
#[command(about = "Scrape a list of URLs and write title/link/meta records as JSON or CSV")]
#[command(
    after_help = "Config file keys (user_agent, delay_secs, timeout_secs, max_retries, format, output_path, run_timeout_secs) are read from ./websift.toml or the user config directory. CLI flags override config."
)]
pub struct Args {
    /// URLs to scrape, in order.
    pub urls: Vec<String>,

    /// Read more URLs from a file (one per line; blank lines and # comments ignored).
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Output path. Default: ./results.{ext} where ext depends on --format.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: json or csv.
    #[arg(long, value_parser = parse_output_format)]
    pub format: Option<OutputFormat>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 1).
    #[arg(long)]
    pub delay: Option<f64>,

    /// Request timeout in seconds (overrides config; default 10).
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Total attempts per URL (overrides config; default 3).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Stop starting new fetches after this many seconds; remaining URLs are
    /// recorded as failures.
    #[arg(long)]
    pub run_timeout: Option<f64>,

    /// Validate configuration, print the plan, and exit without fetching.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase log detail (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}

/// Install the global tracing subscriber. Call once, before `run`.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("websift=info,warn"),
            1 => EnvFilter::new("websift=debug,info"),
            2 => EnvFilter::new("websift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };
    // Logs share stderr with the progress bar; stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Positional URLs first, then the URL file, in file order.
fn gather_urls(args: &Args) -> Result<Vec<String>, CliRunError> {
    let mut urls = args.urls.clone();
    if let Some(ref path) = args.urls_file {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CliRunError::InvalidInput(format!("Cannot read URL file {}: {}", path.display(), e))
        })?;
        urls.extend(parse_url_lines(&raw));
    }
    if urls.is_empty() {
        return Err(CliRunError::InvalidInput(
            "No URLs given. Pass URLs as arguments or use --urls-file.".to_string(),
        ));
    }
    Ok(urls)
}

fn parse_url_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Layer CLI flags over the config file over the defaults, then validate.
fn build_config(args: &Args, file: Option<&FileConfig>) -> Result<ScrapeConfig, CliRunError> {
    let format = match args.format {
        Some(format) => format,
        None => match file.and_then(|c| c.format.as_deref()) {
            Some(name) => name
                .parse::<OutputFormat>()
                .map_err(|e| CliRunError::InvalidInput(e.to_string()))?,
            None => OutputFormat::Json,
        },
    };
    let output_path = args
        .output
        .clone()
        .or_else(|| file.and_then(|c| c.output_path.clone()))
        .unwrap_or_else(|| PathBuf::from(format!("results.{}", format.extension())));
    let scrape_config = ScrapeConfig {
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| file.and_then(|c| c.user_agent.clone()))
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        delay_secs: args
            .delay
            .or_else(|| file.and_then(|c| c.delay_secs))
            .unwrap_or(DEFAULT_DELAY_SECS),
        max_retries: args
            .retries
            .or_else(|| file.and_then(|c| c.max_retries))
            .unwrap_or(DEFAULT_MAX_RETRIES),
        timeout_secs: args
            .timeout
            .or_else(|| file.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        format,
        output_path,
        run_timeout_secs: args
            .run_timeout
            .or_else(|| file.and_then(|c| c.run_timeout_secs)),
    };
    scrape_config.validate()?;
    Ok(scrape_config)
}

/// Ensure the output parent directory exists before any fetching starts.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code
/// and message on failure. A run where every URL failed still succeeds (the
/// batch completed and was written).
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let urls = gather_urls(args)?;
    let file_config = config::load_file_config()?;
    let scrape_config = build_config(args, file_config.as_ref())?;
    validate_output_path(&scrape_config.output_path)?;

    if args.dry_run {
        eprintln!("URLs: {}", urls.len());
        eprintln!("Format: {}", scrape_config.format);
        eprintln!("Output: {}", scrape_config.output_path.display());
        return Ok(());
    }

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
                    .unwrap()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Scraping page {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = RunOptions {
        progress,
        deadline: None,
    };
    let outcomes = pipeline::run(&urls, &scrape_config, &options)?;

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    if !args.quiet {
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        eprintln!(
            "Wrote {} result(s) to {} ({} ok, {} failed)",
            outcomes.len(),
            scrape_config.output_path.display(),
            outcomes.len() - failed,
            failed
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_from(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("websift").chain(argv.iter().copied()))
    }

    #[test]
    fn parse_output_format_accepts_json_and_csv() {
        assert_eq!(parse_output_format("json").unwrap(), OutputFormat::Json);
        assert_eq!(parse_output_format("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(parse_output_format("CSV").unwrap(), OutputFormat::Csv);
    }

    #[test]
    fn parse_output_format_rejects_anything_else() {
        let err = parse_output_format("xml").unwrap_err();
        assert!(err.contains("Unsupported output format: xml"));
    }

    #[test]
    fn parse_url_lines_skips_blanks_and_comments() {
        let raw = "https://a.example/\n\n# comment\n  https://b.example/  \n#https://c.example/\n";
        assert_eq!(
            parse_url_lines(raw),
            vec!["https://a.example/", "https://b.example/"]
        );
    }

    #[test]
    fn gather_urls_requires_at_least_one_url() {
        let args = args_from(&[]);
        let err = gather_urls(&args).unwrap_err();
        assert!(matches!(err, CliRunError::InvalidInput(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn gather_urls_appends_file_urls_after_positional_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://from-file.example/1").unwrap();
        writeln!(file, "# skip me").unwrap();
        writeln!(file, "https://from-file.example/2").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = args_from(&["https://positional.example/", "--urls-file", &path]);
        assert_eq!(
            gather_urls(&args).unwrap(),
            vec![
                "https://positional.example/",
                "https://from-file.example/1",
                "https://from-file.example/2",
            ]
        );
    }

    #[test]
    fn gather_urls_reports_unreadable_file() {
        let args = args_from(&["--urls-file", "/nonexistent_websift_dir/urls.txt"]);
        let err = gather_urls(&args).unwrap_err();
        assert!(err.to_string().contains("Cannot read URL file"));
    }

    #[test]
    fn build_config_uses_defaults_when_nothing_is_set() {
        let args = args_from(&["https://a.example/"]);
        let config = build_config(&args, None).unwrap();
        assert_eq!(config, ScrapeConfig::default());
    }

    #[test]
    fn build_config_prefers_flags_over_file_values() {
        let args = args_from(&[
            "https://a.example/",
            "--delay",
            "0.25",
            "--format",
            "csv",
        ]);
        let file = FileConfig {
            user_agent: Some("File/1.0".to_string()),
            delay_secs: Some(5.0),
            format: Some("json".to_string()),
            ..FileConfig::default()
        };
        let config = build_config(&args, Some(&file)).unwrap();
        assert_eq!(config.delay_secs, 0.25);
        assert_eq!(config.format, OutputFormat::Csv);
        assert_eq!(config.user_agent, "File/1.0");
    }

    #[test]
    fn default_output_path_follows_the_format_extension() {
        let args = args_from(&["https://a.example/", "--format", "csv"]);
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.output_path, PathBuf::from("results.csv"));
    }

    #[test]
    fn file_output_path_is_used_when_no_flag_is_given() {
        let file = FileConfig {
            output_path: Some(PathBuf::from("out/batch.json")),
            ..FileConfig::default()
        };
        let args = args_from(&["https://a.example/"]);
        let config = build_config(&args, Some(&file)).unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/batch.json"));
    }

    #[test]
    fn build_config_rejects_unsupported_file_format_value() {
        let file = FileConfig {
            format: Some("xml".to_string()),
            ..FileConfig::default()
        };
        let args = args_from(&["https://a.example/"]);
        let err = build_config(&args, Some(&file)).unwrap_err();
        assert!(err.to_string().contains("Unsupported output format: xml"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn build_config_rejects_invalid_values_with_exit_code_one() {
        let args = args_from(&["https://a.example/", "--retries", "0"]);
        let err = build_config(&args, None).unwrap_err();
        assert!(matches!(err, CliRunError::Config(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Args::try_parse_from(["websift", "https://a.example/", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn validate_output_path_accepts_existing_parent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(&dir.path().join("results.json")).is_ok());
    }

    #[test]
    fn validate_output_path_rejects_missing_parent() {
        let result = validate_output_path(Path::new("/nonexistent_dir_websift_xyz/results.json"));
        match result {
            Err(CliRunError::InvalidInput(message)) => {
                assert!(message.contains("parent directory does not exist"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn exit_codes_separate_input_errors_from_pipeline_errors() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Config(ConfigError::Validation("x".into())).exit_code(),
            1
        );
        let sink_err = crate::sink::SinkError::UnsupportedFormat { value: "x".into() };
        assert_eq!(
            CliRunError::Pipeline(PipelineError::Sink(sink_err)).exit_code(),
            2
        );
    }
}
