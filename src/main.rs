//! Command-line interface for the stale-issues binary.
//!
//! One invocation performs one run against one repository: the configuration
//! is loaded, open issues are scanned, and stale transitions are applied.

use std::{io, path::PathBuf, process};

use chrono::Utc;
use clap::{ArgAction, Parser};
use stale_issues::{
    Coordinator, DEFAULT_BASE_URL, Error, GitHubTracker, RunReport, StaleConfig,
};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

/// Command line interface for handling stale GitHub issues.
#[derive(Debug, Parser,)]
#[command(name = "stale-issues", version, about = "Handle stale GitHub issues")]
struct Cli
{
    /// Repository to manage, in owner/name form.
    repo: String,

    /// GitHub API host, defaults to api.github.com.
    #[arg(long = "base-url", value_name = "HOST", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Just show what would happen.
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Read the configuration from a local file instead of .github/stale.yml.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf,>,

    /// Token used to authenticate against the GitHub API.
    #[arg(long = "token", env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String,>,

    /// Print the run report as JSON on stdout.
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,

    /// Pretty-print the JSON run report.
    #[arg(long = "pretty", action = ArgAction::SetTrue, requires = "json")]
    pretty: bool,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main(flavor = "current_thread")]
async fn main()
{
    init_tracing();

    if let Err(error,) = run(Cli::parse(),).await {
        error!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Installs the log subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),);
    tracing_subscriber::fmt()
        .with_env_filter(filter,)
        .with_writer(io::stderr,)
        .with_target(false,)
        .init();
}

/// Executes one run using parsed arguments.
///
/// # Errors
///
/// Propagates configuration, validation and tracker errors.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    let tracker = GitHubTracker::connect(&cli.repo, &cli.base_url, cli.token.clone(),)?;

    let config = match cli.config.as_deref() {
        Some(path,) => {
            info!("Using local configuration {}", path.display());
            StaleConfig::load(path,)?
        }
        None => StaleConfig::fetch(&tracker,).await?,
    };

    let span = info_span!("stale_run", repo = %tracker.repository(), dry_run = cli.dry_run);
    let report = Coordinator::new(&tracker, &config,)
        .dry_run(cli.dry_run,)
        .with_span(span,)
        .run(Utc::now(),)
        .await?;

    if cli.json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_report(&mut handle, &report, cli.pretty,)?;
    }

    Ok((),)
}

fn write_report<W: io::Write,>(writer: &mut W, report: &RunReport, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, report,)?;
    } else {
        serde_json::to_writer(writer, report,)?;
    }

    Ok((),)
}

#[cfg(test)]
mod tests
{
    use std::{io::Cursor, path::Path};

    use clap::Parser;
    use stale_issues::RunReport;

    use super::{Cli, write_report};

    #[test]
    fn cli_requires_repository()
    {
        assert!(Cli::try_parse_from([env!("CARGO_PKG_NAME")]).is_err());
    }

    #[test]
    fn cli_defaults_match_live_run_against_github()
    {
        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "octocat/hello-world",],)
            .expect("failed to parse CLI",);

        assert_eq!(cli.repo, "octocat/hello-world");
        assert_eq!(cli.base_url, "api.github.com");
        assert!(!cli.dry_run);
        assert!(cli.config.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn cli_accepts_all_flags()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "octocat/hello-world",
            "--base-url",
            "github.example.com/api/v3",
            "--dry-run",
            "--config",
            "stale.yml",
            "--token",
            "ghp_example",
            "--json",
            "--pretty",
        ],)
        .expect("failed to parse CLI",);

        assert_eq!(cli.base_url, "github.example.com/api/v3");
        assert!(cli.dry_run);
        assert_eq!(cli.config.as_deref(), Some(Path::new("stale.yml")));
        assert_eq!(cli.token.as_deref(), Some("ghp_example"));
        assert!(cli.json);
        assert!(cli.pretty);
    }

    #[test]
    fn pretty_requires_json()
    {
        let result =
            Cli::try_parse_from([env!("CARGO_PKG_NAME"), "octocat/hello-world", "--pretty",],);
        assert!(result.is_err());
    }

    #[test]
    fn report_is_written_compact_by_default()
    {
        let mut buffer = Cursor::new(Vec::new(),);
        write_report(&mut buffer, &RunReport::default(), false,).expect("failed to serialize",);

        let output = String::from_utf8(buffer.into_inner(),).expect("invalid UTF-8",);
        assert_eq!(
            output,
            "{\"dry_run\":false,\"processed\":0,\"limit_reached\":false,\"exempt\":[],\"entries\":[]}"
        );
    }

    #[test]
    fn report_is_written_pretty_on_request()
    {
        let mut buffer = Cursor::new(Vec::new(),);
        write_report(&mut buffer, &RunReport::default(), true,).expect("failed to serialize",);

        let output = String::from_utf8(buffer.into_inner(),).expect("invalid UTF-8",);
        assert!(output.starts_with("{\n  \"dry_run\": false,"));
    }
}
