//! Tracemock CLI
//!
//! - `load-mocks`: build the demo dataset and backfill its telemetry into an
//!   in-memory TSDB, then report what was written
//! - `show-config`: print the effective load configuration

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracemock_core::{ScopeKey, TsdbModel};
use tracemock_fixtures::{LoadConfig, LoadSummary, MockLoader};
use tracemock_storage::{MemoryTsdb, TsdbConfig};

mod logging;

/// Rollup the summary queries read from.
const SUMMARY_RESOLUTION_SECS: i64 = 3600;

#[derive(Parser)]
#[command(name = "tracemock")]
#[command(author, version, about = "Tracemock: synthetic telemetry backfill for demo datasets")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the mock organization, projects and events, and backfill their telemetry.
    LoadMocks(LoadMocksArgs),

    /// Print the effective configuration (defaults, file, environment).
    ShowConfig {
        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct LoadMocksArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fixed seed for a reproducible dataset
    #[arg(long)]
    seed: Option<u64>,
    /// Sample events per project
    #[arg(long)]
    num_events: Option<usize>,
    /// Skip the organization's own team and project
    #[arg(long)]
    skip_default_setup: bool,
    /// Do not generate releases or commits
    #[arg(long)]
    no_releases: bool,
    /// Anchor time for the backfill windows (RFC 3339, default: current time)
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
    /// Write a JSON snapshot of the TSDB here
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
    /// Issues listed per project
    #[arg(long, default_value_t = 3)]
    top: usize,
}

fn parse_now(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::LoadMocks(args) => cmd_load_mocks(&args),
        Commands::ShowConfig { config } => cmd_show_config(config.as_deref()),
    }
}

/// Reads the process environment.
fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Defaults, then the file, then `TRACEMOCK_*` variables via `env`.
fn base_config<F>(path: Option<&Path>, env: F) -> Result<LoadConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => LoadConfig::from_path(path)?,
        None => LoadConfig::default(),
    };
    config
        .apply_env_from(env)
        .context("invalid TRACEMOCK_* environment override")?;
    Ok(config)
}

/// Flags go on top of everything else.
fn resolve_config<F>(args: &LoadMocksArgs, env: F) -> Result<LoadConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = base_config(args.config.as_deref(), env)?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(num_events) = args.num_events {
        config.num_events = num_events;
    }
    if args.skip_default_setup {
        config.skip_default_setup = true;
    }
    if args.no_releases {
        config.with_releases = false;
    }
    Ok(config)
}

fn cmd_show_config(path: Option<&Path>) -> Result<()> {
    let config = base_config(path, process_env)?;
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_load_mocks(args: &LoadMocksArgs) -> Result<()> {
    let config = resolve_config(args, process_env)?;
    let coarse_span = config.backfill.coarse.span()?;
    let now = args.now.unwrap_or_else(Utc::now);

    let tsdb = MemoryTsdb::new(TsdbConfig::default())?;
    let mut loader = MockLoader::new(&tsdb, config)?;
    println!(
        "{} mock data (seed {})",
        "Loading".green().bold(),
        loader.seed().to_string().bold()
    );

    let summary = loader
        .run(now)
        .context("mock load aborted; telemetry written so far is kept")?;

    print_summary(&summary);
    let start = now
        .checked_sub_signed(coarse_span)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    print_top_issues(&tsdb, &summary, start, now, args.top)?;

    if let Some(out) = &args.snapshot_out {
        tsdb.save_snapshot(out)
            .with_context(|| format!("failed to write snapshot {}", out.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    }
    Ok(())
}

fn print_summary(summary: &LoadSummary) {
    println!(
        "  {} {} subjects backfilled ({} counter writes, {} frequency writes)",
        "→".cyan(),
        summary.subjects(),
        summary.counter_calls,
        summary.frequency_calls
    );
    for (kind, count) in &summary.entity_counts {
        println!("  {} {:<20} {}", "→".yellow(), kind.to_string(), count);
    }
    for project in &summary.projects {
        let release = project
            .release
            .as_deref()
            .map(|v| v.get(..12).unwrap_or(v).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} / {} (release {}, {} commits, {} issues)",
            "project".bold(),
            project.team,
            project.name.cyan(),
            release.dimmed(),
            project.commits,
            project.group_ids.len()
        );
    }
}

fn print_top_issues(
    tsdb: &MemoryTsdb,
    summary: &LoadSummary,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: usize,
) -> Result<()> {
    if limit == 0 {
        return Ok(());
    }
    println!("{}", "Top issues".green().bold());
    for project in &summary.projects {
        let scope = ScopeKey::new(TsdbModel::FrequentIssuesByProject, project.id);
        let top = tsdb.get_most_frequent(&scope, start, end, SUMMARY_RESOLUTION_SECS, limit)?;
        let listed: Vec<String> = top
            .iter()
            .map(|(group, weight)| format!("#{group}={weight}"))
            .collect();
        println!("  {:<14} {}", project.name, listed.join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_mocks_flags() {
        let cli = Cli::try_parse_from([
            "tracemock",
            "-v",
            "load-mocks",
            "--seed",
            "42",
            "--num-events",
            "3",
            "--no-releases",
            "--now",
            "2024-06-01T09:30:00Z",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::LoadMocks(args) = cli.command else {
            panic!("expected load-mocks");
        };
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.num_events, Some(3));
        assert!(args.no_releases);
        assert_eq!(args.top, 3);
        assert_eq!(args.now.map(|t| t.timestamp()), Some(1_717_234_200));
    }

    #[test]
    fn rejects_bad_timestamp() {
        assert!(Cli::try_parse_from(["tracemock", "load-mocks", "--now", "yesterday"]).is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load.json");
        std::fs::write(&path, r#"{"seed": 1, "num_events": 2, "with_releases": true}"#).unwrap();

        let args = LoadMocksArgs {
            config: Some(path),
            seed: Some(9),
            no_releases: true,
            ..LoadMocksArgs::default()
        };
        let config = resolve_config(&args, |_| None).unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(!config.with_releases);
        // untouched by flags
        assert_eq!(config.num_events, 2);
    }

    #[test]
    fn env_sits_between_file_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load.json");
        std::fs::write(&path, r#"{"seed": 1, "num_events": 2}"#).unwrap();
        let env = |var: &str| match var {
            "TRACEMOCK_SEED" => Some("5".to_string()),
            "TRACEMOCK_NUM_EVENTS" => Some("4".to_string()),
            _ => None,
        };

        let args = LoadMocksArgs {
            config: Some(path),
            num_events: Some(6),
            ..LoadMocksArgs::default()
        };
        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.num_events, 6);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = LoadMocksArgs {
            config: Some(PathBuf::from("/nonexistent/tracemock.json")),
            ..LoadMocksArgs::default()
        };
        assert!(resolve_config(&args, |_| None).is_err());
    }
}
