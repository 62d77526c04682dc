use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::debug;
use tubelog_core::RecordSource;
use tubelog_ingest::{find_takeout_files, ActivitySource, IngestReport, ResponseFileSource};
use tubelog_search::{HistoryStats, SearchOutcome};
use tubelog_store::HistoryStore;

mod config;
mod logging;

use config::Config;

#[derive(Parser)]
#[command(name = "tubelog", version, about = "Normalize, search, and export your YouTube watch history")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a Google Takeout watch-history.json and summarize it
    Takeout {
        /// Takeout file; searched for under `takeout_search_dir` when omitted
        path: Option<PathBuf>,
        #[arg(long)]
        top: Option<usize>,
        /// Also export to FILE (or the configured default filename)
        #[arg(long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },
    /// Ingest a saved activities.list API response and summarize it
    Api {
        #[arg(long)]
        response: PathBuf,
        /// Saved channels.list?mine=true response, for a connectivity check
        #[arg(long)]
        channels: Option<PathBuf>,
        #[arg(long)]
        max_results: Option<u32>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },
    /// Search titles, channels and API descriptions
    Search {
        query: String,
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        limit: Option<usize>,
        /// Rank by fuzzy score instead of substring matching
        #[arg(long)]
        fuzzy: bool,
        /// Export the matches to FILE
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// Show summary statistics
    Stats {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Export history to JSON
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Look for Takeout watch-history files
    Find {
        dir: Option<PathBuf>,
    },
    /// Show the channel a saved channels.list response belongs to
    Whoami {
        #[arg(long)]
        response: PathBuf,
    },
    /// Initialize tubelog (write a default config file)
    Init,
}

/// Where a command reads its history from.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Google Takeout watch-history.json
    #[arg(long)]
    takeout: Option<PathBuf>,
    /// Saved activities.list API response
    #[arg(long)]
    api_response: Option<PathBuf>,
    /// A file previously written by `tubelog export`
    #[arg(long)]
    from_export: Option<PathBuf>,
}

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Videos")]
    count: usize,
    #[tabled(rename = "Share")]
    share: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);
    let config = config::load_config()?;
    debug!(?config, "loaded config");
    run(cli.command, &config)
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Takeout { path, top, export } => cmd_takeout(path, top, export, config),
        Commands::Api { response, channels, max_results, top, export } => {
            cmd_api(response, channels, max_results, top, export, config)
        }
        Commands::Search { query, source, limit, fuzzy, export } => {
            cmd_search(&query, &source, limit, fuzzy, export, config)
        }
        Commands::Stats { source, top } => cmd_stats(&source, top, config),
        Commands::Export { source, out } => cmd_export(&source, out, config),
        Commands::Find { dir } => cmd_find(dir, config),
        Commands::Whoami { response } => cmd_whoami(&response),
        Commands::Init => cmd_init(),
    }
}

fn cmd_takeout(
    path: Option<PathBuf>,
    top: Option<usize>,
    export: Option<Option<PathBuf>>,
    config: &Config,
) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => locate_takeout(&config.takeout_search_dir)?,
    };

    let mut store = HistoryStore::new();
    load_takeout(&mut store, &path)?;
    print_loaded(&store)?;

    let top = top.unwrap_or(config.takeout_top_channels);
    if let Some(stats) = store.summarize(top) {
        print_summary(&stats);
    }
    if let Some(out) = export {
        let out = out.unwrap_or_else(|| PathBuf::from(config.export_filename(RecordSource::Takeout)));
        export_store(&store, &out);
    }
    Ok(())
}

fn cmd_api(
    response: PathBuf,
    channels: Option<PathBuf>,
    max_results: Option<u32>,
    top: Option<usize>,
    export: Option<Option<PathBuf>>,
    config: &Config,
) -> Result<()> {
    let mut source = ResponseFileSource::new(&response);
    if let Some(channels) = channels {
        source = source.with_channels(channels);
        match source.channel_title()? {
            Some(title) => println!("{} Connected as {}", "✓".green(), title.cyan()),
            None => println!("{}", "No channel found for this account".yellow()),
        }
    }

    let mut store = HistoryStore::new();
    store
        .fetch_api(&source, max_results.unwrap_or(config.max_results))
        .with_context(|| format!("failed to ingest {}", response.display()))?;
    print_loaded(&store)?;

    let top = top.unwrap_or(config.api_top_channels);
    if let Some(stats) = store.summarize(top) {
        print_summary(&stats);
    }
    if let Some(out) = export {
        let out = out.unwrap_or_else(|| PathBuf::from(config.export_filename(RecordSource::Api)));
        export_store(&store, &out);
    }
    Ok(())
}

fn cmd_search(
    query: &str,
    source: &SourceArgs,
    limit: Option<usize>,
    fuzzy: bool,
    export: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let mut store = load_source(source, config)?;
    let limit = limit.unwrap_or(config.search_limit);

    if fuzzy {
        let results = match store.fuzzy_search(query) {
            SearchOutcome::EmptyQuery => {
                println!("{}", "Empty query, nothing to search".dimmed());
                return Ok(());
            }
            SearchOutcome::NoHistory => {
                println!("{}", "No history data to search".yellow());
                return Ok(());
            }
            SearchOutcome::Matches(results) => results,
        };
        if results.is_empty() {
            println!("No results for '{}'", query);
            return Ok(());
        }
        println!("{} results for '{}':", results.len(), query.trim().bold());
        for r in results.iter().take(limit) {
            println!("  [{:>4}] {}", r.score, r.record.to_string().cyan());
        }
        return Ok(());
    }

    let matches = match store.search(query) {
        SearchOutcome::EmptyQuery => {
            println!("{}", "Empty query, nothing to search".dimmed());
            return Ok(());
        }
        SearchOutcome::NoHistory => {
            println!("{}", "No history data to search".yellow());
            return Ok(());
        }
        SearchOutcome::Matches(matches) => matches,
    };

    if matches.is_empty() {
        println!("No results for '{}'", query);
        return Ok(());
    }
    println!("{} results for '{}':", matches.len(), query.trim().bold());
    for record in matches.iter().take(limit) {
        println!("  {}", record.to_string().cyan());
        if let Some(url) = &record.video_url {
            println!("        {}", url.dimmed());
        }
    }
    if matches.len() > limit {
        println!("  {}", format!("... and {} more", matches.len() - limit).dimmed());
    }

    if let Some(out) = export {
        store.replace(matches);
        export_store(&store, &out);
    }
    Ok(())
}

fn cmd_stats(source: &SourceArgs, top: Option<usize>, config: &Config) -> Result<()> {
    let store = load_source(source, config)?;
    let top = top.unwrap_or_else(|| config.top_channels(loaded_source(&store)));
    match store.summarize(top) {
        Some(stats) => print_summary(&stats),
        None => println!("{}", "No history loaded".yellow()),
    }
    Ok(())
}

fn cmd_export(source: &SourceArgs, out: Option<PathBuf>, config: &Config) -> Result<()> {
    let store = load_source(source, config)?;
    let out = out.unwrap_or_else(|| PathBuf::from(config.export_filename(loaded_source(&store))));
    let count = store
        .export_json(&out)
        .with_context(|| format!("failed to export to {}", out.display()))?;
    println!("{} Exported {} records to {}", "✓".green(), count, out.display());
    Ok(())
}

fn cmd_find(dir: Option<PathBuf>, config: &Config) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.takeout_search_dir.clone());
    let found = find_takeout_files(&dir);
    if found.is_empty() {
        println!("No Takeout watch-history files under {}", dir.display());
        return Ok(());
    }

    println!("{} candidate files:", found.len().to_string().bold());
    for path in &found {
        println!("  {}", path.display().to_string().cyan());
    }
    Ok(())
}

fn cmd_whoami(response: &Path) -> Result<()> {
    // only the channels response is read here
    let source = ResponseFileSource::new(response).with_channels(response);
    match source
        .channel_title()
        .with_context(|| format!("failed to read {}", response.display()))?
    {
        Some(title) => println!("{} Connected as {}", "✓".green(), title.cyan()),
        None => println!("{}", "No channel found for this account".yellow()),
    }
    Ok(())
}

fn cmd_init() -> Result<()> {
    let config_file = config::config_file()?;
    if config_file.exists() {
        println!("Config already exists at {}", config_file.display());
        return Ok(());
    }

    config::save_config_to(&Config::default(), &config_file)?;
    println!("{} Initialized tubelog at {}", "✓".green(), config_file.display());
    Ok(())
}

fn locate_takeout(dir: &Path) -> Result<PathBuf> {
    let mut found = find_takeout_files(dir).into_iter();
    let Some(first) = found.next() else {
        bail!("no Takeout watch-history file found under {}; pass a PATH", dir.display());
    };
    let others = found.count();
    if others > 0 {
        println!(
            "{}",
            format!("Using {} ({} other candidates, see `tubelog find`)", first.display(), others).dimmed()
        );
    }
    Ok(first)
}

fn load_takeout(store: &mut HistoryStore, path: &Path) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    pb.set_message(format!("Loading {}...", path.display()));
    pb.enable_steady_tick(Duration::from_millis(80));

    let result = store.load_takeout(path).map(|_| ());
    pb.finish_and_clear();
    result.with_context(|| format!("failed to load Takeout file {}", path.display()))
}

fn load_source(source: &SourceArgs, config: &Config) -> Result<HistoryStore> {
    let mut store = HistoryStore::new();
    if let Some(path) = &source.takeout {
        load_takeout(&mut store, path)?;
    } else if let Some(path) = &source.api_response {
        store
            .fetch_api(&ResponseFileSource::new(path), config.max_results)
            .with_context(|| format!("failed to ingest {}", path.display()))?;
    } else if let Some(path) = &source.from_export {
        store
            .load_export(path)
            .with_context(|| format!("failed to load export {}", path.display()))?;
    }
    Ok(store)
}

/// Source of the loaded history, for picking per-source defaults.
fn loaded_source(store: &HistoryStore) -> RecordSource {
    store
        .last_report()
        .map(|report| report.source)
        .or_else(|| store.current()?.records().first().map(|r| r.source))
        .unwrap_or(RecordSource::Takeout)
}

fn export_store(store: &HistoryStore, out: &Path) {
    // a failed export leaves the loaded history intact
    match store.export_json(out) {
        Ok(count) => println!("{} Exported {} records to {}", "✓".green(), count, out.display()),
        Err(e) => eprintln!("{} {}", "✗".red(), e),
    }
}

fn print_loaded(store: &HistoryStore) -> Result<()> {
    let report = store.last_report().context("no ingestion report")?;
    print_report(report);
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!(
        "{} Loaded {} videos from {} ({} raw items, {} considered)",
        "✓".green(),
        report.retained.to_string().bold(),
        report.source.display_name(),
        report.raw_count,
        report.considered
    );
    let skipped = report.skipped.breakdown();
    if !skipped.is_empty() {
        println!("  Skipped {}:", report.skipped_total());
        for (reason, count) in skipped {
            println!("    {:28} {}", reason.description().dimmed(), count);
        }
    }
}

fn print_summary(stats: &HistoryStats) {
    println!("\n{}", "Watch history summary".bold());
    println!("  Videos:   {}", stats.total.to_string().cyan());
    println!("  Channels: {}", stats.unique_channels.to_string().cyan());

    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("  Oldest:   {}", oldest.to_string().dimmed());
        println!("  Newest:   {}", newest.to_string().dimmed());
    }
    if let Some(days) = stats.span_days {
        println!("  Span:     {} days", days);
    }
    if let Some(avg) = stats.average_per_day {
        println!("  Per day:  {:.1}", avg);
    }

    if !stats.top_channels.is_empty() {
        let rows: Vec<ChannelRow> = stats
            .top_channels
            .iter()
            .enumerate()
            .map(|(i, c)| ChannelRow {
                rank: i + 1,
                channel: c.channel.clone(),
                count: c.count,
                share: format!("{:.1}%", c.percentage),
            })
            .collect();
        println!("\n  Top channels:");
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}
