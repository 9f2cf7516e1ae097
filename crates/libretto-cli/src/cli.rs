//! Command-line arguments and command execution
//!
//! Usage:
//!   libretto --list                     List libraries
//!   libretto --name <title> [-o file]   Export one library
//!   libretto [-d dir]                   Export every library

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use libretto_core::config::Config;
use libretto_core::utils::export_file_name;
use libretto_core::{BatchSummary, ExportSummary, Exporter, LibraryOutcome, PlexClient};

/// Export media-server libraries (movies, TV shows, music) to CSV
#[derive(Debug, Parser)]
#[command(name = "libretto", version, about)]
pub struct Args {
    /// Server authentication token
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Server URL (e.g. http://localhost:32400)
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// List available libraries and exit
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Export only the library with this title
    #[arg(short = 'n', long, value_name = "TITLE")]
    pub name: Option<String>,

    /// Output file for --name (defaults to <dir>/<title>.csv)
    #[arg(short = 'o', long, value_name = "FILE", requires = "name")]
    pub output: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Overwrite existing export files
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Only print warnings and errors
    #[arg(short = 'q', long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub debug: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ExportOne { name: String, output: PathBuf },
    ExportAll { dir: PathBuf },
}

impl Args {
    /// Load the configuration file and apply command-line overrides
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::default_path().context("could not determine config directory")?,
        };
        let mut config = Config::load_or_create(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Overlay command-line values on `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(url) = &self.url {
            config.server_url = url.clone();
        }
        if let Some(dir) = &self.dir {
            config.output_dir = dir.clone();
        }
        if self.force {
            config.force = true;
        }
        if self.quiet {
            config.quiet = true;
            config.debug = false;
        }
        if self.debug {
            config.debug = true;
            config.quiet = false;
        }
    }

    pub fn command(&self, config: &Config) -> Command {
        if self.list {
            return Command::List;
        }
        match &self.name {
            Some(name) => Command::ExportOne {
                name: name.clone(),
                output: self
                    .output
                    .clone()
                    .unwrap_or_else(|| config.output_dir.join(export_file_name(name))),
            },
            None => Command::ExportAll {
                dir: config.output_dir.clone(),
            },
        }
    }
}

/// Run `command` against the configured server
pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    let client = PlexClient::with_options(&config.server_url, &config.token, config.client_options())?;
    let exporter = Exporter::new(client).with_options(config.export_options());

    match command {
        Command::List => run_list(&exporter).await,
        Command::ExportOne { name, output } => run_export_one(&exporter, &name, &output).await,
        Command::ExportAll { dir } => run_export_all(&exporter, &dir).await,
    }
}

async fn run_list(exporter: &Exporter<PlexClient>) -> anyhow::Result<()> {
    let sections = exporter
        .list_libraries()
        .await
        .context("failed to list libraries")?;

    if sections.is_empty() {
        println!("No libraries found.");
        return Ok(());
    }

    println!("Available libraries:");
    for section in &sections {
        let note = if section.content_type.is_some() {
            ""
        } else {
            "  (not exportable)"
        };
        println!("  [{}] {} ({}){}", section.key, section.title, section.kind, note);
    }
    Ok(())
}

async fn run_export_one(
    exporter: &Exporter<PlexClient>,
    name: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let summary = exporter
        .export_library_by_name(name, output)
        .await
        .with_context(|| format!("failed to export library '{}'", name))?;
    print_summary(&summary);
    Ok(())
}

async fn run_export_all(exporter: &Exporter<PlexClient>, dir: &Path) -> anyhow::Result<()> {
    let batch = exporter
        .export_all(dir)
        .await
        .context("failed to export libraries")?;

    for outcome in &batch.outcomes {
        match outcome {
            LibraryOutcome::Exported(summary) => print_summary(summary),
            LibraryOutcome::Skipped { section, reason } => {
                println!("Skipped {}: {}", section, reason)
            }
            LibraryOutcome::Failed { section, error } => {
                eprintln!("Failed {}: {}", section, error)
            }
        }
    }

    println!();
    println!("=== Export Summary ===");
    println!("Exported:    {}", batch.exported());
    println!("Skipped:     {}", batch.skipped());
    println!("Failed:      {}", batch.failed());
    println!("Total items: {}", batch.total_items());

    check_batch(&batch)
}

/// A batch fails when any library failed or when none was exported
fn check_batch(batch: &BatchSummary) -> anyhow::Result<()> {
    if batch.failed() > 0 {
        anyhow::bail!("{} of {} libraries failed", batch.failed(), batch.outcomes.len());
    }
    if batch.exported() == 0 {
        anyhow::bail!("No libraries were successfully exported");
    }
    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    println!(
        "Exported {} {} from '{}' to {} in {:.1}s",
        summary.rows_written,
        summary.content_type.item_label(),
        summary.section,
        summary.path.display(),
        summary.elapsed.as_secs_f64()
    );
}
