//! libretto - Export media-server libraries to CSV
//!
//! Usage:
//!   libretto --list                List libraries
//!   libretto --name Movies         Export one library
//!   libretto --dir exports         Export every library
//!   libretto --help                Show help

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use libretto_core::config::Config;
use libretto_core::Error;

mod cli;

use cli::Args;

const LOG_DIR: &str = "logs";

/// Another export holds the output file's run lock
const EXIT_ALREADY_RUNNING: u8 = 4;
/// Interrupted by Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match prepare(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let command = args.command(&config);
    tracing::debug!(?command, server = %config.server_url, "Starting");

    let result = tokio::select! {
        result = cli::run(command, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the export future releases the run lock and removes the partial file
            tracing::warn!("Interrupted; export cancelled");
            eprintln!("Interrupted.");
            return ExitCode::from(EXIT_INTERRUPTED);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn prepare(args: &Args) -> anyhow::Result<Config> {
    let config = args.load_config()?;
    init_logging(&config)?;
    config.validate()?;
    Ok(config)
}

fn exit_code(err: &anyhow::Error) -> u8 {
    let already_running = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<Error>())
        .any(|e| matches!(e, Error::AlreadyRunning { .. }));
    if already_running {
        EXIT_ALREADY_RUNNING
    } else {
        1
    }
}

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let default_level = if config.debug {
        "debug"
    } else if config.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // Optional file log; terminal output stays as is
    let file_layer = if config.enable_logging {
        let file = create_log_file(Path::new(LOG_DIR))?;
        Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("failed to initialize logging")?;
    Ok(())
}

fn create_log_file(dir: &Path) -> anyhow::Result<File> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let name = format!(
        "libretto-{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    File::create(&path).with_context(|| format!("failed to create log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_for_held_lock() {
        let err = anyhow::Error::new(Error::AlreadyRunning {
            lock_path: PathBuf::from("/tmp/x.lock"),
            pid: 42,
        })
        .context("failed to export library 'Movies'");
        assert_eq!(exit_code(&err), EXIT_ALREADY_RUNNING);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        let err = anyhow::Error::new(Error::LibraryNotFound("Anime".to_string()))
            .context("failed to export library 'Anime'");
        assert_eq!(exit_code(&err), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn test_log_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        create_log_file(dir.path()).unwrap();
        let entries: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("libretto-"));
        assert!(entries[0].ends_with(".log"));
    }
}
