use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use storekit::config::{Config, LogConfig};
use storekit::{
    FallbackStorage, FileStorageArea, InMemoryStorageService, StorageService, StringTranscoder,
    TranscoderKind, file_storage,
};

/// Typed key/value storage over a JSON file
#[derive(Debug, Parser)]
#[command(name = "storekit", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Storage file, overrides `storage.file` from the configuration
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Transcoder used to parse and print values
    /// (json, string, boolean, number, date-iso, date-epoch)
    #[arg(short, long)]
    transcoder: Option<TranscoderKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print whether an entry exists
    Has { key: String },
    /// Print the decoded value of an entry
    Get { key: String },
    /// Parse a value with the transcoder and store it
    Set { key: String, value: String },
    /// Remove an entry
    Remove { key: String },
    /// Remove all entries
    Clear,
}

fn init_logging(log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match &log.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn open_storage(file: Option<&PathBuf>) -> FallbackStorage<FileStorageArea> {
    match file {
        Some(path) => file_storage(path),
        None => {
            info!("No storage file configured, using volatile storage");
            FallbackStorage::Volatile(InMemoryStorageService::new())
        }
    }
}

/// How a command finished, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    /// `get` found no entry; nothing is printed.
    Absent,
    /// `get` found an entry the transcoder cannot decode.
    Undecodable,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Absent | Outcome::Undecodable => ExitCode::FAILURE,
        }
    }
}

/// Runs `command` against `storage`, printing results to `out`.
fn run<S: StorageService>(
    storage: &S,
    kind: TranscoderKind,
    command: Command,
    out: &mut impl Write,
) -> Result<Outcome> {
    match command {
        Command::Has { key } => {
            writeln!(out, "{}", storage.has(&key))?;
        }
        Command::Get { key } => {
            let Some(raw) = storage.get_with(&key, &StringTranscoder) else {
                return Ok(Outcome::Absent);
            };
            match kind.render(&raw) {
                Some(value) => writeln!(out, "{}", value)?,
                None => {
                    eprintln!("value of '{}' cannot be decoded as {}", key, kind);
                    return Ok(Outcome::Undecodable);
                }
            }
        }
        Command::Set { key, value } => {
            let encoded = kind
                .normalize(&value)
                .with_context(|| format!("'{}' is not a valid {} value", value, kind))?;
            storage.set_with(&key, &encoded, &StringTranscoder);
        }
        Command::Remove { key } => storage.remove(&key),
        Command::Clear => storage.clear(),
    }
    Ok(Outcome::Done)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    init_logging(&config.log)?;

    let file = cli.file.or(config.storage.file);
    let kind = cli.transcoder.unwrap_or(config.storage.transcoder);
    debug!("Storage file: {:?}, transcoder: {}", file, kind);

    let storage = open_storage(file.as_ref());
    let outcome = run(&storage, kind, cli.command, &mut std::io::stdout().lock())?;
    Ok(outcome.into())
}
