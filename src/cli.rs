//! Command-line front end
//!
//! One subcommand per engine operation. Results go to stdout, logs to stderr:
//!
//! ```text
//! predicates        true | false
//! sizes             integer
//! chunks            encoded payload (hex or base64), or a hex dump with --dump
//! everything else   JSON
//! ```
//!
//! Without `--strict` every query collapses failures into its empty value and
//! exits 0. With `--strict` a failure prints `{"error": ..., "kind": ...}` and the
//! process exits 1. Configuration problems and malformed batch input always fail.

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};

use crate::analysis::{self, PeHeaderAnalyzer};
use crate::collect::{CollectionPlan, PlannedPattern};
use crate::common::hex::{format_dump, DumpOptions};
use crate::config::{AddressingMode, Encoding, EngineConfig};
use crate::driver::MountedVolumeDriver;
use crate::engine::{parse_batch, Engine, Entry};
use crate::error::{EngineError, EngineResult};
use crate::logging;

#[derive(Parser, Debug)]
#[command(name = "ffx-imagefs", version, about = "Read-only path resolution over mounted forensic images")]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Map a mountpoint to the host directory holding the image (repeatable)
    #[arg(long = "volume", global = true, value_name = "MOUNT=DIR", value_parser = parse_volume)]
    volumes: Vec<(String, PathBuf)>,
    #[arg(long, global = true, value_enum)]
    addressing: Option<AddressingMode>,
    #[arg(long, global = true, value_enum)]
    encoding: Option<Encoding>,
    /// Report failures as errors instead of empty values
    #[arg(long, global = true)]
    strict: bool,
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Describe the root directory of a mountpoint
    GetRoot { mountpoint: String },
    /// Is the path a directory
    IsDirectory { path: String },
    /// Is the path a regular file
    IsFile { path: String },
    /// Is the path a symbolic link
    IsSymlink { path: String },
    /// List the children of a directory
    ListDirectory { path: String },
    /// Path of a link named inside a directory (the link is not resolved)
    FollowSymlink { path: String, name: String },
    /// Size of a file in bytes
    GetSize { path: String },
    /// Read a byte range of a file
    ReadChunk {
        path: String,
        offset: u64,
        length: usize,
        /// Print a hex dump instead of the encoded payload
        #[arg(long)]
        dump: bool,
        /// Bytes per hex dump line
        #[arg(long, default_value_t = 16)]
        width: usize,
    },
    /// Read whole files; PATHS is a JSON array of paths (stdin when omitted)
    BatchExtract { paths: Option<String> },
    /// Expand a wildcard / recursive path expression
    Expand { expression: String },
    /// Digests, type and executable header of a file
    FileInfo { path: String },
    /// Run a collection plan (JSON array of {artifact, pattern, source})
    Collect { plan: PathBuf },
}

fn parse_volume(spec: &str) -> Result<(String, PathBuf), String> {
    match spec.split_once('=') {
        Some((mount, dir)) if !mount.is_empty() && !dir.is_empty() => {
            Ok((mount.to_string(), PathBuf::from(dir)))
        }
        _ => Err(format!("expected MOUNT=DIR, got '{}'", spec)),
    }
}

impl Cli {
    fn init_logging(&self) {
        match (self.quiet, self.verbose) {
            (true, _) => logging::init_with_level(Level::ERROR),
            (false, 0) => logging::init(),
            (false, 1) => logging::init_with_level(Level::DEBUG),
            (false, _) => logging::init_verbose(),
        }
    }

    /// File configuration with the command-line flags layered on top
    fn engine_config(&self) -> EngineResult<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        for (mountpoint, dir) in &self.volumes {
            config.volumes.insert(mountpoint.clone(), dir.clone());
        }
        if let Some(addressing) = self.addressing {
            config.addressing = addressing;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        config.validate()?;
        Ok(config)
    }
}

fn build_engine(config: EngineConfig) -> Engine<MountedVolumeDriver> {
    let driver = config
        .volumes
        .iter()
        .fold(MountedVolumeDriver::new(), |driver, (mountpoint, dir)| {
            driver.with_volume(mountpoint, dir.clone())
        });
    Engine::with_config(driver, config)
}

fn to_json<T: Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string(value).map_err(|e| EngineError::Config(format!("Failed to serialize output: {}", e)))
}

fn listing(entries: &[Entry]) -> EngineResult<String> {
    let rows: Vec<_> = entries.iter().map(Entry::listing_row).collect();
    to_json(&rows)
}

fn error_value(e: &EngineError) -> Value {
    json!({ "error": e.to_string(), "kind": e.kind_name() })
}

fn read_stdin() -> EngineResult<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| EngineError::MalformedBatch(format!("Failed to read stdin: {}", e)))?;
    Ok(input)
}

/// Run one parsed command and render its stdout payload
pub fn execute(cli: &Cli) -> EngineResult<String> {
    let engine = build_engine(cli.engine_config()?);
    let strict = cli.strict;

    match &cli.cmd {
        Cmd::GetRoot { mountpoint } => {
            if strict {
                to_json(&engine.try_get_root(mountpoint)?)
            } else {
                to_json(&engine.get_root(mountpoint))
            }
        }
        Cmd::IsDirectory { path } => {
            let answer = if strict { engine.try_is_directory(path)? } else { engine.is_directory(path) };
            Ok(answer.to_string())
        }
        Cmd::IsFile { path } => {
            let answer = if strict { engine.try_is_file(path)? } else { engine.is_file(path) };
            Ok(answer.to_string())
        }
        Cmd::IsSymlink { path } => {
            let answer = if strict { engine.try_is_symlink(path)? } else { engine.is_symlink(path) };
            Ok(answer.to_string())
        }
        Cmd::ListDirectory { path } => {
            let entries = if strict {
                engine.try_list_directory(path)?
            } else {
                engine.list_directory(path)
            };
            listing(&entries)
        }
        Cmd::FollowSymlink { path, name } => {
            let target = engine.follow_symlink(path, name);
            if strict && target.is_empty() {
                return Err(EngineError::Address(format!("cannot join '{}' under '{}'", name, path)));
            }
            Ok(target)
        }
        Cmd::GetSize { path } => {
            let answer = if strict { engine.try_get_size(path)? } else { engine.get_size(path) };
            Ok(answer.to_string())
        }
        Cmd::ReadChunk {
            path,
            offset,
            length,
            dump,
            width,
        } => {
            let data = if strict {
                engine.try_read_chunk(path, *offset, *length)?
            } else {
                engine.read_chunk_bytes(path, *offset, *length)
            };
            if *dump {
                let options = DumpOptions::default()
                    .with_start_offset(*offset)
                    .with_bytes_per_line(*width);
                Ok(format_dump(&data, &options))
            } else {
                Ok(engine.encode(&data))
            }
        }
        Cmd::BatchExtract { paths } => {
            let input = match paths {
                Some(paths) => paths.clone(),
                None => read_stdin()?,
            };
            let paths = parse_batch(&input)?;
            if strict {
                let results: BTreeMap<String, Value> = engine
                    .try_batch_read(&paths)
                    .into_iter()
                    .map(|(path, result)| {
                        let value = match result {
                            Ok(data) => Value::String(engine.encode(&data)),
                            Err(e) => error_value(&e),
                        };
                        (path, value)
                    })
                    .collect();
                to_json(&results)
            } else {
                to_json(&engine.batch_extract(&paths))
            }
        }
        Cmd::Expand { expression } => {
            let entries = if strict {
                engine.try_expand(expression)?
            } else {
                engine.expand(expression)
            };
            listing(&entries)
        }
        Cmd::FileInfo { path } => {
            if strict {
                to_json(&analysis::try_file_info(&engine, path, &PeHeaderAnalyzer)?)
            } else {
                match analysis::file_info(&engine, path, &PeHeaderAnalyzer) {
                    Some(report) => to_json(&report),
                    None => Ok("{}".to_string()),
                }
            }
        }
        Cmd::Collect { plan } => {
            let content = std::fs::read_to_string(plan)
                .map_err(|e| EngineError::Config(format!("Failed to read '{}': {}", plan.display(), e)))?;
            let planned: Vec<PlannedPattern> = serde_json::from_str(&content)
                .map_err(|e| EngineError::Config(format!("Failed to parse '{}': {}", plan.display(), e)))?;

            let mut collection = CollectionPlan::new(engine.config().volumes.keys().cloned().collect());
            for p in &planned {
                collection.add_pattern(&p.artifact, &p.pattern, p.source);
            }
            to_json(&collection.collect(&engine, &PeHeaderAnalyzer))
        }
    }
}

/// Parse arguments, run the command and print its payload
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    cli.init_logging();

    match execute(&cli) {
        Ok(payload) => {
            println!("{}", payload);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = e.kind_name(), error = %e, "Command failed");
            println!("{}", error_value(&e));
            ExitCode::FAILURE
        }
    }
}
