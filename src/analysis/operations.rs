//! File report generation

use chrono::{SecondsFormat, Utc};
use tracing::{debug, instrument, warn};

use super::pe::{ExecutableAnalyzer, MAX_PE_SIZE};
use super::types::FileReport;
use crate::common::hash::DigestSet;
use crate::common::magic;
use crate::config::EngineConfig;
use crate::driver::{FilesystemDriver, FsHandle};
use crate::engine::{reader, Engine, Entry};
use crate::error::EngineResult;

/// Bytes kept for type sniffing
const SNIFF_SIZE: usize = 512;

/// Build a report for an entry resolved on an open handle, reading its content once
pub(crate) fn report_entry(
    fs: &dyn FsHandle,
    entry: Entry,
    config: &EngineConfig,
    analyzer: &dyn ExecutableAnalyzer,
) -> EngineResult<FileReport> {
    let algorithms = config.digest_algorithms()?;
    let mut digests = DigestSet::new(&algorithms);
    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_SIZE);
    let mut pe_buffer: Option<Vec<u8>> = None;
    let mut pe_skipped = false;
    let mut bytes_read = 0u64;

    reader::stream_content(fs, &entry, config.max_extract_size, |block| {
        digests.update(block);
        if bytes_read == 0 && magic::is_mz(block) {
            pe_buffer = Some(Vec::new());
        }
        bytes_read += block.len() as u64;

        if head.len() < SNIFF_SIZE {
            let take = (SNIFF_SIZE - head.len()).min(block.len());
            head.extend_from_slice(&block[..take]);
        }
        let overflow = pe_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.len() + block.len() > MAX_PE_SIZE);
        if overflow {
            pe_buffer = None;
            pe_skipped = true;
        } else if let Some(buffer) = pe_buffer.as_mut() {
            buffer.extend_from_slice(block);
        }
    })?;

    if pe_skipped {
        warn!(path = %entry.path, size = entry.size, "Executable exceeds buffer threshold, skipping header parse");
    }
    let pe = pe_buffer.map(|buffer| analyzer.analyze(&buffer));
    let mime_type = magic::mime_type(&head).to_string();
    debug!(path = %entry.path, mime = %mime_type, bytes_read, "File report ready");

    Ok(FileReport {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        path: entry.path,
        size: entry.size,
        bytes_read,
        mime_type,
        hash: digests.finalize(),
        pe,
    })
}

/// Build a report for `path`
#[instrument(skip(engine, analyzer))]
pub fn try_file_info<D: FilesystemDriver>(
    engine: &Engine<D>,
    path: &str,
    analyzer: &dyn ExecutableAnalyzer,
) -> EngineResult<FileReport> {
    engine.with_entry(path, |fs, _, entry| report_entry(fs, entry, engine.config(), analyzer))
}

/// Collapsing variant: `None` on any failure
pub fn file_info<D: FilesystemDriver>(
    engine: &Engine<D>,
    path: &str,
    analyzer: &dyn ExecutableAnalyzer,
) -> Option<FileReport> {
    match try_file_info(engine, path, analyzer) {
        Ok(report) => Some(report),
        Err(e) => {
            debug!(path, kind = e.kind_name(), error = %e, "File report unavailable");
            None
        }
    }
}
