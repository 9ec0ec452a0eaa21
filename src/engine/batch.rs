//! Batch extraction
//!
//! Reads the whole content of many paths in one call. Paths are independent: each
//! one resolves its own address and opens its own handle, so one missing or broken
//! path never affects the others. With `parallel_batch` enabled the paths are
//! spread over the rayon pool.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::driver::FilesystemDriver;
use crate::error::EngineResult;

use super::Engine;

/// Parse a batch request: a JSON array of path strings
pub fn parse_batch(input: &str) -> EngineResult<Vec<String>> {
    Ok(serde_json::from_str::<Vec<String>>(input)?)
}

impl<D: FilesystemDriver> Engine<D> {
    /// Per-path outcome of a batch read
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub fn try_batch_read(&self, paths: &[String]) -> BTreeMap<String, EngineResult<Vec<u8>>> {
        let read = |path: &String| (path.clone(), self.try_read_all(path));
        let results: BTreeMap<String, EngineResult<Vec<u8>>> = if self.config().parallel_batch {
            paths.par_iter().map(read).collect()
        } else {
            paths.iter().map(read).collect()
        };

        let failed = results.values().filter(|r| r.is_err()).count();
        info!(paths = results.len(), failed, "Batch read complete");
        results
    }

    /// Raw bytes per path; empty on failure
    pub fn batch_read(&self, paths: &[String]) -> BTreeMap<String, Vec<u8>> {
        self.try_batch_read(paths)
            .into_iter()
            .map(|(path, result)| {
                let data = result.unwrap_or_else(|e| {
                    debug!(path = %path, kind = e.kind_name(), error = %e, "Batch entry collapsed");
                    Vec::new()
                });
                (path, data)
            })
            .collect()
    }

    /// Encoded payload per path; empty on failure
    pub fn batch_extract(&self, paths: &[String]) -> BTreeMap<String, String> {
        self.batch_read(paths)
            .into_iter()
            .map(|(path, data)| {
                let payload = self.encode(&data);
                (path, payload)
            })
            .collect()
    }

    /// Batch extraction from a JSON request; malformed input is the only whole-call failure
    pub fn batch_extract_json(&self, input: &str) -> EngineResult<BTreeMap<String, String>> {
        let paths = parse_batch(input)?;
        Ok(self.batch_extract(&paths))
    }
}
