//! Content reader
//!
//! Random-access and whole-file reads over a resolved entry. Reads never extend past
//! the size the driver reported: the requested length is clamped to
//! `size - offset`, and an offset at or beyond the size yields no bytes.

use tracing::trace;

use crate::driver::FsHandle;
use crate::error::{EngineError, EngineResult};

use super::types::Entry;

/// Block size for whole-file reads (1 MiB)
pub const READ_BLOCK_SIZE: usize = 1024 * 1024;

/// Read at most `length` bytes starting at `offset`
pub fn read_chunk(fs: &dyn FsHandle, entry: &Entry, offset: u64, length: usize) -> EngineResult<Vec<u8>> {
    if offset >= entry.size || length == 0 {
        return Ok(Vec::new());
    }
    let remaining = entry.size - offset;
    let length = usize::try_from(remaining).map_or(length, |r| r.min(length));
    trace!(path = %entry.path, offset, length, "Reading chunk");
    fs.read_random(&entry.raw, offset, length)
        .map_err(|source| EngineError::read(&entry.path, source))
}

/// Stream the whole content of `entry` block by block.
///
/// Stops early when the driver returns a short or empty block (truncated
/// content). Returns the number of bytes delivered to `visit`.
pub fn stream_content<F>(fs: &dyn FsHandle, entry: &Entry, limit: Option<u64>, mut visit: F) -> EngineResult<u64>
where
    F: FnMut(&[u8]),
{
    if let Some(limit) = limit {
        if entry.size > limit {
            return Err(EngineError::TooLarge {
                path: entry.path.clone(),
                size: entry.size,
                limit,
            });
        }
    }

    let mut offset = 0u64;
    while offset < entry.size {
        let block = read_chunk(fs, entry, offset, READ_BLOCK_SIZE)?;
        if block.is_empty() {
            break;
        }
        visit(&block);
        offset += block.len() as u64;
    }
    if offset < entry.size {
        trace!(path = %entry.path, read = offset, size = entry.size, "Short read");
    }
    Ok(offset)
}

/// Read the whole content of `entry` into memory
pub fn read_all(fs: &dyn FsHandle, entry: &Entry, limit: Option<u64>) -> EngineResult<Vec<u8>> {
    let capacity = usize::try_from(entry.size).unwrap_or(0).min(READ_BLOCK_SIZE * 16);
    let mut data = Vec::with_capacity(capacity);
    stream_content(fs, entry, limit, |block| data.extend_from_slice(block))?;
    Ok(data)
}
