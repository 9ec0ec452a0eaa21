//! Entry classification
//!
//! Maps driver metadata onto [`EntryKind`]. Missing metadata is normal on damaged
//! images and never an error: kind falls back to `Unknown`, size to 0.

use crate::address::DeviceAddress;
use crate::driver::{RawEntry, RawMetaType};

use super::types::{Entry, EntryKind};

pub fn classify(raw: &RawEntry) -> EntryKind {
    match raw.meta.and_then(|m| m.meta_type) {
        Some(RawMetaType::Directory) => EntryKind::Directory,
        Some(RawMetaType::Regular) => EntryKind::Regular,
        Some(RawMetaType::Symlink) => EntryKind::Symlink,
        Some(RawMetaType::VirtualDirectory) => EntryKind::VirtualDirectory,
        Some(RawMetaType::Other(_)) | None => EntryKind::Unknown,
    }
}

pub fn entry_size(raw: &RawEntry) -> u64 {
    raw.meta.and_then(|m| m.size).unwrap_or(0)
}

/// Materialize an [`Entry`] for `raw` listed under `parent_path`
pub(crate) fn annotate(address: &DeviceAddress, parent_path: &str, raw: RawEntry) -> Entry {
    let name = raw.display_name();
    Entry {
        path: address.join(parent_path, &name),
        kind: classify(&raw),
        size: entry_size(&raw),
        name,
        raw,
    }
}
