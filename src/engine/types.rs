//! Type definitions for the path engine

use serde::Serialize;

use crate::driver::RawEntry;

/// Closed set of entry kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    Regular,
    Symlink,
    VirtualDirectory,
    Unknown,
}

impl EntryKind {
    /// Directory or virtual directory
    pub fn is_directory(self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::VirtualDirectory)
    }

    /// Short tag used on the wire (`DIR`, `REG`, `LNK`, `VIRT_DIR`, empty for unknown)
    pub fn meta_tag(self) -> &'static str {
        match self {
            EntryKind::Directory => "DIR",
            EntryKind::Regular => "REG",
            EntryKind::Symlink => "LNK",
            EntryKind::VirtualDirectory => "VIRT_DIR",
            EntryKind::Unknown => "",
        }
    }
}

/// A resolved directory entry
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Driver-level entry, kept for follow-up reads within the same call
    #[serde(skip)]
    pub(crate) raw: RawEntry,
}

/// Root of a mounted device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootInfo {
    pub name: String,
    pub path: String,
}

/// `get_root` reply: the root, or an error object when the device cannot be opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RootReply {
    Root(RootInfo),
    Error { error: String },
}

/// Listing row as sent over the wire, with the short type tag
#[derive(Debug, Clone, Serialize)]
pub struct ListingRow<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub kind: EntryKind,
    pub meta_type: &'static str,
    pub size: u64,
}

impl Entry {
    pub fn listing_row(&self) -> ListingRow<'_> {
        ListingRow {
            name: &self.name,
            path: &self.path,
            kind: self.kind,
            meta_type: self.kind.meta_tag(),
            size: self.size,
        }
    }
}
