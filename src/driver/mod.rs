//! Filesystem driver capability
//!
//! The engine never interprets on-disk structures. Everything below the logical
//! path layer is delegated to a driver that can:
//!
//! ```text
//! FilesystemDriver::open(address)   -> FsHandle        (one per resolution call)
//! FsHandle::open_root()             -> RawEntry        (the root directory)
//! FsHandle::as_directory(entry)     -> DirRef          (fails for non-directories)
//! FsHandle::entries(dir)            -> Vec<RawEntry>   (driver enumeration order)
//! FsHandle::read_random(entry, ..)  -> Vec<u8>         (may short-read near EOF)
//! ```
//!
//! Entries are inode-addressed so handles carry no borrowed state and are dropped
//! as soon as the call that opened them returns.
//!
//! Two drivers ship with the crate:
//! - [`memory`]: an in-memory inode tree, also used as a hostile-image fixture
//! - [`mounted`]: a host directory where an image has been mounted or exported

pub mod memory;
pub mod mounted;

use std::io;

use crate::address::DeviceAddress;

pub use memory::{MemoryDriver, MemoryImage};
pub use mounted::MountedVolumeDriver;

/// Inode number as reported by the driver
pub type Inode = u64;

/// Metadata type as reported by the driver (TSK-style)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMetaType {
    Regular,
    Directory,
    Symlink,
    VirtualDirectory,
    /// Pipes, sockets, devices, shadow entries...
    Other(u8),
}

/// Entry metadata; any field may be missing on a damaged image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMetadata {
    pub meta_type: Option<RawMetaType>,
    pub size: Option<u64>,
}

impl RawMetadata {
    pub fn new(meta_type: RawMetaType, size: u64) -> Self {
        Self {
            meta_type: Some(meta_type),
            size: Some(size),
        }
    }
}

/// One directory entry exactly as the driver enumerated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Name bytes; not guaranteed to be UTF-8
    pub name: Vec<u8>,
    pub inode: Inode,
    pub meta: Option<RawMetadata>,
}

impl RawEntry {
    /// Display name, lossily decoded
    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// `.` and `..` are never surfaced by the engine
    pub fn is_dot_entry(&self) -> bool {
        self.name == b"." || self.name == b".."
    }
}

/// Opened directory, ready for enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirRef(pub Inode);

/// A filesystem opened on one device, scoped to a single resolution call
pub trait FsHandle {
    fn open_root(&self) -> io::Result<RawEntry>;

    fn as_directory(&self, entry: &RawEntry) -> io::Result<DirRef>;

    fn entries(&self, dir: DirRef) -> io::Result<Vec<RawEntry>>;

    /// Read at most `length` bytes from `offset`
    fn read_random(&self, entry: &RawEntry, offset: u64, length: usize) -> io::Result<Vec<u8>>;
}

/// Opens filesystems for device addresses.
/// Implementations must allow concurrent read-only opens of the same device.
pub trait FilesystemDriver: Send + Sync {
    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn FsHandle>>;
}

pub(crate) fn not_a_directory(inode: Inode) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("inode {} is not a directory", inode))
}
