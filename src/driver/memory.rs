//! In-memory filesystem driver
//!
//! Builds an inode tree in memory. Besides well-formed trees it can express the
//! damage found on real evidence: entries without metadata, non-UTF-8 names, case
//! collisions, `.`/`..` in arbitrary positions, directory cycles, truncated content
//! and read/listing failures.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{not_a_directory, DirRef, FilesystemDriver, FsHandle, Inode, RawEntry, RawMetaType, RawMetadata};
use crate::address::DeviceAddress;

/// Simulated damage attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every `read_random` fails
    FailReads,
    /// Directory enumeration fails
    FailListing,
    /// Only the first N content bytes are readable (metadata may claim more)
    Truncate(usize),
}

#[derive(Debug, Clone, Default)]
struct Node {
    meta: Option<RawMetadata>,
    directory: bool,
    children: Vec<(Vec<u8>, Inode)>,
    content: Vec<u8>,
    fault: Option<Fault>,
}

/// An in-memory filesystem image
#[derive(Debug, Clone)]
pub struct MemoryImage {
    nodes: Vec<Node>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImage {
    /// Root directory is inode 0
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                meta: Some(RawMetadata::new(RawMetaType::Directory, 0)),
                directory: true,
                ..Node::default()
            }],
        }
    }

    pub fn root(&self) -> Inode {
        0
    }

    fn push(&mut self, parent: Inode, name: &[u8], node: Node) -> Inode {
        let inode = self.nodes.len() as Inode;
        self.nodes.push(node);
        self.link(parent, name, inode);
        inode
    }

    /// Add a directory entry named `name` pointing at an existing inode
    pub fn link(&mut self, parent: Inode, name: &[u8], target: Inode) {
        if let Some(dir) = self.nodes.get_mut(parent as usize) {
            dir.children.push((name.to_vec(), target));
        }
    }

    pub fn add_dir(&mut self, parent: Inode, name: &str) -> Inode {
        self.push(
            parent,
            name.as_bytes(),
            Node {
                meta: Some(RawMetadata::new(RawMetaType::Directory, 0)),
                directory: true,
                ..Node::default()
            },
        )
    }

    pub fn add_virtual_dir(&mut self, parent: Inode, name: &str) -> Inode {
        self.push(
            parent,
            name.as_bytes(),
            Node {
                meta: Some(RawMetadata::new(RawMetaType::VirtualDirectory, 0)),
                directory: true,
                ..Node::default()
            },
        )
    }

    pub fn add_file(&mut self, parent: Inode, name: &str, content: &[u8]) -> Inode {
        self.push(
            parent,
            name.as_bytes(),
            Node {
                meta: Some(RawMetadata::new(RawMetaType::Regular, content.len() as u64)),
                content: content.to_vec(),
                ..Node::default()
            },
        )
    }

    /// Symlink whose content is the target path; never opened as a directory
    pub fn add_symlink(&mut self, parent: Inode, name: &str, target: &str) -> Inode {
        self.push(
            parent,
            name.as_bytes(),
            Node {
                meta: Some(RawMetadata::new(RawMetaType::Symlink, target.len() as u64)),
                content: target.as_bytes().to_vec(),
                ..Node::default()
            },
        )
    }

    /// Arbitrary entry: raw name bytes, optional metadata, raw content
    pub fn add_raw(
        &mut self,
        parent: Inode,
        name: &[u8],
        meta: Option<RawMetadata>,
        content: &[u8],
    ) -> Inode {
        let directory = matches!(
            meta.and_then(|m| m.meta_type),
            Some(RawMetaType::Directory) | Some(RawMetaType::VirtualDirectory)
        );
        self.push(
            parent,
            name,
            Node {
                meta,
                directory,
                content: content.to_vec(),
                ..Node::default()
            },
        )
    }

    /// Add `.` and `..` entries to `dir`, in front of its existing children
    pub fn add_dot_entries(&mut self, dir: Inode, parent: Inode) {
        if let Some(node) = self.nodes.get_mut(dir as usize) {
            node.children.insert(0, (b"..".to_vec(), parent));
            node.children.insert(0, (b".".to_vec(), dir));
        }
    }

    pub fn set_fault(&mut self, inode: Inode, fault: Fault) {
        if let Some(node) = self.nodes.get_mut(inode as usize) {
            node.fault = Some(fault);
        }
    }

    fn node(&self, inode: Inode) -> io::Result<&Node> {
        self.nodes.get(inode as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("inode {} out of range", inode))
        })
    }

    fn raw_entry(&self, name: &[u8], inode: Inode) -> RawEntry {
        RawEntry {
            name: name.to_vec(),
            inode,
            meta: self.nodes.get(inode as usize).and_then(|n| n.meta),
        }
    }
}

/// Driver serving [`MemoryImage`]s keyed by device identifier
#[derive(Default)]
pub struct MemoryDriver {
    volumes: HashMap<String, Arc<MemoryImage>>,
    live_handles: Arc<AtomicUsize>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under a driver key (`"/"`, `"\\.\C:"`, ...)
    pub fn with_volume(mut self, key: &str, image: MemoryImage) -> Self {
        self.volumes.insert(key.to_string(), Arc::new(image));
        self
    }

    /// Handles opened and not yet dropped
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }
}

impl FilesystemDriver for MemoryDriver {
    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn FsHandle>> {
        let image = self.volumes.get(address.driver_key()).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no image registered for '{}'", address.driver_key()),
            )
        })?;
        self.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryHandle {
            image,
            live_handles: Arc::clone(&self.live_handles),
        }))
    }
}

struct MemoryHandle {
    image: Arc<MemoryImage>,
    live_handles: Arc<AtomicUsize>,
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FsHandle for MemoryHandle {
    fn open_root(&self) -> io::Result<RawEntry> {
        let root = self.image.root();
        Ok(self.image.raw_entry(b"", root))
    }

    fn as_directory(&self, entry: &RawEntry) -> io::Result<DirRef> {
        if self.image.node(entry.inode)?.directory {
            Ok(DirRef(entry.inode))
        } else {
            Err(not_a_directory(entry.inode))
        }
    }

    fn entries(&self, dir: DirRef) -> io::Result<Vec<RawEntry>> {
        let node = self.image.node(dir.0)?;
        if !node.directory {
            return Err(not_a_directory(dir.0));
        }
        if node.fault == Some(Fault::FailListing) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt directory index"));
        }
        Ok(node
            .children
            .iter()
            .map(|(name, inode)| self.image.raw_entry(name, *inode))
            .collect())
    }

    fn read_random(&self, entry: &RawEntry, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let node = self.image.node(entry.inode)?;
        if node.directory {
            return Err(io::Error::new(io::ErrorKind::Other, "cannot read a directory"));
        }
        let readable = match node.fault {
            Some(Fault::FailReads) => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "unreadable data run"))
            }
            Some(Fault::Truncate(n)) => &node.content[..n.min(node.content.len())],
            _ => &node.content[..],
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(readable.len());
        let end = start.saturating_add(length).min(readable.len());
        Ok(readable[start..end].to_vec())
    }
}
