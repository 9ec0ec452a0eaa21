//! Mounted-volume driver
//!
//! Serves images that have been mounted read-only or exported to a host directory
//! (e.g. `ewfmount` + `mount -o ro,loop`). Each mountpoint must be mapped
//! explicitly to a host directory; unmapped mountpoints fail to open, so the live
//! host filesystem is never reachable by accident.
//!
//! Links inside the image are never followed: classification uses
//! `symlink_metadata`, and symlinks can neither be listed nor read.

use std::cell::RefCell;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::{not_a_directory, DirRef, FilesystemDriver, FsHandle, Inode, RawEntry, RawMetaType, RawMetadata};
use crate::address::DeviceAddress;

/// Driver mapping mountpoints to host directories
#[derive(Debug, Clone, Default)]
pub struct MountedVolumeDriver {
    volumes: Vec<(String, PathBuf)>,
}

fn volume_key(mountpoint: &str) -> String {
    mountpoint
        .trim_end_matches(|c: char| c == '/' || c == '\\')
        .to_lowercase()
}

impl MountedVolumeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `mountpoint` (e.g. `"/"` or `"C:\"`) to the directory holding the image
    pub fn with_volume(mut self, mountpoint: &str, dir: impl Into<PathBuf>) -> Self {
        let key = volume_key(mountpoint);
        let dir = dir.into();
        match self.volumes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = dir,
            None => self.volumes.push((key, dir)),
        }
        self
    }

    fn host_dir(&self, mountpoint: &str) -> Option<&Path> {
        let key = volume_key(mountpoint);
        self.volumes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, dir)| dir.as_path())
    }
}

impl FilesystemDriver for MountedVolumeDriver {
    fn open(&self, address: &DeviceAddress) -> io::Result<Box<dyn FsHandle>> {
        let dir = self.host_dir(&address.mountpoint).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no volume mapped for mountpoint '{}'", address.mountpoint),
            )
        })?;
        let meta = fs::symlink_metadata(dir)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("volume root '{}' is not a directory", dir.display()),
            ));
        }
        debug!(mountpoint = %address.mountpoint, root = %dir.display(), "Opened mounted volume");
        Ok(Box::new(MountedHandle {
            table: RefCell::new(vec![dir.to_path_buf()]),
        }))
    }
}

/// Inodes are indexes into a per-handle path table
struct MountedHandle {
    table: RefCell<Vec<PathBuf>>,
}

impl MountedHandle {
    fn path_of(&self, inode: Inode) -> io::Result<PathBuf> {
        self.table
            .borrow()
            .get(inode as usize)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("stale inode {}", inode)))
    }

    fn register(&self, path: PathBuf) -> Inode {
        let mut table = self.table.borrow_mut();
        table.push(path);
        (table.len() - 1) as Inode
    }
}

fn raw_metadata(meta: &Metadata) -> RawMetadata {
    let file_type = meta.file_type();
    let meta_type = if file_type.is_symlink() {
        RawMetaType::Symlink
    } else if file_type.is_dir() {
        RawMetaType::Directory
    } else if file_type.is_file() {
        RawMetaType::Regular
    } else {
        RawMetaType::Other(0)
    };
    let size = if meta_type == RawMetaType::Directory { 0 } else { meta.len() };
    RawMetadata::new(meta_type, size)
}

#[cfg(unix)]
fn name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

impl FsHandle for MountedHandle {
    fn open_root(&self) -> io::Result<RawEntry> {
        let root = self.path_of(0)?;
        let meta = fs::symlink_metadata(&root)?;
        Ok(RawEntry {
            name: Vec::new(),
            inode: 0,
            meta: Some(raw_metadata(&meta)),
        })
    }

    fn as_directory(&self, entry: &RawEntry) -> io::Result<DirRef> {
        let path = self.path_of(entry.inode)?;
        if fs::symlink_metadata(&path)?.is_dir() {
            Ok(DirRef(entry.inode))
        } else {
            Err(not_a_directory(entry.inode))
        }
    }

    fn entries(&self, dir: DirRef) -> io::Result<Vec<RawEntry>> {
        let path = self.path_of(dir.0)?;
        let mut out = Vec::new();
        for item in fs::read_dir(&path)? {
            let item = item?;
            let child = item.path();
            // Metadata can vanish or be unreadable; the entry is still surfaced
            let meta = fs::symlink_metadata(&child).ok().map(|m| raw_metadata(&m));
            let name = name_bytes(&item.file_name());
            let inode = self.register(child);
            out.push(RawEntry { name, inode, meta });
        }
        trace!(dir = %path.display(), count = out.len(), "Listed host directory");
        Ok(out)
    }

    fn read_random(&self, entry: &RawEntry, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let path = self.path_of(entry.inode)?;
        if !fs::symlink_metadata(&path)?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "random reads are only served for regular files",
            ));
        }
        let mut file = File::open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = Vec::with_capacity(length.min(1024 * 1024));
        file.take(length as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}
