//! Path walker
//!
//! Resolves a logical path to a single entry by descending from the root one
//! segment at a time. Matching is case-insensitive and first-match: when several
//! entries collide under case folding, the first one in driver enumeration order
//! wins.

use tracing::trace;

use crate::address::DeviceAddress;
use crate::driver::FsHandle;
use crate::error::{EngineError, EngineResult};

use super::classify::annotate;
use super::types::Entry;

/// Case-insensitive name comparison
pub(crate) fn names_match(name: &str, segment: &str) -> bool {
    name == segment || name.to_lowercase() == segment.to_lowercase()
}

/// Entry for the root directory of the opened device
pub(crate) fn root_entry(fs: &dyn FsHandle, address: &DeviceAddress) -> EngineResult<Entry> {
    let raw = fs.open_root().map_err(|source| EngineError::DriverOpen {
        device: address.driver_key().to_string(),
        source,
    })?;
    let mut entry = annotate(address, &address.mountpoint, raw);
    entry.name = "root".to_string();
    entry.path = address.mountpoint.clone();
    Ok(entry)
}

/// Children of `dir`, without `.` and `..`
pub(crate) fn list_children(
    fs: &dyn FsHandle,
    address: &DeviceAddress,
    dir: &Entry,
) -> EngineResult<Vec<Entry>> {
    let handle = fs.as_directory(&dir.raw).map_err(|source| EngineError::NotADirectory {
        path: dir.path.clone(),
        source,
    })?;
    let raw_entries = fs
        .entries(handle)
        .map_err(|source| EngineError::read(&dir.path, source))?;
    Ok(raw_entries
        .into_iter()
        .filter(|raw| !raw.is_dot_entry())
        .map(|raw| annotate(address, &dir.path, raw))
        .collect())
}

/// Resolve `path` to exactly one entry
pub fn walk(fs: &dyn FsHandle, address: &DeviceAddress, path: &str) -> EngineResult<Entry> {
    let segments = address.segments(path);
    let mut current = root_entry(fs, address)?;

    for segment in segments {
        let children = list_children(fs, address, &current)?;
        current = children
            .into_iter()
            .find(|child| names_match(&child.name, segment))
            .ok_or_else(|| EngineError::EntryNotFound {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        trace!(segment, matched = %current.path, "Segment resolved");
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Addressing;
    use crate::driver::memory::Fault;
    use crate::driver::{FilesystemDriver, MemoryDriver, MemoryImage, RawMetaType, RawMetadata};
    use crate::engine::types::EntryKind;

    fn open(image: MemoryImage) -> (MemoryDriver, DeviceAddress) {
        let address = Addressing::SingleRoot.resolve("/").unwrap();
        (MemoryDriver::new().with_volume("/", image), address)
    }

    #[test]
    fn test_case_insensitive_resolution() {
        let mut image = MemoryImage::new();
        let docs = image.add_dir(image.root(), "Docs");
        image.add_file(docs, "Report.TXT", b"quarterly");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let entry = walk(fs.as_ref(), &address, "/docs/report.txt").unwrap();
        assert_eq!(entry.name, "Report.TXT");
        assert_eq!(entry.path, "/Docs/Report.TXT");
        assert_eq!(entry.kind, EntryKind::Regular);
        assert_eq!(entry.size, 9);
    }

    #[test]
    fn test_empty_remainder_is_root() {
        let (driver, address) = open(MemoryImage::new());
        let fs = driver.open(&address).unwrap();
        let entry = walk(fs.as_ref(), &address, "/").unwrap();
        assert_eq!(entry.name, "root");
        assert_eq!(entry.path, "/");
        assert_eq!(entry.kind, EntryKind::Directory);
    }

    #[test]
    fn test_first_match_wins_on_collision() {
        let mut image = MemoryImage::new();
        image.add_file(image.root(), "NTUSER.DAT", b"first");
        image.add_file(image.root(), "ntuser.dat", b"second one");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let entry = walk(fs.as_ref(), &address, "/NtUser.Dat").unwrap();
        assert_eq!(entry.name, "NTUSER.DAT");
        assert_eq!(entry.size, 5);
    }

    #[test]
    fn test_missing_segment() {
        let mut image = MemoryImage::new();
        image.add_dir(image.root(), "a");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let err = walk(fs.as_ref(), &address, "/a/b/c").unwrap_err();
        match err {
            EngineError::EntryNotFound { segment, .. } => assert_eq!(segment, "b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_descend_through_file_fails() {
        let mut image = MemoryImage::new();
        image.add_file(image.root(), "file", b"x");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let err = walk(fs.as_ref(), &address, "/file/child").unwrap_err();
        assert!(matches!(err, EngineError::NotADirectory { .. }));
    }

    #[test]
    fn test_interior_symlink_is_not_followed() {
        let mut image = MemoryImage::new();
        let real = image.add_dir(image.root(), "real");
        image.add_file(real, "f", b"x");
        image.add_symlink(image.root(), "alias", "real");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let err = walk(fs.as_ref(), &address, "/alias/f").unwrap_err();
        assert!(matches!(err, EngineError::NotADirectory { .. }));
        assert_eq!(walk(fs.as_ref(), &address, "/alias").unwrap().kind, EntryKind::Symlink);
    }

    #[test]
    fn test_dot_segments_never_match() {
        let mut image = MemoryImage::new();
        let dir = image.add_dir(image.root(), "d");
        image.add_dot_entries(dir, 0);
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        assert!(walk(fs.as_ref(), &address, "/d/..").unwrap_err().is_not_found());
        assert!(walk(fs.as_ref(), &address, "/d/.").unwrap_err().is_not_found());
    }

    #[test]
    fn test_listing_failure_is_read_error() {
        let mut image = MemoryImage::new();
        let dir = image.add_dir(image.root(), "d");
        image.set_fault(dir, Fault::FailListing);
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let err = walk(fs.as_ref(), &address, "/d/x").unwrap_err();
        assert!(matches!(err, EngineError::Read { .. }));
    }

    #[test]
    fn test_metadata_less_entry_resolves() {
        let mut image = MemoryImage::new();
        image.add_raw(image.root(), b"orphan", None, b"");
        image.add_raw(
            image.root(),
            b"\xffbad",
            Some(RawMetadata::new(RawMetaType::Regular, 1)),
            b"z",
        );
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let orphan = walk(fs.as_ref(), &address, "/orphan").unwrap();
        assert_eq!(orphan.kind, EntryKind::Unknown);
        assert_eq!(orphan.size, 0);
        assert!(walk(fs.as_ref(), &address, "/\u{FFFD}bad").is_ok());
    }

    #[test]
    fn test_drive_letter_walk() {
        let mut image = MemoryImage::new();
        let windows = image.add_dir(image.root(), "Windows");
        image.add_file(windows, "win.ini", b"[fonts]");
        let driver = MemoryDriver::new().with_volume("\\\\.\\C:", image);
        let address = Addressing::DriveLetter.resolve("c:\\windows\\WIN.INI").unwrap();
        let fs = driver.open(&address).unwrap();

        let entry = walk(fs.as_ref(), &address, "c:\\windows\\WIN.INI").unwrap();
        assert_eq!(entry.path, "C:\\Windows\\win.ini");
    }

    #[test]
    fn test_descends_through_virtual_directory() {
        let mut image = MemoryImage::new();
        let orphans = image.add_virtual_dir(image.root(), "$OrphanFiles");
        image.add_file(orphans, "lost.bin", b"lost");
        let (driver, address) = open(image);
        let fs = driver.open(&address).unwrap();

        let dir = walk(fs.as_ref(), &address, "/$orphanfiles").unwrap();
        assert_eq!(dir.kind, EntryKind::VirtualDirectory);
        assert!(dir.kind.is_directory());
        let file = walk(fs.as_ref(), &address, "/$OrphanFiles/LOST.bin").unwrap();
        assert_eq!(file.size, 4);
    }
}
