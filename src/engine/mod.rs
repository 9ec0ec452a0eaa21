//! Path resolution and extraction engine
//!
//! Every operation is independent: it resolves the device address, opens a
//! filesystem handle through the driver, does its work and drops the handle before
//! returning. Nothing is cached between calls.
//!
//! Two APIs are offered over the same machinery:
//!
//! ```text
//! try_*  (strict)      EngineResult<T>, "not found" distinguishable from I/O failure
//! *      (collapsing)  false / 0 / empty on any failure, logged at debug level
//! ```

mod batch;
pub mod classify;
pub mod pattern;
pub mod reader;
mod types;
pub mod walker;

pub use batch::parse_batch;
pub use types::{Entry, EntryKind, ListingRow, RootInfo, RootReply};

use tracing::{debug, instrument};

use crate::address::{Addressing, DeviceAddress};
use crate::config::EngineConfig;
use crate::driver::{FilesystemDriver, FsHandle};
use crate::error::{EngineError, EngineResult};

/// Path engine over a filesystem driver
pub struct Engine<D> {
    driver: D,
    addressing: Addressing,
    config: EngineConfig,
}

fn collapse<T>(operation: &str, path: &str, result: EngineResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(operation, path, kind = e.kind_name(), error = %e, "Collapsed to fallback");
            fallback
        }
    }
}

impl<D: FilesystemDriver> Engine<D> {
    /// Engine with default configuration and an explicit addressing convention
    pub fn new(driver: D, addressing: Addressing) -> Self {
        Self {
            driver,
            addressing,
            config: EngineConfig::default(),
        }
    }

    /// Engine whose addressing is fixed from `config`
    pub fn with_config(driver: D, config: EngineConfig) -> Self {
        Self {
            driver,
            addressing: config.addressing.resolve(),
            config,
        }
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Encode a payload with the configured transport encoding
    pub fn encode(&self, data: &[u8]) -> String {
        self.config.encoding.encode(data)
    }

    fn open(&self, path: &str) -> EngineResult<(DeviceAddress, Box<dyn FsHandle>)> {
        let address = self.addressing.resolve(path)?;
        let fs = self.driver.open(&address).map_err(|source| EngineError::DriverOpen {
            device: address.driver_key().to_string(),
            source,
        })?;
        Ok((address, fs))
    }

    /// Resolve `path` and hand the entry to `f` while the handle is open
    pub(crate) fn with_entry<T, F>(&self, path: &str, f: F) -> EngineResult<T>
    where
        F: FnOnce(&dyn FsHandle, &DeviceAddress, Entry) -> EngineResult<T>,
    {
        let (address, fs) = self.open(path)?;
        let entry = walker::walk(fs.as_ref(), &address, path)?;
        f(fs.as_ref(), &address, entry)
    }

    // =========================================================================
    // Strict API
    // =========================================================================

    #[instrument(skip(self))]
    pub fn try_get_root(&self, mountpoint: &str) -> EngineResult<RootInfo> {
        let (address, fs) = self.open(mountpoint)?;
        walker::root_entry(fs.as_ref(), &address)?;
        Ok(RootInfo {
            name: "root".to_string(),
            path: address.mountpoint,
        })
    }

    /// Resolve `path` to its entry
    #[instrument(skip(self))]
    pub fn try_entry(&self, path: &str) -> EngineResult<Entry> {
        self.with_entry(path, |_, _, entry| Ok(entry))
    }

    #[instrument(skip(self))]
    pub fn try_list_directory(&self, path: &str) -> EngineResult<Vec<Entry>> {
        self.with_entry(path, |fs, address, entry| walker::list_children(fs, address, &entry))
    }

    pub fn try_is_directory(&self, path: &str) -> EngineResult<bool> {
        Ok(self.try_entry(path)?.kind.is_directory())
    }

    pub fn try_is_file(&self, path: &str) -> EngineResult<bool> {
        Ok(self.try_entry(path)?.kind == EntryKind::Regular)
    }

    pub fn try_is_symlink(&self, path: &str) -> EngineResult<bool> {
        Ok(self.try_entry(path)?.kind == EntryKind::Symlink)
    }

    pub fn try_get_size(&self, path: &str) -> EngineResult<u64> {
        Ok(self.try_entry(path)?.size)
    }

    /// Read up to `length` bytes at `offset`; `length` is capped by `max_chunk_size`
    #[instrument(skip(self))]
    pub fn try_read_chunk(&self, path: &str, offset: u64, length: usize) -> EngineResult<Vec<u8>> {
        let length = length.min(self.config.max_chunk_size);
        self.with_entry(path, |fs, _, entry| reader::read_chunk(fs, &entry, offset, length))
    }

    /// Whole content of `path`, subject to `max_extract_size`
    #[instrument(skip(self))]
    pub fn try_read_all(&self, path: &str) -> EngineResult<Vec<u8>> {
        let limit = self.config.max_extract_size;
        self.with_entry(path, |fs, _, entry| reader::read_all(fs, &entry, limit))
    }

    /// Expand a path expression with globs and recursive markers
    #[instrument(skip(self))]
    pub fn try_expand(&self, expression: &str) -> EngineResult<Vec<Entry>> {
        let (address, fs) = self.open(expression)?;
        pattern::expand(fs.as_ref(), &address, expression)
    }

    /// Expand `expression` and hand every match to `visit` while the handle that
    /// found it is still open. Returns the number of matches.
    #[instrument(skip(self, visit))]
    pub fn try_for_each_match<F>(&self, expression: &str, mut visit: F) -> EngineResult<usize>
    where
        F: FnMut(&dyn FsHandle, Entry),
    {
        let (address, fs) = self.open(expression)?;
        let matches = pattern::expand(fs.as_ref(), &address, expression)?;
        let count = matches.len();
        for entry in matches {
            visit(fs.as_ref(), entry);
        }
        Ok(count)
    }

    // =========================================================================
    // Collapsing API
    // =========================================================================

    pub fn get_root(&self, mountpoint: &str) -> RootReply {
        match self.try_get_root(mountpoint) {
            Ok(root) => RootReply::Root(root),
            Err(e) => {
                debug!(mountpoint, kind = e.kind_name(), error = %e, "Root unavailable");
                RootReply::Error { error: e.to_string() }
            }
        }
    }

    pub fn list_directory(&self, path: &str) -> Vec<Entry> {
        collapse("list_directory", path, self.try_list_directory(path), Vec::new())
    }

    pub fn is_directory(&self, path: &str) -> bool {
        collapse("is_directory", path, self.try_is_directory(path), false)
    }

    pub fn is_file(&self, path: &str) -> bool {
        collapse("is_file", path, self.try_is_file(path), false)
    }

    pub fn is_symlink(&self, path: &str) -> bool {
        collapse("is_symlink", path, self.try_is_symlink(path), false)
    }

    pub fn get_size(&self, path: &str) -> u64 {
        collapse("get_size", path, self.try_get_size(path), 0)
    }

    /// Raw chunk bytes; empty past EOF and on failure
    pub fn read_chunk_bytes(&self, path: &str, offset: u64, length: usize) -> Vec<u8> {
        collapse("read_chunk", path, self.try_read_chunk(path, offset, length), Vec::new())
    }

    /// Encoded chunk; empty past EOF and on failure
    pub fn read_chunk(&self, path: &str, offset: u64, length: usize) -> String {
        self.encode(&self.read_chunk_bytes(path, offset, length))
    }

    /// Logical join of `link_name` onto `path`. Link targets are not resolved.
    pub fn follow_symlink(&self, path: &str, link_name: &str) -> String {
        match self.addressing.resolve(path) {
            Ok(address) => address.join(path, link_name),
            Err(e) => {
                debug!(path, error = %e, "Cannot join link name");
                String::new()
            }
        }
    }

    pub fn expand(&self, expression: &str) -> Vec<Entry> {
        collapse("expand", expression, self.try_expand(expression), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::Fault;
    use crate::driver::{MemoryDriver, MemoryImage};

    /// /Docs/Report.TXT, /Docs/empty.txt, /root/a/b/c.txt, /link -> /Docs
    fn sample_engine() -> Engine<MemoryDriver> {
        let mut image = MemoryImage::new();
        let root = image.root();
        image.add_dot_entries(root, root);
        let docs = image.add_dir(root, "Docs");
        image.add_dot_entries(docs, root);
        image.add_file(docs, "Report.TXT", b"0123456789");
        image.add_file(docs, "empty.txt", b"");
        let r = image.add_dir(root, "root");
        let a = image.add_dir(r, "a");
        let b = image.add_dir(a, "b");
        image.add_file(b, "c.txt", b"see");
        image.add_symlink(root, "link", "/Docs");
        Engine::new(MemoryDriver::new().with_volume("/", image), Addressing::SingleRoot)
    }

    fn decode(engine: &Engine<MemoryDriver>, payload: &str) -> Vec<u8> {
        engine.config().encoding.decode(payload).unwrap()
    }

    #[test]
    fn test_get_root() {
        let engine = sample_engine();
        assert_eq!(
            engine.get_root("/"),
            RootReply::Root(RootInfo { name: "root".into(), path: "/".into() })
        );

        let empty = Engine::new(MemoryDriver::new(), Addressing::SingleRoot);
        assert!(matches!(empty.get_root("/"), RootReply::Error { .. }));
        let json = serde_json::to_value(empty.get_root("/")).unwrap();
        assert!(json.get("error").is_some());
    }

    #[test]
    fn test_case_insensitive_queries() {
        let engine = sample_engine();
        assert!(engine.is_file("/docs/report.txt"));
        assert!(engine.is_directory("/DOCS"));
        assert_eq!(engine.get_size("/docs/REPORT.txt"), 10);
    }

    #[test]
    fn test_queries_are_idempotent() {
        let engine = sample_engine();
        for _ in 0..3 {
            assert!(engine.is_file("/Docs/Report.TXT"));
            assert_eq!(engine.get_size("/Docs/Report.TXT"), 10);
            assert_eq!(engine.read_chunk("/Docs/Report.TXT", 3, 2), engine.encode(b"34"));
            assert_eq!(engine.list_directory("/Docs").len(), 2);
        }
    }

    #[test]
    fn test_not_found_collapses() {
        let engine = sample_engine();
        assert_eq!(engine.get_size("/nope"), 0);
        assert!(!engine.is_directory("/nope"));
        assert!(!engine.is_file("/nope"));
        assert!(!engine.is_symlink("/nope"));
        assert!(engine.list_directory("/nope").is_empty());
        assert!(engine.read_chunk("/nope", 0, 10).is_empty());

        assert!(engine.try_get_size("/nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_boundary_reads() {
        let engine = sample_engine();
        let size = engine.get_size("/Docs/Report.TXT");
        assert!(engine.read_chunk("/Docs/Report.TXT", size, 100).is_empty());
        assert_eq!(decode(&engine, &engine.read_chunk("/Docs/Report.TXT", size - 1, 100)), b"9");
        assert!(engine.read_chunk("/Docs/empty.txt", 0, 100).is_empty());
    }

    #[test]
    fn test_read_chunk_capped_by_config() {
        let mut config = EngineConfig::default();
        config.addressing = crate::config::AddressingMode::SingleRoot;
        config.max_chunk_size = 4;
        let mut image = MemoryImage::new();
        image.add_file(image.root(), "f", b"abcdefgh");
        let engine = Engine::with_config(MemoryDriver::new().with_volume("/", image), config);
        assert_eq!(engine.try_read_chunk("/f", 0, 100).unwrap(), b"abcd");
    }

    #[test]
    fn test_list_directory_excludes_dots() {
        let engine = sample_engine();
        let names: Vec<String> = engine.list_directory("/").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Docs", "root", "link"]);
        let docs: Vec<String> = engine.list_directory("/docs").into_iter().map(|e| e.path).collect();
        assert_eq!(docs, vec!["/Docs/Report.TXT", "/Docs/empty.txt"]);
    }

    #[test]
    fn test_list_file_is_not_a_directory() {
        let engine = sample_engine();
        assert!(engine.list_directory("/Docs/Report.TXT").is_empty());
        assert!(matches!(
            engine.try_list_directory("/Docs/Report.TXT"),
            Err(EngineError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_symlink_classification_and_stub() {
        let engine = sample_engine();
        assert!(engine.is_symlink("/link"));
        assert!(!engine.is_directory("/link"));
        assert!(engine.list_directory("/link").is_empty());
        assert_eq!(engine.follow_symlink("/", "link"), "/link");
        assert_eq!(engine.follow_symlink("/Docs", "x"), "/Docs/x");
    }

    #[test]
    fn test_recursive_expansion() {
        let engine = sample_engine();
        let found = engine.expand("/root/**/c.txt");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/root/a/b/c.txt");
        assert!(engine.expand("/root/**0/c.txt").is_empty());
        assert!(engine.expand("/root/**/c.txt/**/x").is_empty());
    }

    #[test]
    fn test_read_failure_is_not_not_found() {
        let mut image = MemoryImage::new();
        let f = image.add_file(image.root(), "bad", b"xyz");
        image.set_fault(f, Fault::FailReads);
        let engine = Engine::new(MemoryDriver::new().with_volume("/", image), Addressing::SingleRoot);

        assert!(engine.read_chunk("/bad", 0, 3).is_empty());
        let err = engine.try_read_chunk("/bad", 0, 3).unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.kind_name(), "read");
    }

    #[test]
    fn test_handles_released_on_every_path() {
        let engine = sample_engine();
        engine.get_size("/Docs/Report.TXT");
        engine.get_size("/missing/deeper");
        engine.list_directory("/Docs/Report.TXT");
        engine.read_chunk("/Docs/Report.TXT", 100, 1);
        engine.expand("/**");
        engine.try_expand("/a/**/b/**").unwrap_err();
        assert_eq!(engine.driver().live_handles(), 0);
    }

    #[test]
    fn test_drive_letter_engine() {
        let mut image = MemoryImage::new();
        let windows = image.add_dir(image.root(), "Windows");
        image.add_file(windows, "notepad.exe", b"MZ");
        let driver = MemoryDriver::new().with_volume("\\\\.\\C:", image);
        let engine = Engine::new(driver, Addressing::DriveLetter);

        assert!(engine.is_file("c:\\WINDOWS\\Notepad.exe"));
        assert!(engine.is_file("C:/Windows/notepad.exe"));
        assert!(!engine.is_file("D:\\Windows\\notepad.exe"));
        assert!(!engine.is_file("\\Windows\\notepad.exe"));
        assert!(matches!(
            engine.try_is_file("Windows\\notepad.exe"),
            Err(EngineError::Address(_))
        ));
    }
}
