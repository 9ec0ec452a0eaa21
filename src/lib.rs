//! FFX ImageFS
//!
//! Read-only path resolution and content extraction over forensic filesystem
//! images. Logical paths (`C:\Windows\System32` or `/var/log`) are resolved to a
//! device and walked segment by segment through a [`driver::FilesystemDriver`];
//! nothing is ever written back to the image.
//!
//! ```text
//! logical path ──► address ──► driver.open ──► walker / pattern ──► classify ──► reader
//!                  (device,     (FsHandle,       (case-insensitive   (kind,       (chunks,
//!                  mountpoint)   per call)        match, expand)      size)        batches)
//! ```

pub mod address;
pub mod analysis;
pub mod cli;
pub mod collect;
pub mod common;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod logging;

pub use address::{Addressing, DeviceAddress};
pub use config::EngineConfig;
pub use engine::{Engine, Entry, EntryKind};
pub use error::{EngineError, EngineResult};
