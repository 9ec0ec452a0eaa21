//! Content type sniffing from magic signatures
//!
//! Artifacts pulled out of an image often have misleading or missing extensions,
//! so the type reported for an extracted file comes from its first bytes only.

use serde::Serialize;

/// MIME reported when no signature matches
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Broad grouping of detected types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Executable,
    Registry,
    EventLog,
    Shortcut,
    Database,
    Document,
    Archive,
    Image,
    Text,
}

/// A recognised signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub mime: &'static str,
    pub description: &'static str,
    pub category: FileCategory,
    #[serde(skip)]
    offset: usize,
    #[serde(skip)]
    magic: &'static [u8],
}

const fn sig(
    offset: usize,
    magic: &'static [u8],
    mime: &'static str,
    description: &'static str,
    category: FileCategory,
) -> Signature {
    Signature { mime, description, category, offset, magic }
}

/// Checked in order; longer, more specific signatures first
const SIGNATURES: &[Signature] = &[
    sig(0, b"regf", "application/x-windows-registry", "Windows Registry Hive", FileCategory::Registry),
    sig(0, b"ElfFile\x00", "application/x-ms-evtx", "Windows Event Log", FileCategory::EventLog),
    sig(4, b"SCCA", "application/x-ms-prefetch", "Windows Prefetch", FileCategory::Executable),
    sig(0, b"MAM\x04", "application/x-ms-prefetch", "Windows Prefetch (compressed)", FileCategory::Executable),
    sig(0, b"L\x00\x00\x00\x01\x14\x02\x00", "application/x-ms-shortcut", "Windows Shortcut", FileCategory::Shortcut),
    sig(0, b"SQLite format 3\x00", "application/x-sqlite3", "SQLite Database", FileCategory::Database),
    sig(0, b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1", "application/x-ole-storage", "OLE Compound File", FileCategory::Document),
    sig(0, b"%PDF", "application/pdf", "PDF Document", FileCategory::Document),
    sig(0, b"PK\x03\x04", "application/zip", "ZIP Archive", FileCategory::Archive),
    sig(0, b"\x1F\x8B", "application/gzip", "GZIP Archive", FileCategory::Archive),
    sig(0, b"\x7FELF", "application/x-executable", "ELF Executable", FileCategory::Executable),
    sig(0, b"\xCF\xFA\xED\xFE", "application/x-mach-binary", "Mach-O Executable", FileCategory::Executable),
    sig(0, b"MZ", "application/x-msdownload", "DOS/Windows Executable", FileCategory::Executable),
    sig(0, b"\x89PNG\r\n\x1A\n", "image/png", "PNG Image", FileCategory::Image),
    sig(0, b"\xFF\xD8\xFF", "image/jpeg", "JPEG Image", FileCategory::Image),
    sig(0, b"GIF8", "image/gif", "GIF Image", FileCategory::Image),
    sig(0, b"<?xml", "application/xml", "XML Document", FileCategory::Text),
];

impl Signature {
    fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.offset + self.magic.len())
            .is_some_and(|window| window == self.magic)
    }
}

/// First signature matching `header`
pub fn sniff(header: &[u8]) -> Option<&'static Signature> {
    SIGNATURES.iter().find(|s| s.matches(header))
}

/// Best-guess MIME type, falling back to `application/octet-stream`
pub fn mime_type(header: &[u8]) -> &'static str {
    sniff(header).map_or(FALLBACK_MIME, |s| s.mime)
}

/// DOS header present (PE candidates)
pub fn is_mz(header: &[u8]) -> bool {
    header.starts_with(b"MZ")
}
