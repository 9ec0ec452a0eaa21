//! Executable header analysis
//!
//! ```text
//! 0x00  DOS header      "MZ" ... e_lfanew (u32 @ 0x3C)
//! e_lfanew              "PE\0\0"
//!  +0x04  COFF header   Machine (u16), NumberOfSections (u16), TimeDateStamp (u32), ...
//!  +0x14                SizeOfOptionalHeader (u16), Characteristics (u16)
//!  +0x18  Optional hdr  Magic: 0x10B (PE32) / 0x20B (PE32+)
//! ```
//!
//! Analyzers never fail: malformed input is reported as an error object.

use chrono::{SecondsFormat, TimeZone, Utc};
use tracing::trace;

use super::types::{AnalyzerOutcome, PeInfo};
use crate::common::binary::{u16_at, u32_at};
use crate::common::magic;

/// Largest buffer handed to an analyzer (50 MiB)
pub const MAX_PE_SIZE: usize = 50 * 1024 * 1024;

const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const COFF_HEADER_SIZE: usize = 20;
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;

/// Extracts executable metadata from an in-memory file
pub trait ExecutableAnalyzer: Send + Sync {
    fn analyze(&self, data: &[u8]) -> AnalyzerOutcome;
}

/// Header-only PE analyzer.
///
/// Reports the compilation timestamp and MIME type. Version resources and the
/// import hash are not parsed, so those fields stay empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeHeaderAnalyzer;

impl PeHeaderAnalyzer {
    fn parse(data: &[u8]) -> Result<PeInfo, String> {
        if data.len() > MAX_PE_SIZE {
            return Err(format!("buffer of {} bytes exceeds the {} byte PE limit", data.len(), MAX_PE_SIZE));
        }
        if !magic::is_mz(data) {
            return Err("DOS header signature not found".to_string());
        }

        let pe_offset = u32_at(data, 0x3C)? as usize;
        let signature = data
            .get(pe_offset..pe_offset.saturating_add(PE_SIGNATURE.len()))
            .ok_or_else(|| format!("e_lfanew {:#x} points past the end of the file", pe_offset))?;
        if signature != PE_SIGNATURE {
            return Err(format!("invalid PE signature at {:#x}", pe_offset));
        }

        let coff = pe_offset + PE_SIGNATURE.len();
        let machine = u16_at(data, coff)?;
        let timestamp = u32_at(data, coff + 4)?;
        let optional_size = u16_at(data, coff + 16)? as usize;
        trace!(machine = format_args!("{:#06x}", machine), timestamp, optional_size, "COFF header");

        if optional_size >= 2 {
            let optional_magic = u16_at(data, coff + COFF_HEADER_SIZE)?;
            if optional_magic != PE32_MAGIC && optional_magic != PE32_PLUS_MAGIC {
                return Err(format!("unknown optional header magic {:#x}", optional_magic));
            }
        }

        Ok(PeInfo {
            compilation: compilation_time(timestamp),
            mime: magic::mime_type(data).to_string(),
            ..PeInfo::default()
        })
    }
}

fn compilation_time(timestamp: u32) -> String {
    Utc.timestamp_opt(i64::from(timestamp), 0)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

impl ExecutableAnalyzer for PeHeaderAnalyzer {
    fn analyze(&self, data: &[u8]) -> AnalyzerOutcome {
        match Self::parse(data) {
            Ok(info) => AnalyzerOutcome::Info(info),
            Err(e) => AnalyzerOutcome::error(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest header set the analyzer accepts: DOS stub, PE signature, COFF and
    /// a PE32 optional header magic
    pub(crate) fn minimal_pe(timestamp: u32) -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[0..2].copy_from_slice(b"MZ");
        data[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        data.extend_from_slice(b"PE\0\0");
        let mut coff = [0u8; COFF_HEADER_SIZE];
        coff[0..2].copy_from_slice(&0x14Cu16.to_le_bytes());
        coff[4..8].copy_from_slice(&timestamp.to_le_bytes());
        coff[16..18].copy_from_slice(&0xE0u16.to_le_bytes());
        data.extend_from_slice(&coff);
        data.extend_from_slice(&PE32_MAGIC.to_le_bytes());
        data.resize(data.len() + 0xDE, 0);
        data
    }

    #[test]
    fn test_compilation_timestamp() {
        let outcome = PeHeaderAnalyzer.analyze(&minimal_pe(1_577_836_800));
        let info = outcome.info().unwrap();
        assert_eq!(info.compilation, "2020-01-01T00:00:00Z");
        assert_eq!(info.mime, "application/x-msdownload");
        assert!(info.imphash.is_empty());
        assert!(info.company.is_none());
    }

    #[test]
    fn test_not_mz() {
        let outcome = PeHeaderAnalyzer.analyze(b"\x7FELF");
        assert!(matches!(outcome, AnalyzerOutcome::Error { .. }));
    }

    #[test]
    fn test_truncated_and_bad_offsets() {
        let pe = minimal_pe(0);
        assert!(PeHeaderAnalyzer.analyze(&pe[..0x30]).info().is_none());
        assert!(PeHeaderAnalyzer.analyze(&pe[..0x50]).info().is_none());

        let mut bad = pe.clone();
        bad[0x3C..0x40].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(PeHeaderAnalyzer.analyze(&bad).info().is_none());

        let mut bad_magic = pe;
        bad_magic[0x58..0x5A].copy_from_slice(&0x1234u16.to_le_bytes());
        assert!(PeHeaderAnalyzer.analyze(&bad_magic).info().is_none());
    }

    #[test]
    fn test_error_serializes_as_object() {
        let json = serde_json::to_value(PeHeaderAnalyzer.analyze(b"MZ")).unwrap();
        assert!(json["error"].is_string());
    }
}
