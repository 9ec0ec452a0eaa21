//! Hex dump view of chunk payloads
//!
//! ```text
//! 00000200  4D 5A 90 00 03 00 00 00  04 00 00 00 FF FF 00 00  |MZ..............|
//! ```

use std::fmt::Write;

/// Layout of a hex dump
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub bytes_per_line: usize,
    pub uppercase: bool,
    /// Offset printed for the first byte (position of the chunk in the file)
    pub start_offset: u64,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            bytes_per_line: 16,
            uppercase: true,
            start_offset: 0,
        }
    }
}

impl DumpOptions {
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn with_bytes_per_line(mut self, n: usize) -> Self {
        self.bytes_per_line = n.max(1);
        self
    }
}

fn printable(byte: u8) -> char {
    if (0x20..0x7F).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// Offset column, hex bytes split at the midpoint, ASCII gutter.
/// Empty input renders as an empty string.
pub fn format_dump(data: &[u8], options: &DumpOptions) -> String {
    let width = options.bytes_per_line.max(1);
    let half = width / 2;
    let mut out = String::with_capacity(data.len() * 4 + 16);

    for (line, chunk) in data.chunks(width).enumerate() {
        let offset = options.start_offset + (line * width) as u64;
        let _ = write!(out, "{:08X} ", offset);

        for column in 0..width {
            if column == half && width >= 8 {
                out.push(' ');
            }
            match chunk.get(column) {
                Some(byte) if options.uppercase => {
                    let _ = write!(out, " {:02X}", byte);
                }
                Some(byte) => {
                    let _ = write!(out, " {:02x}", byte);
                }
                None => out.push_str("   "),
            }
        }

        out.push_str("  |");
        out.extend(chunk.iter().copied().map(printable));
        out.push_str("|\n");
    }
    out
}
