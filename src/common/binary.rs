// Little-endian field readers over in-memory buffers
//
// Extracted content is already in memory, so header parsing works on slices and
// reports out-of-range reads as errors instead of panicking on truncated data.

/// Read a u16 little-endian at `offset`
pub fn u16_at(data: &[u8], offset: usize) -> Result<u16, String> {
    field(data, offset).map(u16::from_le_bytes)
}

/// Read a u32 little-endian at `offset`
pub fn u32_at(data: &[u8], offset: usize) -> Result<u32, String> {
    field(data, offset).map(u32::from_le_bytes)
}

fn field<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], String> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            format!(
                "Read of {} bytes at offset {:#x} is past the end of a {} byte buffer",
                N,
                offset,
                data.len()
            )
        })
}
