//! Delta stream decoding and application.
//!
//! A decompressed delta stream starts with two plain base-128 varints, the
//! expected base size and the destination size, followed by instructions:
//!
//! ```text
//! Copy:   [1 sss oooo] [offset bytes...] [size bytes...]
//!         bits 0-3 select up to 4 little-endian offset bytes,
//!         bits 4-6 select up to 3 little-endian size bytes,
//!         a size of 0 means 65536
//! Insert: [0 nnnnnnn] [n literal bytes]   (n = 1..=127)
//! ```
//!
//! An instruction byte of 0 is reserved and treated as corruption.

use crate::PackError;

/// One parsed delta instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaInstruction {
    /// Copy `size` bytes from the base object starting at `offset`.
    Copy { offset: usize, size: usize },
    /// Insert literal bytes from the delta stream itself.
    Insert(Vec<u8>),
}

/// Declared sizes from a delta stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaHeader {
    /// Expected size of the base object.
    pub base_size: usize,
    /// Size of the reconstructed destination object.
    pub dest_size: usize,
    /// Bytes consumed by the two varints.
    pub header_len: usize,
}

/// Decode a plain base-128 varint (7 payload bits per byte, LSB first).
pub fn read_varint(data: &[u8], pos: &mut usize) -> Option<usize> {
    let mut value = 0usize;
    let mut shift = 0u32;
    loop {
        if shift >= usize::BITS {
            return None;
        }
        let byte = *data.get(*pos)?;
        *pos += 1;
        value |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
}

/// Parse the two size varints at the start of a delta stream.
pub fn parse_header(delta: &[u8], offset: u64) -> Result<DeltaHeader, PackError> {
    let mut pos = 0;
    let base_size = read_varint(delta, &mut pos).ok_or_else(|| truncated(offset, "base size"))?;
    let dest_size =
        read_varint(delta, &mut pos).ok_or_else(|| truncated(offset, "destination size"))?;
    Ok(DeltaHeader {
        base_size,
        dest_size,
        header_len: pos,
    })
}

/// Parse the instruction at `pos`, advancing it past the instruction and
/// its operands.
fn next_instruction(
    delta: &[u8],
    pos: &mut usize,
    offset: u64,
) -> Result<DeltaInstruction, PackError> {
    let cmd = delta[*pos];
    *pos += 1;

    if cmd & 0x80 != 0 {
        let mut copy_offset = 0usize;
        for (i, bit) in [0x01u8, 0x02, 0x04, 0x08].into_iter().enumerate() {
            if cmd & bit != 0 {
                let byte = *delta
                    .get(*pos)
                    .ok_or_else(|| truncated(offset, "copy offset"))?;
                *pos += 1;
                copy_offset |= (byte as usize) << (8 * i);
            }
        }

        let mut size = 0usize;
        for (i, bit) in [0x10u8, 0x20, 0x40].into_iter().enumerate() {
            if cmd & bit != 0 {
                let byte = *delta
                    .get(*pos)
                    .ok_or_else(|| truncated(offset, "copy size"))?;
                *pos += 1;
                size |= (byte as usize) << (8 * i);
            }
        }
        // No size bytes present means the maximum run.
        if size == 0 {
            size = 0x10000;
        }

        Ok(DeltaInstruction::Copy {
            offset: copy_offset,
            size,
        })
    } else if cmd != 0 {
        let n = cmd as usize;
        if *pos + n > delta.len() {
            return Err(truncated(offset, "insert literal"));
        }
        let literal = delta[*pos..*pos + n].to_vec();
        *pos += n;
        Ok(DeltaInstruction::Insert(literal))
    } else {
        Err(PackError::CorruptDelta {
            offset,
            reason: format!("reserved opcode 0 at stream position {}", *pos - 1),
        })
    }
}

/// Parse a whole delta stream into its header and instruction list.
pub fn parse(delta: &[u8], offset: u64) -> Result<(DeltaHeader, Vec<DeltaInstruction>), PackError> {
    let header = parse_header(delta, offset)?;
    let mut pos = header.header_len;
    let mut instructions = Vec::new();
    while pos < delta.len() {
        instructions.push(next_instruction(delta, &mut pos, offset)?);
    }
    Ok((header, instructions))
}

/// Apply a delta stream to `base`, reconstructing the destination bytes.
///
/// Copy ranges are bounds-checked against the base and the output length
/// must match the declared destination size. The declared base size is not
/// checked here; the resolver compares it against the actual base before
/// calling (the stream header is informational on its own).
pub fn apply(base: &[u8], delta: &[u8], offset: u64) -> Result<Vec<u8>, PackError> {
    let header = parse_header(delta, offset)?;
    let mut pos = header.header_len;
    // The declared destination size is untrusted; cap the pre-allocation and
    // let the instruction stream drive actual growth.
    let mut output = Vec::with_capacity(header.dest_size.min(1 << 16));

    while pos < delta.len() {
        match next_instruction(delta, &mut pos, offset)? {
            DeltaInstruction::Copy {
                offset: copy_offset,
                size,
            } => {
                let end = copy_offset
                    .checked_add(size)
                    .filter(|&end| end <= base.len())
                    .ok_or_else(|| PackError::CorruptDelta {
                        offset,
                        reason: format!(
                            "copy range {copy_offset}+{size} exceeds base of {} bytes",
                            base.len()
                        ),
                    })?;
                output.extend_from_slice(&base[copy_offset..end]);
            }
            DeltaInstruction::Insert(literal) => output.extend_from_slice(&literal),
        }
    }

    if output.len() != header.dest_size {
        return Err(PackError::CorruptDelta {
            offset,
            reason: format!(
                "destination size mismatch: declared {}, reconstructed {}",
                header.dest_size,
                output.len()
            ),
        });
    }

    Ok(output)
}

fn truncated(offset: u64, what: &str) -> PackError {
    PackError::CorruptDelta {
        offset,
        reason: format!("truncated {what}"),
    }
}
