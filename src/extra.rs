//! Codec for the ZIP "extra field" chunk list, and the RISC OS (`ARC0`)
//! chunk carried inside it.
//!
//! Each chunk is `u16_le header_id, u16_le payload_length` followed by
//! `payload_length` bytes. A buffer is walked chunk by chunk, advancing by
//! `4 + payload_length` each time; a chunk whose declared length would run
//! past the end of the buffer is corrupt and parsing stops there, keeping
//! whatever chunks were already found.

use crate::quin::DIRECTORY_FILETYPE_INTERNAL;
use crate::result::{Error, Result};

/// Header id RISC OS archiving tools use for the filetype/load/exec chunk.
pub const ARC0_HEADER_ID: u16 = 0x4341;
/// Fixed payload length of an `ARC0` chunk.
pub const ARC0_PAYLOAD_LEN: u16 = 20;
const ARC0_SIGNATURE: u32 = 0x3041_4352;

/// The decoded payload of an `ARC0` extra field chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc0Payload {
    pub loadaddr: u32,
    pub execaddr: u32,
    pub attr: u32,
}

impl Arc0Payload {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ARC0_PAYLOAD_LEN as usize {
            return Err(Error::CorruptExtra(
                "ARC0".into(),
                format!("expected {ARC0_PAYLOAD_LEN} byte payload, got {}", bytes.len()).into(),
            ));
        }
        let sig = read_u32(&bytes[0..4]);
        if sig != ARC0_SIGNATURE {
            return Err(Error::CorruptExtra(
                "ARC0".into(),
                format!("bad signature {sig:#x}").into(),
            ));
        }
        Ok(Arc0Payload {
            loadaddr: read_u32(&bytes[4..8]),
            execaddr: read_u32(&bytes[8..12]),
            attr: read_u32(&bytes[12..16]),
        })
    }

    /// The raw 20-byte on-wire payload (signature, load, exec, attr, reserved).
    pub fn to_bytes(self) -> [u8; ARC0_PAYLOAD_LEN as usize] {
        let mut out = [0u8; ARC0_PAYLOAD_LEN as usize];
        out[0..4].copy_from_slice(&ARC0_SIGNATURE.to_le_bytes());
        out[4..8].copy_from_slice(&self.loadaddr.to_le_bytes());
        out[8..12].copy_from_slice(&self.execaddr.to_le_bytes());
        out[12..16].copy_from_slice(&self.attr.to_le_bytes());
        out[16..20].copy_from_slice(&0u32.to_le_bytes());
        out
    }

    /// Apply the directory load-address quirk: many archivers store a bare
    /// timestamp as a directory's load address rather than a typed pair, so
    /// on read we force it back into the typed form with the internal
    /// directory filetype.
    pub fn normalise_directory_loadaddr(mut self, is_directory: bool) -> Self {
        if is_directory {
            self.loadaddr = (self.loadaddr & 0xFF) | 0xFFF0_0000 | (DIRECTORY_FILETYPE_INTERNAL << 8);
        }
        self
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// One parsed chunk's position within the source buffer.
struct ChunkSpan {
    header_id: u16,
    payload: (usize, usize),
}

/// Walk `extra` chunk by chunk, stopping (without error) at the first chunk
/// whose header or declared length would overrun the buffer.
fn walk_chunks(extra: &[u8]) -> Vec<ChunkSpan> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while offset + 4 <= extra.len() {
        let header_id = u16::from_le_bytes([extra[offset], extra[offset + 1]]);
        let length = u16::from_le_bytes([extra[offset + 2], extra[offset + 3]]) as usize;
        let payload_start = offset + 4;
        let payload_end = payload_start + length;
        if payload_end > extra.len() {
            break;
        }
        spans.push(ChunkSpan {
            header_id,
            payload: (payload_start, payload_end),
        });
        offset = payload_end;
    }
    spans
}

/// Find and decode the `ARC0` chunk in an extra field buffer, if present.
pub fn extract_arc0(extra: &[u8]) -> Result<Option<Arc0Payload>> {
    for span in walk_chunks(extra) {
        if span.header_id == ARC0_HEADER_ID {
            let (start, end) = span.payload;
            return Arc0Payload::from_bytes(&extra[start..end]).map(Some);
        }
    }
    Ok(None)
}

/// Return a copy of `extra` with any existing `ARC0` chunk removed.
pub fn strip_arc0(extra: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(extra.len());
    for span in walk_chunks(extra) {
        if span.header_id != ARC0_HEADER_ID {
            let (start, end) = span.payload;
            out.extend_from_slice(&extra[start - 4..start]);
            out.extend_from_slice(&extra[start..end]);
        }
    }
    out
}

/// Return a copy of `extra` with its `ARC0` chunk replaced (or appended, if
/// none was present) by `payload`.
pub fn replace_arc0(extra: &[u8], payload: Arc0Payload) -> Vec<u8> {
    let mut out = strip_arc0(extra);
    out.extend_from_slice(&ARC0_HEADER_ID.to_le_bytes());
    out.extend_from_slice(&ARC0_PAYLOAD_LEN.to_le_bytes());
    out.extend_from_slice(&payload.to_bytes());
    out
}
