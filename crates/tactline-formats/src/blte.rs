//! BLTE container decoding
//!
//! Every encoded object on a CDN is a BLTE frame: the `BLTE` magic, a
//! big-endian header size and either one chunk spanning the rest of the
//! frame (`header_size == 0`) or a chunk table followed by the chunks.
//! Each chunk starts with a mode byte.
//!
//! ```text
//! "BLTE" | header_size u32 | [flags 0x0F | count u24 | (csize u32, dsize u32, md5[16])*] | chunks
//! ```
//!
//! Modes `N` (raw) and `Z` (zlib) are decoded. Encrypted (`E`), LZ4 (`4`)
//! and recursive (`F`) chunks are reported as unsupported.

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use thiserror::Error;
use tracing::trace;

/// Frame magic
pub const BLTE_MAGIC: [u8; 4] = *b"BLTE";

const STANDARD_TABLE_FLAGS: u8 = 0x0F;
const CHUNK_INFO_SIZE: usize = 24;

/// BLTE decoding errors
#[derive(Debug, Error)]
pub enum BlteError {
    /// Input does not start with `BLTE`
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Header or chunk shorter than declared
    #[error("truncated BLTE frame: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Chunk table flags other than the standard layout
    #[error("unsupported chunk table flags: 0x{0:02X}")]
    UnsupportedTableFlags(u8),

    /// Header size disagrees with the chunk table
    #[error("invalid header size {header_size} for {chunk_count} chunks")]
    InvalidHeaderSize {
        /// Declared header size
        header_size: u32,
        /// Declared chunk count
        chunk_count: u32,
    },

    /// Chunk mode this decoder does not handle
    #[error("unsupported chunk mode: 0x{0:02X}")]
    UnsupportedMode(u8),

    /// Chunk bytes do not hash to the table entry
    #[error("chunk {index} checksum mismatch")]
    ChecksumMismatch {
        /// Zero based chunk index
        index: usize,
    },

    /// Decoded chunk size differs from the table entry
    #[error("chunk {index} decoded to {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Zero based chunk index
        index: usize,
        /// Size from the chunk table
        expected: u32,
        /// Size produced
        actual: usize,
    },

    /// Zlib stream failed to inflate
    #[error("decompression failed: {0}")]
    Decompression(#[from] std::io::Error),
}

/// Result type for BLTE operations
pub type Result<T> = std::result::Result<T, BlteError>;

impl BlteError {
    /// True when a chunk decoded but its bytes do not match the header
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::SizeMismatch { .. }
        )
    }
}

/// Chunk encoding applied by [`encode_single`] and [`encode_chunked`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    /// Stored as is (`N`)
    Raw,
    /// Zlib compressed (`Z`)
    Zlib,
}

impl ChunkMode {
    fn byte(self) -> u8 {
        match self {
            Self::Raw => b'N',
            Self::Zlib => b'Z',
        }
    }
}

/// True if `data` starts with the BLTE magic
pub fn is_blte(data: &[u8]) -> bool {
    data.starts_with(&BLTE_MAGIC)
}

/// Decode a complete BLTE frame
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 8 {
        return Err(BlteError::Truncated {
            needed: 8,
            available: data.len(),
        });
    }
    if !is_blte(data) {
        return Err(BlteError::InvalidMagic([data[0], data[1], data[2], data[3]]));
    }

    let header_size = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if header_size == 0 {
        return decode_chunk(&data[8..]);
    }

    if data.len() < 12 {
        return Err(BlteError::Truncated {
            needed: 12,
            available: data.len(),
        });
    }
    let flags = data[8];
    if flags != STANDARD_TABLE_FLAGS {
        return Err(BlteError::UnsupportedTableFlags(flags));
    }
    let chunk_count = u32::from_be_bytes([0, data[9], data[10], data[11]]);
    let table_end = 12 + chunk_count as usize * CHUNK_INFO_SIZE;
    if header_size as usize != table_end || chunk_count == 0 {
        return Err(BlteError::InvalidHeaderSize {
            header_size,
            chunk_count,
        });
    }
    if data.len() < table_end {
        return Err(BlteError::Truncated {
            needed: table_end,
            available: data.len(),
        });
    }

    let mut output = Vec::new();
    let mut position = table_end;
    for (index, info) in data[12..table_end].chunks_exact(CHUNK_INFO_SIZE).enumerate() {
        let compressed = u32::from_be_bytes([info[0], info[1], info[2], info[3]]) as usize;
        let decompressed = u32::from_be_bytes([info[4], info[5], info[6], info[7]]);

        let end = position + compressed;
        let Some(chunk) = data.get(position..end) else {
            return Err(BlteError::Truncated {
                needed: end,
                available: data.len(),
            });
        };
        if md5::compute(chunk).0 != info[8..24] {
            return Err(BlteError::ChecksumMismatch { index });
        }

        let decoded = decode_chunk(chunk)?;
        if decoded.len() != decompressed as usize {
            return Err(BlteError::SizeMismatch {
                index,
                expected: decompressed,
                actual: decoded.len(),
            });
        }
        output.extend_from_slice(&decoded);
        position = end;
    }

    trace!(
        "Decoded BLTE frame: {} chunks, {} bytes",
        chunk_count,
        output.len()
    );
    Ok(output)
}

fn decode_chunk(chunk: &[u8]) -> Result<Vec<u8>> {
    let Some((&mode, body)) = chunk.split_first() else {
        return Err(BlteError::Truncated {
            needed: 1,
            available: 0,
        });
    };
    match mode {
        b'N' => Ok(body.to_vec()),
        b'Z' => {
            let mut decoded = Vec::new();
            ZlibDecoder::new(body).read_to_end(&mut decoded)?;
            Ok(decoded)
        }
        other => Err(BlteError::UnsupportedMode(other)),
    }
}

fn encode_chunk(data: &[u8], mode: ChunkMode) -> Result<Vec<u8>> {
    let mut chunk = vec![mode.byte()];
    match mode {
        ChunkMode::Raw => chunk.extend_from_slice(data),
        ChunkMode::Zlib => {
            let mut encoder = ZlibEncoder::new(chunk, Compression::default());
            encoder.write_all(data)?;
            chunk = encoder.finish()?;
        }
    }
    Ok(chunk)
}

/// Wrap `data` in a single-chunk frame
pub fn encode_single(data: &[u8], mode: ChunkMode) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() + 9);
    out.extend_from_slice(&BLTE_MAGIC);
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&encode_chunk(data, mode)?);
    Ok(out)
}

/// Wrap `data` in a multi-chunk frame with chunks of at most `chunk_size` bytes
pub fn encode_chunked(data: &[u8], chunk_size: usize, mode: ChunkMode) -> Result<Vec<u8>> {
    let pieces: Vec<&[u8]> = if data.is_empty() {
        vec![data]
    } else {
        data.chunks(chunk_size.max(1)).collect()
    };

    let mut table = Vec::with_capacity(pieces.len() * CHUNK_INFO_SIZE);
    let mut body = Vec::new();
    for piece in &pieces {
        let chunk = encode_chunk(piece, mode)?;
        table.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
        table.extend_from_slice(&(piece.len() as u32).to_be_bytes());
        table.extend_from_slice(&md5::compute(&chunk).0);
        body.extend_from_slice(&chunk);
    }

    let count = pieces.len() as u32;
    let header_size = 12 + table.len() as u32;
    let mut out = Vec::with_capacity(header_size as usize + body.len());
    out.extend_from_slice(&BLTE_MAGIC);
    out.extend_from_slice(&header_size.to_be_bytes());
    out.push(STANDARD_TABLE_FLAGS);
    out.extend_from_slice(&count.to_be_bytes()[1..]);
    out.extend_from_slice(&table);
    out.extend_from_slice(&body);
    Ok(out)
}
