//! Small binary helpers shared by the table parsers

use binrw::BinResult;
use binrw::io::{Read, Seek, Write};

/// Largest value a 40-bit size field can carry
pub const U40_MAX: u64 = 0xFF_FFFF_FFFF;

/// Read a big-endian 40-bit unsigned integer
pub fn read_u40<R: Read>(reader: &mut R) -> BinResult<u64> {
    let mut bytes = [0u8; 5];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Write a big-endian 40-bit unsigned integer, truncating anything above 40 bits
pub fn write_u40<W: Write>(writer: &mut W, value: u64) -> BinResult<()> {
    let bytes = value.to_be_bytes();
    writer.write_all(&bytes[3..])?;
    Ok(())
}

/// Read a NUL-terminated UTF-8 string
pub fn read_cstring<R: Read + Seek>(reader: &mut R) -> BinResult<String> {
    let start = reader.stream_position()?;
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte)?;
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }
    String::from_utf8(bytes).map_err(|e| binrw::Error::Custom {
        pos: start,
        err: Box::new(e),
    })
}

/// Write a string followed by a NUL terminator
pub fn write_cstring<W: Write>(writer: &mut W, value: &str) -> BinResult<()> {
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

/// Read a big-endian unsigned integer of 1 to 8 bytes
pub fn read_be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Write the low `width` bytes of `value` big-endian
pub fn write_be_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[bytes.len() - width..]);
}
