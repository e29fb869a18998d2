//! Page entries of the two encoding table sections

use crate::keys::{ContentKey, EncodingKey};
use crate::util::{read_u40, write_u40};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Entry kinds stored in key-ordered pages
pub(super) trait PageEntry: for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()> {
    /// Smallest possible entry; fewer remaining bytes are padding
    const MIN_SIZE: usize;

    /// Key the page is ordered by
    fn key_bytes(&self) -> &[u8; 16];

    /// True when the remaining page bytes start with padding
    fn is_padding(rest: &[u8]) -> bool;
}

/// Content key page entry: one content key and its encodings
///
/// Wire layout: `key_count u8 | decoded_size u40 | ckey | ekey * key_count`.
/// A `key_count` of zero marks the start of page padding and is never
/// produced by [`BinRead`]; the page reader checks it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Content key
    pub content_key: ContentKey,
    /// Size of the decoded content
    pub decoded_size: u64,
    /// Encoding keys in published order, the first is canonical
    pub encoding_keys: Vec<EncodingKey>,
}

impl ContentEntry {
    /// Encoded size of this entry in a page
    pub fn wire_size(&self) -> usize {
        1 + 5 + 16 + 16 * self.encoding_keys.len()
    }
}

impl PageEntry for ContentEntry {
    const MIN_SIZE: usize = 1 + 5 + 16;

    fn key_bytes(&self) -> &[u8; 16] {
        self.content_key.as_bytes()
    }

    fn is_padding(rest: &[u8]) -> bool {
        rest.first().is_none_or(|&count| count == 0)
    }
}

impl BinRead for ContentEntry {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let key_count = u8::read_options(reader, endian, ())?;
        let decoded_size = read_u40(reader)?;
        let content_key = ContentKey::read_options(reader, endian, ())?;

        let mut encoding_keys = Vec::with_capacity(key_count as usize);
        for _ in 0..key_count {
            encoding_keys.push(EncodingKey::read_options(reader, endian, ())?);
        }

        Ok(Self {
            content_key,
            decoded_size,
            encoding_keys,
        })
    }
}

impl BinWrite for ContentEntry {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        (self.encoding_keys.len() as u8).write_options(writer, endian, ())?;
        write_u40(writer, self.decoded_size)?;
        self.content_key.write_options(writer, endian, ())?;
        for ekey in &self.encoding_keys {
            ekey.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}

/// Encoding key page entry: `ekey | espec_index u32 | encoded_size u40`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEntry {
    /// Encoding key
    pub encoding_key: EncodingKey,
    /// Index into the table's `ESpec` strings
    pub espec_index: u32,
    /// Size of the encoded stream
    pub encoded_size: u64,
}

impl EncodedEntry {
    /// Encoded size of this entry in a page
    pub const WIRE_SIZE: usize = 16 + 4 + 5;
}

impl PageEntry for EncodedEntry {
    const MIN_SIZE: usize = Self::WIRE_SIZE;

    fn key_bytes(&self) -> &[u8; 16] {
        self.encoding_key.as_bytes()
    }

    fn is_padding(rest: &[u8]) -> bool {
        rest.iter().take(16).all(|&b| b == 0)
    }
}

impl BinRead for EncodedEntry {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let encoding_key = EncodingKey::read_options(reader, binrw::Endian::Big, ())?;
        let espec_index = u32::read_options(reader, binrw::Endian::Big, ())?;
        let encoded_size = read_u40(reader)?;
        Ok(Self {
            encoding_key,
            espec_index,
            encoded_size,
        })
    }
}

impl BinWrite for EncodedEntry {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.encoding_key
            .write_options(writer, binrw::Endian::Big, ())?;
        self.espec_index
            .write_options(writer, binrw::Endian::Big, ())?;
        write_u40(writer, self.encoded_size)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_content_entry_layout() {
        let entry = ContentEntry {
            content_key: ContentKey::from_bytes([0x11; 16]),
            decoded_size: 0x01_0000_0002,
            encoding_keys: vec![
                EncodingKey::from_bytes([0xAA; 16]),
                EncodingKey::from_bytes([0xBB; 16]),
            ],
        };

        let mut cursor = Cursor::new(Vec::new());
        entry.write_be(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len(), entry.wire_size());
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..6], &[0x01, 0, 0, 0, 0x02]);
        assert_eq!(&bytes[6..22], &[0x11; 16]);

        let parsed = ContentEntry::read_be(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_encoded_entry_layout() {
        let entry = EncodedEntry {
            encoding_key: EncodingKey::from_bytes([0xCD; 16]),
            espec_index: 7,
            encoded_size: 4096,
        };

        let mut cursor = Cursor::new(Vec::new());
        entry.write_be(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len(), EncodedEntry::WIRE_SIZE);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 7]);

        let parsed = EncodedEntry::read_be(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, entry);
    }
}
