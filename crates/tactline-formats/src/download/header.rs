use super::error::{DownloadError, Result};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Download manifest header
///
/// Version 2 appends `flag_size`, version 3 appends `base_priority` and
/// three reserved bytes. Fields missing from older versions read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHeader {
    /// Format version (1..=3)
    pub version: u8,
    /// Encoding key length
    pub ekey_length: u8,
    /// Entries carry a u32 checksum
    pub has_checksum: bool,
    /// Number of entries
    pub entry_count: u32,
    /// Number of tags
    pub tag_count: u16,
    /// Bytes of flags per entry (v2+)
    pub flag_size: u8,
    /// Subtracted from every entry priority (v3)
    pub base_priority: i8,
}

impl DownloadHeader {
    /// Header for the given version with 16-byte keys
    pub fn new(version: u8, entry_count: u32, tag_count: u16) -> Self {
        Self {
            version,
            ekey_length: 16,
            has_checksum: false,
            entry_count,
            tag_count,
            flag_size: 0,
            base_priority: 0,
        }
    }

    /// Reject headers this implementation cannot read
    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.version) {
            return Err(DownloadError::UnsupportedVersion(self.version));
        }
        if self.ekey_length != 16 {
            return Err(DownloadError::UnsupportedKeyLength(self.ekey_length));
        }
        Ok(())
    }

    /// Size of one entry on the wire
    pub fn entry_size(&self) -> usize {
        usize::from(self.ekey_length)
            + 5
            + 1
            + if self.has_checksum { 4 } else { 0 }
            + usize::from(self.flag_size)
    }
}

impl BinRead for DownloadHeader {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let big = binrw::Endian::Big;
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;
        if magic != *b"DL" {
            return Err(binrw::Error::BadMagic {
                pos: 0,
                found: Box::new(magic),
            });
        }

        let version = u8::read_options(reader, big, ())?;
        let ekey_length = u8::read_options(reader, big, ())?;
        let has_checksum = u8::read_options(reader, big, ())? != 0;
        let entry_count = u32::read_options(reader, big, ())?;
        let tag_count = u16::read_options(reader, big, ())?;

        let flag_size = if version >= 2 {
            u8::read_options(reader, big, ())?
        } else {
            0
        };
        let base_priority = if version >= 3 {
            let base = i8::read_options(reader, big, ())?;
            let mut reserved = [0u8; 3];
            reader.read_exact(&mut reserved)?;
            base
        } else {
            0
        };

        Ok(Self {
            version,
            ekey_length,
            has_checksum,
            entry_count,
            tag_count,
            flag_size,
            base_priority,
        })
    }
}

impl BinWrite for DownloadHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let big = binrw::Endian::Big;
        writer.write_all(b"DL")?;
        self.version.write_options(writer, big, ())?;
        self.ekey_length.write_options(writer, big, ())?;
        u8::from(self.has_checksum).write_options(writer, big, ())?;
        self.entry_count.write_options(writer, big, ())?;
        self.tag_count.write_options(writer, big, ())?;
        if self.version >= 2 {
            self.flag_size.write_options(writer, big, ())?;
        }
        if self.version >= 3 {
            self.base_priority.write_options(writer, big, ())?;
            writer.write_all(&[0; 3])?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_versioned_sizes() {
        for (version, size) in [(1u8, 11usize), (2, 12), (3, 16)] {
            let header = DownloadHeader::new(version, 5, 2);
            let mut out = Cursor::new(Vec::new());
            header.write_be(&mut out).unwrap();
            let bytes = out.into_inner();
            assert_eq!(bytes.len(), size, "version {version}");

            let parsed = DownloadHeader::read_be(&mut Cursor::new(&bytes)).unwrap();
            assert_eq!(parsed, header);
        }
    }

    #[test]
    fn test_v3_base_priority() {
        let bytes = b"DL\x03\x10\x01\x00\x00\x00\x02\x00\x01\x01\xFE\x00\x00\x00".to_vec();
        let header = DownloadHeader::read_be(&mut Cursor::new(&bytes)).unwrap();
        assert!(header.has_checksum);
        assert_eq!(header.entry_count, 2);
        assert_eq!(header.flag_size, 1);
        assert_eq!(header.base_priority, -2);
        assert_eq!(header.entry_size(), 16 + 5 + 1 + 4 + 1);
    }
}
