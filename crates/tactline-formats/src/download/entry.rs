use super::header::DownloadHeader;
use crate::keys::EncodingKey;
use crate::util::{read_u40, write_u40};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// Encoded object listed in a download manifest
///
/// Wire layout: `ekey | size u40 | priority i8 | [checksum u32] | [flags]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    /// Encoding key of the object
    pub encoding_key: EncodingKey,
    /// Encoded size
    pub size: u64,
    /// Raw priority, lower downloads first
    pub priority: i8,
    /// Present when the header says entries carry checksums
    pub checksum: Option<u32>,
    /// `flag_size` bytes of flags, empty before version 2
    pub flags: Vec<u8>,
}

impl DownloadEntry {
    /// Entry without checksum or flags
    pub fn new(encoding_key: EncodingKey, size: u64, priority: i8) -> Self {
        Self {
            encoding_key,
            size,
            priority,
            checksum: None,
            flags: Vec::new(),
        }
    }

    /// Priority relative to the manifest's base priority
    pub fn effective_priority(&self, header: &DownloadHeader) -> i8 {
        self.priority.saturating_sub(header.base_priority)
    }
}

impl BinRead for DownloadEntry {
    type Args<'a> = &'a DownloadHeader;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        header: Self::Args<'_>,
    ) -> BinResult<Self> {
        let encoding_key = EncodingKey::read_options(reader, endian, ())?;
        let size = read_u40(reader)?;
        let priority = i8::read_options(reader, binrw::Endian::Big, ())?;
        let checksum = if header.has_checksum {
            Some(u32::read_options(reader, binrw::Endian::Big, ())?)
        } else {
            None
        };
        let mut flags = vec![0u8; usize::from(header.flag_size)];
        reader.read_exact(&mut flags)?;

        Ok(Self {
            encoding_key,
            size,
            priority,
            checksum,
            flags,
        })
    }
}

impl BinWrite for DownloadEntry {
    type Args<'a> = &'a DownloadHeader;

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        header: Self::Args<'_>,
    ) -> BinResult<()> {
        self.encoding_key.write_options(writer, endian, ())?;
        write_u40(writer, self.size)?;
        self.priority
            .write_options(writer, binrw::Endian::Big, ())?;
        if header.has_checksum {
            self.checksum
                .unwrap_or(0)
                .write_options(writer, binrw::Endian::Big, ())?;
        }
        let mut flags = self.flags.clone();
        flags.resize(usize::from(header.flag_size), 0);
        writer.write_all(&flags)?;
        Ok(())
    }
}
