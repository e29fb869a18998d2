use crate::keys::ContentKey;
use crate::util::{read_cstring, write_cstring};
use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite};

/// File listed in an install manifest
///
/// Wire layout: `path\0 | ckey[16] | size u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    /// Install path, backslash separated as published
    pub path: String,
    /// Content key of the decoded file
    pub content_key: ContentKey,
    /// Decoded size
    pub size: u32,
}

impl BinRead for InstallEntry {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let path = read_cstring(reader)?;
        let content_key = ContentKey::read_options(reader, endian, ())?;
        let size = u32::read_options(reader, binrw::Endian::Big, ())?;
        Ok(Self {
            path,
            content_key,
            size,
        })
    }
}

impl BinWrite for InstallEntry {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        write_cstring(writer, &self.path)?;
        self.content_key.write_options(writer, endian, ())?;
        self.size.write_options(writer, binrw::Endian::Big, ())
    }
}
