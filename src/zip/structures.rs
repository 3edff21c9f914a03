use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use anyhow::{Result, bail};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// Check length and signature of a fixed-size record, returning a cursor
/// over the bytes after the signature.
fn record_body<'a>(
    data: &'a [u8],
    signature: &[u8],
    size: usize,
    what: &str,
) -> Result<Cursor<&'a [u8]>> {
    if data.len() < size || &data[0..4] != signature {
        bail!("Invalid {what}");
    }
    Ok(Cursor::new(&data[4..size]))
}

/// End of Central Directory (EOCD) - 22 bytes plus comment
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record_body(data, Self::SIGNATURE, Self::SIZE, "End of Central Directory")?;
        Ok(Self {
            disk_number: c.read_u16::<LittleEndian>()?,
            disk_with_cd: c.read_u16::<LittleEndian>()?,
            disk_entries: c.read_u16::<LittleEndian>()?,
            total_entries: c.read_u16::<LittleEndian>()?,
            cd_size: c.read_u32::<LittleEndian>()?,
            cd_offset: c.read_u32::<LittleEndian>()?,
            comment_len: c.read_u16::<LittleEndian>()?,
        })
    }

    /// Any saturated field means the real value lives in the ZIP64 record.
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == u16::MAX
            || self.total_entries == u16::MAX
            || self.cd_size == u32::MAX
            || self.cd_offset == u32::MAX
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record_body(data, Self::SIGNATURE, Self::SIZE, "ZIP64 EOCD locator")?;
        Ok(Self {
            disk_with_eocd64: c.read_u32::<LittleEndian>()?,
            eocd64_offset: c.read_u64::<LittleEndian>()?,
            total_disks: c.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes plus extensible data
///
/// Only the fields locating the Central Directory are kept.
#[derive(Debug)]
pub struct Zip64EOCD {
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record_body(data, Self::SIGNATURE, Self::MIN_SIZE, "ZIP64 EOCD record")?;
        // record size (8), version made by (2), version needed (2)
        c.set_position(12);
        let disk_number = c.read_u32::<LittleEndian>()?;
        let disk_with_cd = c.read_u32::<LittleEndian>()?;
        let _disk_entries = c.read_u64::<LittleEndian>()?;
        Ok(Self {
            disk_number,
            disk_with_cd,
            total_entries: c.read_u64::<LittleEndian>()?,
            cd_size: c.read_u64::<LittleEndian>()?,
            cd_offset: c.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag bit 0: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Host systems from the upper byte of "version made by"
const HOST_MSDOS: u8 = 0;
const HOST_UNIX: u8 = 3;
const HOST_NTFS: u8 = 11;
const HOST_VFAT: u8 = 14;
const HOST_MACOS: u8 = 19;

/// MS-DOS directory attribute in the external attributes
const MSDOS_DIR_ATTR: u32 = 0x10;

const UNIX_FILE_TYPE_MASK: u32 = 0o170000;
const UNIX_DIR_TYPE: u32 = 0o040000;

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub version_made_by: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub external_attrs: u32,
    pub lfh_offset: u64,
}

impl ZipFileEntry {
    /// Whether the entry describes a directory.
    ///
    /// A trailing `/` is always a directory. Otherwise the external
    /// attributes are interpreted according to the host that wrote them.
    pub fn is_directory(&self) -> bool {
        if self.file_name.ends_with('/') {
            return true;
        }
        match (self.version_made_by >> 8) as u8 {
            HOST_UNIX | HOST_MACOS => {
                (self.external_attrs >> 16) & UNIX_FILE_TYPE_MASK == UNIX_DIR_TYPE
            }
            HOST_MSDOS | HOST_NTFS | HOST_VFAT => self.external_attrs & MSDOS_DIR_ATTR != 0,
            _ => false,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}
