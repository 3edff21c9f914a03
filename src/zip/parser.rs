//! Central directory parser.
//!
//! Reads the archive from the end: the End of Central Directory record
//! (and its ZIP64 counterpart when present) gives the location of the
//! Central Directory, whose headers are decoded in stored order. Local
//! File Headers are only touched when an entry's data is requested.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};
use tracing::trace;

use super::structures::*;

/// Largest comment the EOCD record can announce.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field tag.
const ZIP64_EXTRA_ID: u16 = 0x0001;

const U32_SATURATED: u64 = 0xFFFF_FFFF;

/// Where the Central Directory lives and how many headers it holds.
#[derive(Debug, Clone, Copy)]
struct DirectoryLocation {
    offset: u64,
    size: u64,
    entries: u64,
}

/// Low-level ZIP archive parser over any [`ReadAt`] source.
///
/// Normally driven through [`ZipExtractor`](super::ZipExtractor).
pub struct ZipParser<R: ReadAt> {
    reader: R,
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and decode the End of Central Directory record.
    ///
    /// Returns the record and its offset in the archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let fixed = EndOfCentralDirectory::SIZE as u64;
        if self.size < fixed {
            bail!("Not a valid ZIP file (only {} bytes)", self.size);
        }

        // Common case: no archive comment, record sits flush with the end.
        let offset = self.size - fixed;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
        }

        let window = (MAX_COMMENT_SIZE + fixed).min(self.size);
        let window_start = self.size - window;
        let mut buf = vec![0u8; window as usize];
        self.reader.read_exact_at(window_start, &mut buf)?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            // Bytes trailing the comment are tolerated, the comment itself must fit.
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if i + EndOfCentralDirectory::SIZE + comment_len <= buf.len() {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, window_start + i as u64));
            }
        }

        bail!("Not a valid ZIP file (no End of Central Directory record)")
    }

    /// Read the ZIP64 End of Central Directory through its locator, which
    /// sits immediately before the regular EOCD.
    ///
    /// Returns `None` when there is no locator; the saturated 32-bit values
    /// of the regular EOCD are then taken as they are.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Option<Zip64EOCD>> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
            return Ok(None);
        };
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;
        if &locator_buf[0..4] != Zip64EOCDLocator::SIGNATURE {
            return Ok(None);
        }
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;
        if locator.disk_with_eocd64 != 0 || locator.total_disks > 1 {
            bail!("Multi-disk archives are not supported");
        }

        let mut record = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut record)
            .context("Invalid ZIP64 format (record out of range)")?;
        Zip64EOCD::from_bytes(&record).map(Some)
    }

    fn directory_location(&self) -> Result<DirectoryLocation> {
        let (eocd, eocd_offset) = self.find_eocd()?;
        if eocd.is_multi_disk() {
            bail!("Multi-disk archives are not supported");
        }

        let zip64 = if eocd.is_zip64() {
            self.read_zip64_eocd(eocd_offset)?
        } else {
            None
        };

        let location = match zip64 {
            Some(eocd64) => {
                if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
                    bail!("Multi-disk archives are not supported");
                }
                DirectoryLocation {
                    offset: eocd64.cd_offset,
                    size: eocd64.cd_size,
                    entries: eocd64.total_entries,
                }
            }
            None => DirectoryLocation {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                entries: eocd.total_entries as u64,
            },
        };

        match location.offset.checked_add(location.size) {
            Some(end) if end <= self.size => Ok(location),
            _ => bail!(
                "Central Directory out of range (offset {}, size {}, archive {} bytes)",
                location.offset,
                location.size,
                self.size
            ),
        }
    }

    /// Decode every Central Directory header, in stored order.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let location = self.directory_location()?;
        trace!(
            offset = location.offset,
            size = location.size,
            entries = location.entries,
            "reading central directory"
        );

        let mut directory = vec![0u8; location.size as usize];
        self.reader.read_exact_at(location.offset, &mut directory)?;

        // Every header is at least CDFH_MIN_SIZE bytes, which bounds a bogus count.
        let capacity = location
            .entries
            .min((directory.len() / CDFH_MIN_SIZE) as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(directory.as_slice());
        for index in 0..location.entries {
            let entry = parse_cdfh(&mut cursor)
                .with_context(|| format!("Corrupt Central Directory header #{index}"))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Offset of the entry's data, just past its Local File Header.
    ///
    /// The local name and extra field lengths may differ from the
    /// central copy, so the header is read back from the archive.
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh = [0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh)
            .context("Local File Header out of range")?;
        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header at offset {}", entry.lfh_offset);
        }

        let mut cursor = Cursor::new(&lfh[26..]);
        let name_len = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + name_len + extra_len)
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        bail!("Invalid Central Directory File Header signature");
    }

    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let name_len = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_len = cursor.read_u16::<LittleEndian>()? as u64;
    let comment_len = cursor.read_u16::<LittleEndian>()? as u64;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut name = vec![0u8; name_len];
    cursor.read_exact(&mut name)?;
    let file_name = String::from_utf8_lossy(&name).into_owned();

    let extra_end = cursor.position() + extra_len;
    if extra_end > cursor.get_ref().len() as u64 {
        bail!("Extra field of {file_name:?} runs past the Central Directory");
    }

    while cursor.position() + 4 <= extra_end {
        let tag = cursor.read_u16::<LittleEndian>()?;
        let field_len = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = (cursor.position() + field_len).min(extra_end);

        // 64-bit values appear only for the header fields that were saturated,
        // in this fixed order.
        if tag == ZIP64_EXTRA_ID {
            for slot in [&mut uncompressed_size, &mut compressed_size, &mut lfh_offset] {
                if *slot == U32_SATURATED && cursor.position() + 8 <= field_end {
                    *slot = cursor.read_u64::<LittleEndian>()?;
                }
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_end + comment_len);

    Ok(ZipFileEntry {
        file_name,
        version_made_by,
        flags,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        external_attrs,
        lfh_offset,
    })
}
