use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive, in Central Directory order
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Decompress an entry fully into memory.
    ///
    /// The result is checked against the recorded uncompressed size and
    /// CRC-32; a mismatch is an error.
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            bail!("Encrypted entries are not supported");
        }

        let data_offset = self.parser.get_data_offset(entry)?;
        match data_offset.checked_add(entry.compressed_size) {
            Some(end) if end <= self.parser.reader().size() => {}
            _ => bail!(
                "Entry data is truncated ({} bytes at offset {} exceed the archive)",
                entry.compressed_size,
                data_offset
            ),
        }
        let mut compressed = vec![0u8; usize::try_from(entry.compressed_size)?];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut compressed)
            .context("Entry data is truncated")?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Deflate => inflate(&compressed, entry.uncompressed_size)?,
            CompressionMethod::Unknown(method) => {
                bail!("Unsupported compression method: {method}")
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch: expected {} bytes, got {}",
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!(
                "CRC-32 mismatch: expected {:08x}, got {:08x}",
                entry.crc32,
                crc.sum()
            );
        }

        Ok(data)
    }
}

fn inflate(compressed: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    // Read one byte past the expected size so an oversized stream is caught
    // without inflating all of it.
    let mut out = Vec::with_capacity(expected_size.min(64 * 1024 * 1024) as usize);
    DeflateDecoder::new(compressed)
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut out)
        .context("Corrupt DEFLATE stream")?;
    Ok(out)
}
