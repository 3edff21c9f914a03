//! ZIP archive reading.
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 EOCD, Central Directory entries)
//! - [`parser`]: locates and decodes the Central Directory
//! - [`extractor`]: decompresses a single entry into memory
//!
//! The EOCD record at the end of the archive points at the Central
//! Directory, which lists every entry in stored order with its sizes,
//! CRC-32 and the offset of its Local File Header. Entry data follows the
//! local header.
//!
//! STORED and DEFLATE entries are supported, including ZIP64 sizes and
//! offsets. Encrypted and multi-disk archives are not.

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
