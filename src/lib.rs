//! # zipload
//!
//! Load the files of a zip archive into memory.
//!
//! [`load_archive`] opens an archive, walks its Central Directory in
//! stored order and returns every file as an [`ArchiveFile`] holding its
//! relative path and fully decompressed content. Directory entries and
//! macOS artifacts (`__MACOSX/` resource forks, `.DS_Store` files) are
//! skipped.
//!
//! Entry names are made relative to a root prefix derived from the archive
//! path: trailing `.`, `z`, `i` and `p` characters are trimmed from the
//! path, and `<prefix>/` is stripped from names that start with it. An
//! archive at `site.zip` whose entries live under `site/` therefore
//! yields paths such as `index.html`.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, with size and CRC-32 verification
//! - ZIP64 sizes and offsets
//! - Fail-fast: the first unreadable entry aborts the load
//!
//! ## Example
//!
//! ```no_run
//! use zipload::{LoadError, load_archive};
//!
//! fn main() -> Result<(), LoadError> {
//!     for file in load_archive("site.zip")? {
//!         println!("{}: {} bytes", file.relative_path, file.content.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod loader;
pub mod zip;

pub use cli::Cli;
pub use error::LoadError;
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use loader::{
    ArchiveFile, IGNORE_SUBSTRINGS, is_ignored, load_archive, load_archive_from_reader,
    relative_path, root_prefix,
};
pub use zip::{ZipExtractor, ZipFileEntry};
