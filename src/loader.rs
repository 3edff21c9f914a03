//! The archive loader: reads every retained file of an archive into memory.

use std::path::Path;

use tracing::{debug, trace};

use crate::error::LoadError;
use crate::io::{LocalFileReader, ReadAt};
use crate::zip::ZipExtractor;

/// Substrings marking macOS artifacts: resource-fork folders
/// (`__MACOSX/`) and Finder metadata (`.DS_Store`).
pub const IGNORE_SUBSTRINGS: &[&str] = &["MACOSX", ".DS_Store"];

/// Characters trimmed from the end of an archive path to get its root prefix.
const ROOT_TRIM_CHARS: &[char] = &['.', 'z', 'i', 'p'];

/// One file loaded from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub relative_path: String,
    pub content: Vec<u8>,
}

/// Load every file in the zip archive at `path` into memory.
///
/// Directories, entries whose relative path is empty, and entries matching
/// [`IGNORE_SUBSTRINGS`] are skipped. Files come back in the archive's
/// Central Directory order. The first failing entry aborts the load.
///
/// ```no_run
/// let files = zipload::load_archive("bundle.zip")?;
/// for file in &files {
///     println!("{} ({} bytes)", file.relative_path, file.content.len());
/// }
/// # Ok::<(), zipload::LoadError>(())
/// ```
pub fn load_archive(path: impl AsRef<Path>) -> Result<Vec<ArchiveFile>, LoadError> {
    let path = path.as_ref();
    let reader = LocalFileReader::new(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let path_str = path.to_string_lossy();
    let prefix = root_prefix(&path_str);
    debug!(path = %path.display(), prefix, "loading archive");

    // The reader, and with it the file handle, is dropped on every return path.
    load_archive_from_reader(reader, prefix).map_err(|err| match err {
        LoadError::Open { source, .. } => LoadError::Open {
            path: path.to_path_buf(),
            source,
        },
        read => read,
    })
}

/// Load every file from an already opened archive source.
///
/// `root_prefix` is stripped (with a trailing `/`) from entry names the
/// same way [`load_archive`] strips the prefix it derives from the path.
/// Open errors carry an empty path.
pub fn load_archive_from_reader<R: ReadAt>(
    reader: R,
    root_prefix: &str,
) -> Result<Vec<ArchiveFile>, LoadError> {
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().map_err(|source| LoadError::Open {
        path: Default::default(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in &entries {
        if entry.is_directory() {
            trace!(name = %entry.file_name, "skipping directory");
            continue;
        }

        let relative = relative_path(&entry.file_name, root_prefix);
        if relative.is_empty() || is_ignored(relative) {
            trace!(name = %entry.file_name, "skipping ignored entry");
            continue;
        }

        let content = extractor
            .extract_to_memory(entry)
            .map_err(|source| LoadError::Read {
                name: entry.file_name.clone(),
                source,
            })?;
        trace!(path = relative, bytes = content.len(), "loaded entry");

        files.push(ArchiveFile {
            relative_path: relative.to_string(),
            content,
        });
    }

    debug!(
        entries = entries.len(),
        loaded = files.len(),
        "archive loaded"
    );
    Ok(files)
}

/// Root prefix of an archive path: every trailing `.`, `z`, `i` or `p`
/// is trimmed, so `"data.zip"` gives `"data"` but `"hi.zip"` gives `"h"`.
/// Paths such as `"data.ZIP"` are left untouched.
pub fn root_prefix(path: &str) -> &str {
    path.trim_end_matches(ROOT_TRIM_CHARS)
}

/// Entry name relative to `root_prefix`, or the full name when it does
/// not start with `root_prefix/`.
pub fn relative_path<'a>(name: &'a str, root_prefix: &str) -> &'a str {
    name.strip_prefix(root_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

pub fn is_ignored(relative_path: &str) -> bool {
    IGNORE_SUBSTRINGS
        .iter()
        .any(|pattern| relative_path.contains(pattern))
}
