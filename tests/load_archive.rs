use std::io::{Cursor, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use zipload::{
    ArchiveFile, LoadError, MemoryReader, load_archive, load_archive_from_reader, root_prefix,
};

enum Item<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

fn build_zip(items: &[Item], method: CompressionMethod) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = || SimpleFileOptions::default().compression_method(method);
    for item in items {
        match item {
            Item::Dir(name) => writer.add_directory(*name, options()).unwrap(),
            Item::File(name, content) => {
                writer.start_file(*name, options()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
    }
    writer.finish().unwrap().into_inner()
}

fn write_archive(dir: &TempDir, file_name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(file_name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn file(path: &str, content: &[u8]) -> ArchiveFile {
    ArchiveFile {
        relative_path: path.to_string(),
        content: content.to_vec(),
    }
}

/// Offset of the data of the entry whose Local File Header names `name`.
fn local_data_offset(archive: &[u8], name: &str) -> usize {
    let mut pos = 0;
    while let Some(found) = archive[pos..].windows(4).position(|w| w == b"PK\x03\x04") {
        let start = pos + found;
        let name_len = u16::from_le_bytes([archive[start + 26], archive[start + 27]]) as usize;
        let extra_len = u16::from_le_bytes([archive[start + 28], archive[start + 29]]) as usize;
        let name_start = start + 30;
        if &archive[name_start..name_start + name_len] == name.as_bytes() {
            return name_start + name_len + extra_len;
        }
        pos = start + 4;
    }
    panic!("no local header for {name}");
}

#[test]
fn loads_files_in_archive_order() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = build_zip(
        &[
            Item::File("a.txt", b"hello"),
            Item::Dir("sub/"),
            Item::File("sub/b.txt", b"world"),
        ],
        CompressionMethod::Deflated,
    );
    let path = write_archive(&dir, "bundle.zip", &bytes);

    let files = load_archive(&path).unwrap();
    assert_eq!(files, vec![file("a.txt", b"hello"), file("sub/b.txt", b"world")]);
}

#[test]
fn stored_and_deflated_load_identically() {
    let content: Vec<u8> = (0..10_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
    let items = [Item::File("data.bin", &content), Item::File("empty", b"")];

    let stored = load_archive_from_reader(
        MemoryReader::new(build_zip(&items, CompressionMethod::Stored)),
        "",
    )
    .unwrap();
    let deflated = load_archive_from_reader(
        MemoryReader::new(build_zip(&items, CompressionMethod::Deflated)),
        "",
    )
    .unwrap();

    assert_eq!(stored, deflated);
    assert_eq!(stored[0].content, content);
    assert!(stored[1].content.is_empty());
}

#[test]
fn directories_only_yield_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = build_zip(
        &[Item::Dir("a/"), Item::Dir("a/b/"), Item::Dir("c/")],
        CompressionMethod::Stored,
    );
    let path = write_archive(&dir, "dirs.zip", &bytes);

    assert!(load_archive(&path).unwrap().is_empty());
}

#[test]
fn skips_macos_artifacts() {
    let bytes = build_zip(
        &[
            Item::File("a.txt", b"hello"),
            Item::File("__MACOSX/._a.txt", b"resource fork"),
            Item::File("sub/.DS_Store", b"finder"),
            Item::File("sub/b.txt", b"world"),
        ],
        CompressionMethod::Deflated,
    );

    let files = load_archive_from_reader(MemoryReader::new(bytes), "").unwrap();
    let paths: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(paths, ["a.txt", "sub/b.txt"]);
}

#[test]
fn strips_root_prefix_from_names() {
    let bytes = build_zip(
        &[
            Item::Dir("site/"),
            Item::File("site/index.html", b"<html>"),
            Item::File("site/css/main.css", b"body {}"),
            Item::File("README", b"top level"),
        ],
        CompressionMethod::Stored,
    );

    let files =
        load_archive_from_reader(MemoryReader::new(bytes), root_prefix("site.zip")).unwrap();
    assert_eq!(
        files,
        vec![
            file("index.html", b"<html>"),
            file("css/main.css", b"body {}"),
            file("README", b"top level"),
        ]
    );
}

#[test]
fn uppercase_extension_keeps_prefix() {
    let bytes = build_zip(
        &[Item::File("site/index.html", b"<html>")],
        CompressionMethod::Stored,
    );

    let prefix = root_prefix("site.ZIP");
    assert_eq!(prefix, "site.ZIP");
    let files = load_archive_from_reader(MemoryReader::new(bytes), prefix).unwrap();
    assert_eq!(files, vec![file("site/index.html", b"<html>")]);
}

#[test]
fn missing_archive_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.zip");

    let err = load_archive(&path).unwrap_err();
    match &err {
        LoadError::Open { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("expected open error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Cannot open archive"));
}

#[test]
fn non_zip_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_archive(&dir, "fake.zip", b"this is plain text, not an archive");

    assert!(load_archive(&path).unwrap_err().is_open());
}

#[test]
fn truncated_archive_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = build_zip(&[Item::File("a.txt", b"hello")], CompressionMethod::Stored);
    bytes.truncate(bytes.len() - 10);
    let path = write_archive(&dir, "cut.zip", &bytes);

    assert!(load_archive(&path).unwrap_err().is_open());
}

#[test]
fn crc_mismatch_fails_without_partial_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = build_zip(
        &[Item::File("a.txt", b"hello"), Item::File("b.txt", b"world")],
        CompressionMethod::Stored,
    );
    let at = local_data_offset(&bytes, "b.txt");
    bytes[at..at + 5].copy_from_slice(b"WORLD");
    let path = write_archive(&dir, "bad.zip", &bytes);

    let err = load_archive(&path).unwrap_err();
    match &err {
        LoadError::Read { name, .. } => assert_eq!(name, "b.txt"),
        other => panic!("expected read error, got {other:?}"),
    }
    assert!(err.to_string().contains("CRC-32 mismatch"));
}

#[test]
fn corrupt_deflate_stream_is_read_error() {
    let content = b"world world world world world world".repeat(20);
    let mut bytes = build_zip(
        &[Item::File("a.txt", b"hello"), Item::File("b.txt", &content)],
        CompressionMethod::Deflated,
    );
    let at = local_data_offset(&bytes, "b.txt");
    bytes[at] = 0xFF;

    let err = load_archive_from_reader(MemoryReader::new(bytes), "").unwrap_err();
    assert!(err.is_read());
}

#[test]
fn ignored_entries_are_never_decompressed() {
    let mut bytes = build_zip(
        &[
            Item::File("__MACOSX/._a.txt", b"resource fork"),
            Item::File("a.txt", b"hello"),
        ],
        CompressionMethod::Stored,
    );
    let at = local_data_offset(&bytes, "__MACOSX/._a.txt");
    bytes[at] ^= 0xFF;

    let files = load_archive_from_reader(MemoryReader::new(bytes), "").unwrap();
    assert_eq!(files, vec![file("a.txt", b"hello")]);
}

/// Single stored entry whose ZIP64 extra field claims `claimed_size` bytes.
fn zip64_entry_claiming(name: &str, content: &[u8], claimed_size: u64) -> Vec<u8> {
    let mut crc = flate2::Crc::new();
    crc.update(content);

    let mut out = Vec::new();
    out.extend_from_slice(b"PK\x03\x04");
    out.write_u16::<LittleEndian>(45).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(crc.sum()).unwrap();
    out.write_u32::<LittleEndian>(u32::MAX).unwrap();
    out.write_u32::<LittleEndian>(u32::MAX).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(content);

    let cd_offset = out.len() as u32;
    out.extend_from_slice(b"PK\x01\x02");
    out.write_u16::<LittleEndian>(0x032D).unwrap();
    out.write_u16::<LittleEndian>(45).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(crc.sum()).unwrap();
    out.write_u32::<LittleEndian>(u32::MAX).unwrap();
    out.write_u32::<LittleEndian>(u32::MAX).unwrap();
    out.write_u16::<LittleEndian>(name.len() as u16).unwrap();
    out.write_u16::<LittleEndian>(20).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0o100644 << 16).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.extend_from_slice(name.as_bytes());
    out.write_u16::<LittleEndian>(0x0001).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();
    out.write_u64::<LittleEndian>(claimed_size).unwrap();
    out.write_u64::<LittleEndian>(claimed_size).unwrap();
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u32::<LittleEndian>(cd_size).unwrap();
    out.write_u32::<LittleEndian>(cd_offset).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out
}

#[test]
fn oversized_zip64_entry_is_read_error() {
    let bytes = zip64_entry_claiming("huge.bin", b"hello", 1 << 62);

    let err = load_archive_from_reader(MemoryReader::new(bytes), "").unwrap_err();
    match &err {
        LoadError::Read { name, .. } => assert_eq!(name, "huge.bin"),
        other => panic!("expected read error, got {other:?}"),
    }
    assert!(err.to_string().contains("Entry data is truncated"));
}

#[test]
fn zip64_sized_entry_loads() {
    let bytes = zip64_entry_claiming("small.bin", b"hello", 5);

    let files = load_archive_from_reader(MemoryReader::new(bytes), "").unwrap();
    assert_eq!(files, vec![file("small.bin", b"hello")]);
}
