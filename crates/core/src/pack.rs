//! Zip packager: serializes a built book into the EPUB archive layout.
//!
//! The `mimetype` entry goes first and uncompressed so readers can sniff the
//! format without parsing the whole archive; everything else is deflated in
//! insertion order.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::book::{Book, BookFile, MIMETYPE};
use crate::error::PackError;

const MIMETYPE_CONTENT: &[u8] = b"application/epub+zip";

/// Assemble the archive in memory: mimetype, then the builder's internal
/// files, then the book's own files.
pub fn pack_epub(book: &Book, internal: &[BookFile]) -> Result<Vec<u8>, PackError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let stored: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file(MIMETYPE, stored)?;
    writer.write_all(MIMETYPE_CONTENT)?;

    let deflated: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in internal.iter().chain(book.files.iter()) {
        writer.start_file(file.path.as_str(), deflated)?;
        writer.write_all(&file.data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Pack an already-laid-out tree (name, data) into an EPUB-shaped archive
/// without touching its contents. An existing `mimetype` entry is reused;
/// a missing one is synthesized.
pub fn pack_folder(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, PackError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let stored: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    let mimetype = files
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(MIMETYPE))
        .map(|(_, data)| data.as_slice())
        .unwrap_or(MIMETYPE_CONTENT);
    writer.start_file(MIMETYPE, stored)?;
    writer.write_all(mimetype)?;

    let deflated: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in files {
        if name.eq_ignore_ascii_case(MIMETYPE) {
            continue;
        }
        writer.start_file(name.as_str(), deflated)?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Write the archive to disk via a temporary sibling, so an interrupted
/// write never leaves a truncated file under the final name.
pub fn save(data: &[u8], path: &Path) -> Result<(), PackError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = Path::new(&partial);
    fs::write(partial, data)?;
    fs::rename(partial, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::EpubVersion;
    use std::io::Read;
    use zip::ZipArchive;

    fn sample() -> (Book, Vec<BookFile>) {
        let mut book = Book::new(EpubVersion::V2);
        book.add_chapter(b"<html/>".to_vec(), Vec::new());
        book.add_file("style.css", b"body{}".to_vec());
        let internal = vec![BookFile {
            path: "content.opf".to_string(),
            data: b"<package/>".to_vec(),
            attrs: Default::default(),
            chapter_refs: Vec::new(),
        }];
        (book, internal)
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let (book, internal) = sample();
        let data = pack_epub(&book, &internal).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();

        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), MIMETYPE);
        assert_eq!(first.compression(), CompressionMethod::Stored);
        assert_eq!(first.size(), MIMETYPE_CONTENT.len() as u64);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let (book, internal) = sample();
        let data = pack_epub(&book, &internal).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();

        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["mimetype", "content.opf", "chapter_0001.html", "style.css"]
        );

        let mut css = String::new();
        archive.by_name("style.css").unwrap().read_to_string(&mut css).unwrap();
        assert_eq!(css, "body{}");
    }

    #[test]
    fn save_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.epub");
        save(b"data", &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"data");
        assert!(!tmp.path().join("out.epub.part").exists());
    }
}
