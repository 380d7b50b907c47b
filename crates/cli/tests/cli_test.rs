//! Basic CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecated for custom build-dir; still works for default

use std::fs;
use std::path::Path;

use assert_cmd::Command;

fn write_book(dir: &Path) {
    fs::write(dir.join("book.ini"), "[book]\nname=Tiny\nauthor=Nobody\n").unwrap();
    fs::write(
        dir.join("book.html"),
        "<html><head><title>Tiny</title></head><body><h1>A</h1><p>x</p></body></html>",
    )
    .unwrap();
}

#[test]
fn help_prints_and_exits_success() {
    Command::cargo_bin("html2epub")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn make_writes_an_epub() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("tiny");
    fs::create_dir(&book).unwrap();
    write_book(&book);
    let out = tmp.path().join("tiny.epub");

    Command::cargo_bin("html2epub")
        .unwrap()
        .args(["make", book.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();

    let data = fs::read(&out).unwrap();
    assert_eq!(&data[..2], b"PK");
}

#[test]
fn make_missing_input_fails() {
    let out = Command::cargo_bin("html2epub")
        .unwrap()
        .args(["make", "/nonexistent/book"])
        .assert()
        .failure();
    let stderr = std::str::from_utf8(&out.get_output().stderr).unwrap();
    assert!(stderr.contains("Error:"), "{stderr}");
}

#[test]
fn extract_then_pack_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let book = tmp.path().join("tiny");
    fs::create_dir(&book).unwrap();
    write_book(&book);
    let epub = tmp.path().join("tiny.epub");

    Command::cargo_bin("html2epub")
        .unwrap()
        .args(["make", book.to_str().unwrap(), "-o", epub.to_str().unwrap()])
        .assert()
        .success();

    let unpacked = tmp.path().join("unpacked");
    Command::cargo_bin("html2epub")
        .unwrap()
        .args([
            "extract",
            epub.to_str().unwrap(),
            unpacked.to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(unpacked.join("mimetype").exists());
    assert!(unpacked.join("content.opf").exists());

    let repacked = tmp.path().join("repacked.epub");
    Command::cargo_bin("html2epub")
        .unwrap()
        .args([
            "pack",
            unpacked.to_str().unwrap(),
            repacked.to_str().unwrap(),
        ])
        .assert()
        .success();
    let data = fs::read(&repacked).unwrap();
    assert_eq!(&data[..2], b"PK");
}

#[test]
fn batch_converts_a_directory_of_books() {
    let tmp = tempfile::tempdir().unwrap();
    let books = tmp.path().join("books");
    for name in ["one", "two"] {
        let dir = books.join(name);
        fs::create_dir_all(&dir).unwrap();
        write_book(&dir);
    }
    let outdir = tmp.path().join("out");
    fs::create_dir(&outdir).unwrap();

    let out = Command::cargo_bin("html2epub")
        .unwrap()
        .args([
            "batch",
            books.to_str().unwrap(),
            "--outdir",
            outdir.to_str().unwrap(),
        ])
        .assert()
        .success();
    let stdout = std::str::from_utf8(&out.get_output().stdout).unwrap();
    assert!(stdout.contains("succeeded: 2"), "{stdout}");

    assert!(outdir.join("one.epub").exists());
    assert!(outdir.join("two.epub").exists());
}

#[test]
fn merge_combines_html_files() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("01.html"),
        "<html>\n<body>\n<p>one</p>\n</body>\n</html>\n",
    )
    .unwrap();
    fs::write(
        tmp.path().join("02.html"),
        "<html>\n<body>\n<p>two</p>\n</body>\n</html>\n",
    )
    .unwrap();
    let out = tmp.path().join("merged.html");

    Command::cargo_bin("html2epub")
        .unwrap()
        .args(["merge", tmp.path().to_str().unwrap(), out.to_str().unwrap()])
        .assert()
        .success();

    let merged = fs::read_to_string(&out).unwrap();
    let one = merged.find("<p>one</p>").unwrap();
    let two = merged.find("<p>two</p>").unwrap();
    assert!(one < two);
}
