//! One conversion job end to end: read the input folder's configuration and
//! main document, split, build the container, and pack the archive.

use std::fs;
use std::path::{Path, PathBuf};

use crate::book::{Book, EpubVersion};
use crate::builder;
use crate::config::{clamp_option, BookConfig};
use crate::error::{ConfigError, FolderError, MakeError};
use crate::folder::InputFolder;
use crate::markup::MarkupTree;
use crate::pack;
use crate::split::{split_into_book, SplitOptions, TriggerMode};

/// Reserved configuration file name inside the input folder.
pub const BOOK_INI: &str = "book.ini";
/// Reserved main-content document name inside the input folder.
pub const BOOK_HTML: &str = "book.html";

/// Conventional cover image names, in lookup priority order.
const COVER_NAMES: &[&str] = &["cover.png", "cover.jpg", "cover.gif"];

/// A finished conversion, kept in memory so callers can decide whether to
/// write it to disk or stream it elsewhere.
#[derive(Debug)]
pub struct MakeResult {
    pub data: Vec<u8>,
    pub title: String,
    /// Output path from the book's configuration, when set.
    pub output_path: Option<String>,
}

impl MakeResult {
    /// A download-friendly file name: the configured output name when
    /// present, otherwise derived from the title.
    pub fn suggested_name(&self) -> String {
        if let Some(path) = &self.output_path {
            if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
                return name.to_string();
            }
        }
        let stem: String = self
            .title
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        if stem.chars().all(|c| c == '_') {
            "book.epub".to_string()
        } else {
            format!("{}.epub", stem)
        }
    }
}

/// Convert one input folder into an EPUB archive held in memory.
pub fn make_book(folder: &mut InputFolder) -> Result<MakeResult, MakeError> {
    let ini = folder.open(BOOK_INI).map_err(|e| ConfigError::MissingInput {
        name: BOOK_INI.to_string(),
        detail: e.to_string(),
    })?;
    let cfg = BookConfig::parse(&String::from_utf8_lossy(&ini));

    let version = match cfg.get_int("/book/epub", 2) {
        2 => EpubVersion::V2,
        3 => EpubVersion::V3,
        other => {
            tracing::warn!(value = other, "unsupported epub version, using 2");
            EpubVersion::V2
        }
    };

    let mut book = Book::new(version);
    book.set_id(cfg.get_str("/book/id", ""));
    book.title = cfg.get_str("/book/name", "").to_string();
    if book.title.is_empty() {
        tracing::warn!("book name is empty");
    }
    book.author = cfg.get_str("/book/author", "").to_string();
    if book.author.is_empty() {
        tracing::warn!("book author is empty");
    }
    book.publisher = cfg.get_str("/book/publisher", "").to_string();
    book.description = cfg.get_str("/book/description", "").to_string();
    book.language = cfg.get_str("/book/language", "en").to_string();
    book.fullscreen_extension = cfg.get_bool("/book/duokan", false);

    let opts = SplitOptions {
        toc_depth: clamp_option(cfg.get_int("/book/toc", 2), 1, 6, 2, "book/toc"),
        split_at_level: clamp_option(cfg.get_int("/split/atlevel", 1), 0, 6, 1, "split/atlevel"),
        trigger: if cfg.get_bool("/split/bydiv", false) {
            TriggerMode::ByMarker
        } else {
            TriggerMode::ByHeading
        },
        fullscreen_extension: book.fullscreen_extension,
    };

    let html = folder.open(BOOK_HTML).map_err(|e| ConfigError::MissingInput {
        name: BOOK_HTML.to_string(),
        detail: e.to_string(),
    })?;
    let mut tree = MarkupTree::parse(&String::from_utf8_lossy(&html));
    split_into_book(&mut tree, &opts, &mut book)?;

    add_remaining_files(folder, &mut book)?;

    let internal = builder::build(&book)?;
    let data = pack::pack_epub(&book, &internal)?;
    tracing::info!(
        title = %book.title,
        files = book.files.len(),
        bytes = data.len(),
        "book assembled"
    );

    let output_path = cfg.get_str("/output/path", "").trim().to_string();
    Ok(MakeResult {
        data,
        title: book.title,
        output_path: (!output_path.is_empty()).then_some(output_path),
    })
}

/// Add every input file except the reserved names as a passthrough asset,
/// then record the conventional cover image if one is present.
fn add_remaining_files(folder: &mut InputFolder, book: &mut Book) -> Result<(), FolderError> {
    let mut names = folder.file_names()?;
    names.sort();
    for name in names {
        let lower = name.to_ascii_lowercase();
        if lower == BOOK_INI || lower == BOOK_HTML {
            continue;
        }
        let data = folder.open(&name)?;
        book.add_file(&name, data);
    }
    for candidate in COVER_NAMES {
        if let Some(file) = book
            .files
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(candidate))
        {
            book.cover_path = Some(file.path.clone());
            break;
        }
    }
    Ok(())
}

/// Re-pack an already-unpacked EPUB tree verbatim.
pub fn pack_tree(folder: &mut InputFolder) -> Result<Vec<u8>, MakeError> {
    let mut names = folder.file_names()?;
    names.sort();
    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let data = folder.open(&name)?;
        files.push((name, data));
    }
    Ok(pack::pack_folder(&files)?)
}

/// Convert one input path (folder or zip) and write the archive to disk.
/// Returns the path written. Each call gets its own tracing span so batch
/// logs stay attributable.
pub fn make_file(
    input: &Path,
    outdir: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<PathBuf, MakeError> {
    let span = tracing::info_span!("job", input = %input.display());
    let _guard = span.enter();

    let mut folder = InputFolder::open_path(input)?;
    let result = make_book(&mut folder)?;
    let target = resolve_output(input, outdir, output_override, result.output_path.as_deref());
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(MakeError::Io)?;
        }
    }
    pack::save(&result.data, &target)?;
    tracing::info!(output = %target.display(), "epub written");
    Ok(target)
}

/// Output resolution order: explicit override, then the output directory
/// (keeping the configured or input-derived file name), then the path from
/// the book's configuration, then a sibling of the input.
fn resolve_output(
    input: &Path,
    outdir: Option<&Path>,
    output_override: Option<&Path>,
    configured: Option<&str>,
) -> PathBuf {
    if let Some(path) = output_override {
        return path.to_path_buf();
    }
    let file_name = configured
        .and_then(|p| Path::new(p).file_name().map(|n| n.to_os_string()))
        .unwrap_or_else(|| {
            let mut name = input
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_else(|| "book".into());
            name.push(".epub");
            name
        });
    if let Some(dir) = outdir {
        return dir.join(file_name);
    }
    if let Some(path) = configured {
        return PathBuf::from(path);
    }
    input.with_extension("epub")
}
