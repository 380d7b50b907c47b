//! Container builder: renders the EPUB structural files (`container.xml`,
//! `content.opf`, navigation document, cover page) from a populated `Book`.
//!
//! The builder never mutates the book; it returns the generated internal
//! files for the packager to place ahead of the book's own files.

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use quick_xml::escape::escape;

use crate::book::{
    format_rfc3339, Book, BookFile, ChapterRef, EpubVersion, FileAttrs, CONTAINER_XML,
    CONTENT_OPF, COVER_PAGE, NAV_XHTML, TOC_NCX,
};
use crate::error::BuildError;
use crate::media::media_type;

/// Vendor rendering property emitted on cover and full-page-image spine
/// items when the extension is enabled.
const FULLSCREEN_PROPERTY: &str = "duokan-page-fullscreen";

const CONTAINER_CONTENT: &str = "\
<?xml version=\"1.0\" encoding=\"utf-8\"?>
<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">
<rootfiles>
<rootfile full-path=\"content.opf\" media-type=\"application/oebps-package+xml\"/>
</rootfiles>
</container>
";

/// Render all structural files for the book. Returned files carry the
/// `internal` attribute and are packed before the book's own files.
pub fn build(book: &Book) -> Result<Vec<BookFile>, BuildError> {
    let mut files = Vec::with_capacity(4);
    files.push(internal_file(CONTAINER_XML, CONTAINER_CONTENT.to_string()));
    files.push(internal_file(CONTENT_OPF, render_opf(book)?));
    match book.epub_version {
        EpubVersion::V2 => files.push(internal_file(TOC_NCX, render_ncx(book)?)),
        EpubVersion::V3 => files.push(internal_file(NAV_XHTML, render_nav(book)?)),
    }
    if let Some(path) = cover_image(book) {
        files.push(internal_file(COVER_PAGE, render_cover_page(path)?));
    }
    Ok(files)
}

fn internal_file(path: &str, content: String) -> BookFile {
    BookFile {
        path: path.to_string(),
        data: content.into_bytes(),
        attrs: FileAttrs {
            content: false,
            fullscreen_page: false,
            internal: true,
        },
        chapter_refs: Vec::new(),
    }
}

/// The cover image path, but only when the image actually exists among the
/// book's files; a dangling cover path is ignored.
fn cover_image(book: &Book) -> Option<&str> {
    book.cover_path
        .as_deref()
        .filter(|path| book.file(path).is_some())
}

/// Manifest id for the file at `index` in the book's file list.
fn item_id(index: usize) -> String {
    format!("item{:04}", index + 1)
}

fn render_opf(book: &Book) -> Result<String, BuildError> {
    let mut out = String::with_capacity(2048);
    let version = match book.epub_version {
        EpubVersion::V2 => "2.0",
        EpubVersion::V3 => "3.0",
    };
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(
        out,
        "<package xmlns=\"http://www.idpf.org/2007/opf\" unique-identifier=\"BookId\" version=\"{}\">",
        version
    )?;

    writeln!(
        out,
        "<metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">"
    )?;
    writeln!(out, "<dc:identifier id=\"BookId\">{}</dc:identifier>", escape(&book.id))?;
    writeln!(out, "<dc:title>{}</dc:title>", escape(&book.title))?;
    writeln!(out, "<dc:language>{}</dc:language>", escape(&book.language))?;
    match book.epub_version {
        EpubVersion::V2 => {
            if !book.author.is_empty() {
                writeln!(
                    out,
                    "<dc:creator opf:role=\"aut\">{}</dc:creator>",
                    escape(&book.author)
                )?;
            }
            writeln!(out, "<dc:date>{}</dc:date>", book.created)?;
        }
        EpubVersion::V3 => {
            if !book.author.is_empty() {
                writeln!(out, "<dc:creator id=\"creator\">{}</dc:creator>", escape(&book.author))?;
                writeln!(
                    out,
                    "<meta refines=\"#creator\" property=\"role\" scheme=\"marc:relators\">aut</meta>"
                )?;
            }
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            writeln!(
                out,
                "<meta property=\"dcterms:modified\">{}</meta>",
                format_rfc3339(now)
            )?;
        }
    }
    if !book.publisher.is_empty() {
        writeln!(out, "<dc:publisher>{}</dc:publisher>", escape(&book.publisher))?;
    }
    if !book.description.is_empty() {
        writeln!(
            out,
            "<dc:description>{}</dc:description>",
            escape(&book.description)
        )?;
    }
    if let Some(path) = cover_image(book) {
        if let Some(index) = book.files.iter().position(|f| f.path == path) {
            writeln!(out, "<meta name=\"cover\" content=\"{}\"/>", item_id(index))?;
        }
    }
    writeln!(out, "</metadata>")?;

    writeln!(out, "<manifest>")?;
    match book.epub_version {
        EpubVersion::V2 => writeln!(
            out,
            "<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>"
        )?,
        EpubVersion::V3 => writeln!(
            out,
            "<item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"
        )?,
    }
    if cover_image(book).is_some() {
        writeln!(
            out,
            "<item id=\"cover\" href=\"{}\" media-type=\"application/xhtml+xml\"/>",
            COVER_PAGE
        )?;
    }
    for (index, file) in book.files.iter().enumerate() {
        writeln!(
            out,
            "<item id=\"{}\" href=\"{}\" media-type=\"{}\"/>",
            item_id(index),
            escape(&file.path),
            media_type(&file.path)
        )?;
    }
    writeln!(out, "</manifest>")?;

    match book.epub_version {
        EpubVersion::V2 => writeln!(out, "<spine toc=\"ncx\">")?,
        EpubVersion::V3 => writeln!(out, "<spine>")?,
    }
    if cover_image(book).is_some() {
        if book.fullscreen_extension {
            writeln!(
                out,
                "<itemref idref=\"cover\" linear=\"no\" properties=\"{}\"/>",
                FULLSCREEN_PROPERTY
            )?;
        } else {
            writeln!(out, "<itemref idref=\"cover\" linear=\"no\"/>")?;
        }
    }
    for (index, file) in book.files.iter().enumerate() {
        if !file.attrs.content {
            continue;
        }
        if file.attrs.fullscreen_page && book.fullscreen_extension {
            writeln!(
                out,
                "<itemref idref=\"{}\" properties=\"{}\"/>",
                item_id(index),
                FULLSCREEN_PROPERTY
            )?;
        } else {
            writeln!(out, "<itemref idref=\"{}\"/>", item_id(index))?;
        }
    }
    writeln!(out, "</spine>")?;

    if book.epub_version == EpubVersion::V2 && cover_image(book).is_some() {
        writeln!(out, "<guide>")?;
        writeln!(
            out,
            "<reference type=\"cover\" title=\"Cover\" href=\"{}\"/>",
            COVER_PAGE
        )?;
        writeln!(out, "</guide>")?;
    }

    writeln!(out, "</package>")?;
    Ok(out)
}

/// One step of the navigation outline: open a nested entry or close the
/// innermost open one.
enum OutlineEvent<'a> {
    Open {
        path: &'a str,
        entry: &'a ChapterRef,
    },
    Close,
}

/// Turn the flat (path, chapter-ref) sequence into balanced open/close
/// events, one nesting level per entry. An entry at or above the innermost
/// open level closes back up to its own depth first, so every `Open` gets
/// exactly one `Close` and nesting never skips a level.
fn outline_events<'a>(entries: &'a [(String, ChapterRef)]) -> (Vec<OutlineEvent<'a>>, usize) {
    let mut events = Vec::with_capacity(entries.len() * 2);
    let mut stack: Vec<u8> = Vec::new();
    let mut max_depth = 0;
    for (path, entry) in entries {
        while stack.last().is_some_and(|&level| level >= entry.level) {
            stack.pop();
            events.push(OutlineEvent::Close);
        }
        events.push(OutlineEvent::Open { path, entry });
        stack.push(entry.level);
        max_depth = max_depth.max(stack.len());
    }
    for _ in 0..stack.len() {
        events.push(OutlineEvent::Close);
    }
    (events, max_depth)
}

/// TOC entries for rendering. A book with content but no recorded chapter
/// references still gets one entry pointing at its first fragment, so the
/// navigation document is never empty.
fn outline_entries(book: &Book) -> Vec<(String, ChapterRef)> {
    let mut entries: Vec<(String, ChapterRef)> = book
        .toc_entries()
        .map(|(path, entry)| (path.to_string(), entry.clone()))
        .collect();
    if entries.is_empty() {
        if let Some(first) = book.files.iter().find(|f| f.attrs.content) {
            let title = if book.title.is_empty() {
                "Start".to_string()
            } else {
                book.title.clone()
            };
            entries.push((
                first.path.clone(),
                ChapterRef {
                    level: 1,
                    title,
                    anchor: String::new(),
                },
            ));
        }
    }
    entries
}

fn render_ncx(book: &Book) -> Result<String, BuildError> {
    let entries = outline_entries(book);
    let (events, depth) = outline_events(&entries);

    let mut out = String::with_capacity(1024);
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(
        out,
        "<!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">"
    )?;
    writeln!(
        out,
        "<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">"
    )?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta name=\"dtb:uid\" content=\"{}\"/>", escape(&book.id))?;
    writeln!(out, "<meta name=\"dtb:depth\" content=\"{}\"/>", depth)?;
    writeln!(out, "<meta name=\"dtb:totalPageCount\" content=\"0\"/>")?;
    writeln!(out, "<meta name=\"dtb:maxPageNumber\" content=\"0\"/>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<docTitle><text>{}</text></docTitle>", escape(&book.title))?;
    writeln!(out, "<navMap>")?;

    let mut play_order = 0;
    for event in &events {
        match event {
            OutlineEvent::Open { path, entry } => {
                play_order += 1;
                writeln!(
                    out,
                    "<navPoint id=\"navpoint-{order}\" playOrder=\"{order}\">",
                    order = play_order
                )?;
                writeln!(
                    out,
                    "<navLabel><text>{}</text></navLabel>",
                    escape(&entry.title)
                )?;
                writeln!(
                    out,
                    "<content src=\"{}{}\"/>",
                    escape(*path),
                    escape(&entry.anchor)
                )?;
            }
            OutlineEvent::Close => writeln!(out, "</navPoint>")?,
        }
    }

    writeln!(out, "</navMap>")?;
    writeln!(out, "</ncx>")?;
    Ok(out)
}

fn render_nav(book: &Book) -> Result<String, BuildError> {
    let entries = outline_entries(book);
    let (events, _) = outline_events(&entries);

    let mut out = String::with_capacity(1024);
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(
        out,
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">"
    )?;
    writeln!(out, "<head><title>{}</title></head>", escape(&book.title))?;
    writeln!(out, "<body>")?;
    writeln!(out, "<nav epub:type=\"toc\" id=\"toc\">")?;
    writeln!(out, "<ol>")?;

    // `entry_open` tracks a <li> still waiting for its closing tag; an Open
    // while one is pending nests a fresh <ol> inside it.
    let mut entry_open = false;
    for event in &events {
        match event {
            OutlineEvent::Open { path, entry } => {
                if entry_open {
                    writeln!(out, "<ol>")?;
                }
                write!(
                    out,
                    "<li><a href=\"{}{}\">{}</a>",
                    escape(*path),
                    escape(&entry.anchor),
                    escape(&entry.title)
                )?;
                entry_open = true;
            }
            OutlineEvent::Close => {
                if entry_open {
                    writeln!(out, "</li>")?;
                    entry_open = false;
                } else {
                    writeln!(out, "</ol></li>")?;
                }
            }
        }
    }

    writeln!(out, "</ol>")?;
    writeln!(out, "</nav>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

fn render_cover_page(image_path: &str) -> Result<String, BuildError> {
    let mut out = String::with_capacity(512);
    writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html xmlns=\"http://www.w3.org/1999/xhtml\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<title>Cover</title>")?;
    writeln!(out, "<style type=\"text/css\">img {{ max-width: 100%; }}</style>")?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(
        out,
        "<p class=\"cover\"><img src=\"{}\" alt=\"cover\"/></p>",
        escape(image_path)
    )?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}
