//! The EPUB's logical representation: metadata, ordered file list, and the
//! chapter references collected by the splitter.
//!
//! A `Book` is created per conversion job, populated once by the splitter and
//! the passthrough-file pass, consumed by the container builder, then
//! discarded.

use std::time::{SystemTime, UNIX_EPOCH};

pub const MIMETYPE: &str = "mimetype";
pub const CONTAINER_XML: &str = "META-INF/container.xml";
pub const CONTENT_OPF: &str = "content.opf";
pub const TOC_NCX: &str = "toc.ncx";
pub const NAV_XHTML: &str = "nav.xhtml";
pub const COVER_PAGE: &str = "cover.html";

/// Package-internal names the builder generates itself. A caller-supplied
/// asset with one of these names is dropped, never duplicated.
const INTERNAL_NAMES: &[&str] = &[
    MIMETYPE,
    "meta-inf/container.xml",
    CONTENT_OPF,
    TOC_NCX,
    NAV_XHTML,
    COVER_PAGE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpubVersion {
    V2,
    V3,
}

/// One table-of-contents entry attached to a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    /// Heading level, 1..=6.
    pub level: u8,
    pub title: String,
    /// Anchor fragment including the leading `#`.
    pub anchor: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileAttrs {
    /// Spine-included chapter fragment.
    pub content: bool,
    /// Generated full-page-image fragment (reader extension only).
    pub fullscreen_page: bool,
    /// Builder-generated structural file.
    pub internal: bool,
}

#[derive(Debug, Clone)]
pub struct BookFile {
    /// Forward-slash relative path, case-preserving. Unique within a book.
    pub path: String,
    pub data: Vec<u8>,
    pub attrs: FileAttrs,
    pub chapter_refs: Vec<ChapterRef>,
}

#[derive(Debug)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub description: String,
    pub language: String,
    /// Package path of the cover image, when one was found.
    pub cover_path: Option<String>,
    /// Emit the vendor fullscreen rendering property on cover and
    /// fullscreen-image spine items.
    pub fullscreen_extension: bool,
    pub epub_version: EpubVersion,
    /// Creation date, RFC 3339. Fixed at book creation so rebuilding the
    /// same book renders identical metadata.
    pub created: String,
    /// Insertion order is the spine/reading order.
    pub files: Vec<BookFile>,
    next_chapter: u32,
}

impl Book {
    pub fn new(epub_version: EpubVersion) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            author: String::new(),
            publisher: String::new(),
            description: String::new(),
            language: "en".to_string(),
            cover_path: None,
            fullscreen_extension: false,
            epub_version,
            created: rfc3339_now(),
            files: Vec::new(),
            next_chapter: 0,
        }
    }

    /// Set the package identifier, generating a best-effort unique one
    /// (hostname + unix timestamp) when the caller supplies none.
    pub fn set_id(&mut self, id: &str) {
        self.id = if id.is_empty() {
            let host = std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("COMPUTERNAME"))
                .unwrap_or_else(|_| "localhost".to_string());
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0);
            format!("{}-book-{:08x}", host, secs)
        } else {
            id.to_string()
        };
    }

    /// Append a passthrough asset. Internal names and duplicate paths are
    /// skipped with a warning.
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        let lower = path.to_ascii_lowercase();
        if INTERNAL_NAMES.contains(&lower.as_str()) {
            tracing::warn!(path, "skipping input file shadowing a generated name");
            return;
        }
        if self.files.iter().any(|f| f.path == path) {
            tracing::warn!(path, "skipping duplicate input path");
            return;
        }
        self.files.push(BookFile {
            path: path.to_string(),
            data,
            attrs: FileAttrs::default(),
            chapter_refs: Vec::new(),
        });
    }

    /// Append a chapter fragment under a generated path, in spine order.
    /// Returns the path.
    pub fn add_chapter(&mut self, data: Vec<u8>, chapter_refs: Vec<ChapterRef>) -> String {
        self.push_fragment(data, chapter_refs, false)
    }

    /// Append a generated full-page-image fragment.
    pub fn add_fullscreen_page(&mut self, data: Vec<u8>, chapter_refs: Vec<ChapterRef>) -> String {
        self.push_fragment(data, chapter_refs, true)
    }

    fn push_fragment(
        &mut self,
        data: Vec<u8>,
        chapter_refs: Vec<ChapterRef>,
        fullscreen_page: bool,
    ) -> String {
        self.next_chapter += 1;
        let path = format!("chapter_{:04}.html", self.next_chapter);
        self.files.push(BookFile {
            path: path.clone(),
            data,
            attrs: FileAttrs {
                content: true,
                fullscreen_page,
                internal: false,
            },
            chapter_refs,
        });
        path
    }

    /// Flattened (fragment path, chapter ref) pairs in spine order.
    pub fn toc_entries(&self) -> impl Iterator<Item = (&str, &ChapterRef)> {
        self.files
            .iter()
            .filter(|f| f.attrs.content)
            .flat_map(|f| f.chapter_refs.iter().map(move |r| (f.path.as_str(), r)))
    }

    pub fn file(&self, path: &str) -> Option<&BookFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

fn rfc3339_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format_rfc3339(secs)
}

/// Format a unix timestamp as `YYYY-MM-DDThh:mm:ssZ` (UTC, proleptic
/// Gregorian).
pub(crate) fn format_rfc3339(secs: u64) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (hour, min, sec) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    // Civil-from-days (Howard Hinnant's algorithm), epoch 1970-01-01.
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        y, m, d, hour, min, sec
    )
}
