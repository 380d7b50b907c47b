//! html2epub-core converts a folder (or zip) of authored HTML and assets
//! into an EPUB 2 or 3 package.
//!
//! The pipeline: [`folder::InputFolder`] supplies the files, [`split`] walks
//! the main document into chapter fragments, [`builder`] renders the
//! structural XML, and [`pack`] serializes the archive. [`job`] wires one
//! conversion end to end; [`batch`] runs many independently.

pub mod batch;
pub mod book;
pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod folder;
pub mod job;
pub mod markup;
pub mod media;
pub mod merge;
pub mod pack;
pub mod split;

pub mod prelude {
    pub use crate::book::{Book, BookFile, ChapterRef, EpubVersion, FileAttrs};
    pub use crate::error::MakeError;
    pub use crate::folder::InputFolder;
    pub use crate::job::{make_book, make_file, MakeResult};
    pub use crate::split::{SplitOptions, TriggerMode};
}
