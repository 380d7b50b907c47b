//! Chapter splitter: walks the body of the main document once, moving nodes
//! into per-chapter fragment documents and collecting table-of-contents
//! references along the way.
//!
//! A new fragment starts at a chapter boundary that is at or above the
//! previous boundary's level; a strictly deeper boundary is a sub-heading of
//! the still-open fragment. Non-boundary content between boundaries resets
//! that tracking, so the next boundary always opens a fresh fragment.

use std::collections::HashSet;

use crate::book::{Book, ChapterRef};
use crate::error::SplitError;
use crate::markup::{MarkupTree, NodeData, NodeId};

/// Marker class recognized on explicit chapter-boundary elements.
const MARKER_CLASS: &str = "chapter";

/// Class flagging an image to be promoted to a standalone full-page fragment.
const FULLSCREEN_CLASS: &str = "fullscreen";

/// Level tracker value meaning "no boundary seen since the last content
/// node"; compares greater than any real heading level.
const NO_BOUNDARY: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Boundaries are `<h1>`..`<h6>` elements.
    ByHeading,
    /// Boundaries are elements carrying the marker class; headings not
    /// claimed by a marker still open boundaries of their own.
    ByMarker,
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Deepest heading level recorded in the TOC, 1..=6.
    pub toc_depth: u8,
    /// Deepest heading level that starts a new fragment; 0 disables
    /// splitting by level (marker level 0 still forces one).
    pub split_at_level: u8,
    pub trigger: TriggerMode,
    pub fullscreen_extension: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            toc_depth: 2,
            split_at_level: 1,
            trigger: TriggerMode::ByHeading,
            fullscreen_extension: false,
        }
    }
}

struct Boundary {
    level: u8,
    title: String,
    /// Node the anchor id is written to: the boundary element itself, or
    /// the marker when the title was borrowed from a following heading.
    anchor_node: NodeId,
}

/// Split the parsed main document into chapter fragments appended to `book`.
/// Destructive: body children are moved out of `tree`'s original body.
pub fn split_into_book(
    tree: &mut MarkupTree,
    opts: &SplitOptions,
    book: &mut Book,
) -> Result<(), SplitError> {
    let html = tree.find_child(tree.root(), "html");
    if html.is_none() {
        return Err(SplitError::MissingElement { tag: "html" });
    }
    let body = tree.find_child(html, "body");
    if body.is_none() {
        return Err(SplitError::MissingElement { tag: "body" });
    }

    let prefix = document_prefix(tree, html)?;
    let body_attrs = tree.element_attrs(body);

    let mut fragment_body = tree.create_element("body", body_attrs.clone());
    let mut pending: Vec<ChapterRef> = Vec::new();
    let mut last_boundary_level = NO_BOUNDARY;
    let mut claimed_donors: HashSet<NodeId> = HashSet::new();
    let mut next_anchor: u32 = 0;

    let mut node = tree.first_child(body);
    while node.is_some() {
        let next = tree.next_sibling(node);

        if tree.is_blank(node) {
            node = next;
            continue;
        }

        if opts.fullscreen_extension && is_fullscreen_image(tree, node) {
            flush(tree, book, &prefix, &mut fragment_body, &body_attrs, &mut pending)?;
            let src = tree.attr(node, "src").unwrap_or_default().to_string();
            let alt = tree.attr(node, "alt").unwrap_or_default().to_string();
            book.add_fullscreen_page(
                image_page(&src, &alt).into_bytes(),
                std::mem::take(&mut pending),
            );
            last_boundary_level = NO_BOUNDARY;
            tree.detach(node);
            node = next;
            continue;
        }

        match detect_boundary(tree, node, opts.trigger, &mut claimed_donors) {
            None => {
                last_boundary_level = NO_BOUNDARY;
            }
            Some(boundary) => {
                let anchor = ensure_anchor(tree, boundary.anchor_node, &mut next_anchor);
                if boundary.level <= opts.split_at_level
                    && boundary.level <= last_boundary_level
                {
                    flush(tree, book, &prefix, &mut fragment_body, &body_attrs, &mut pending)?;
                }
                let title = boundary.title.trim();
                if (1..=opts.toc_depth).contains(&boundary.level) && !title.is_empty() {
                    pending.push(ChapterRef {
                        level: boundary.level,
                        title: title.to_string(),
                        anchor: format!("#{}", anchor),
                    });
                }
                last_boundary_level = boundary.level;
            }
        }

        tree.detach(node);
        tree.append(fragment_body, node);
        node = next;
    }

    flush(tree, book, &prefix, &mut fragment_body, &body_attrs, &mut pending)?;
    Ok(())
}

/// Serialize the current fragment body into a chapter file if it has any
/// content, then start a fresh one. Pending chapter refs move to the flushed
/// fragment.
fn flush(
    tree: &mut MarkupTree,
    book: &mut Book,
    prefix: &str,
    fragment_body: &mut NodeId,
    body_attrs: &[(String, String)],
    pending: &mut Vec<ChapterRef>,
) -> Result<(), SplitError> {
    if !tree.has_children(*fragment_body) {
        return Ok(());
    }
    let mut out = String::with_capacity(prefix.len() + 1024);
    out.push_str(prefix);
    tree.serialize(*fragment_body, &mut out)?;
    out.push_str("\n</html>\n");
    book.add_chapter(out.into_bytes(), std::mem::take(pending));
    *fragment_body = tree.create_element("body", body_attrs.to_vec());
    Ok(())
}

/// Everything of the source document that precedes the body: doctype, the
/// opening `<html>` tag with its attributes, and the full head. Shared by
/// every fragment.
fn document_prefix(tree: &MarkupTree, html: NodeId) -> Result<String, SplitError> {
    let mut out = String::new();
    let mut child = tree.first_child(tree.root());
    while child.is_some() {
        if matches!(tree.data(child), Some(NodeData::Doctype(_))) {
            tree.serialize(child, &mut out)?;
            break;
        }
        child = tree.next_sibling(child);
    }
    tree.open_tag(html, &mut out)?;
    out.push('\n');
    let head = tree.find_child(html, "head");
    if head.is_some() {
        tree.serialize(head, &mut out)?;
        out.push('\n');
    }
    Ok(out)
}

fn detect_boundary(
    tree: &MarkupTree,
    node: NodeId,
    trigger: TriggerMode,
    claimed_donors: &mut HashSet<NodeId>,
) -> Option<Boundary> {
    match trigger {
        TriggerMode::ByHeading => tree.heading_level(node).map(|level| Boundary {
            level,
            title: tree.text_content(node),
            anchor_node: node,
        }),
        TriggerMode::ByMarker => {
            if tree.has_class(node, MARKER_CLASS) {
                return marker_boundary(tree, node, claimed_donors);
            }
            match tree.heading_level(node) {
                Some(_) if claimed_donors.contains(&node) => None,
                Some(level) => Some(Boundary {
                    level,
                    title: tree.text_content(node),
                    anchor_node: node,
                }),
                None => None,
            }
        }
    }
}

/// Resolve a marker element's level and title: explicit `data-level` /
/// `data-title` attributes win; otherwise the next heading among following
/// siblings donates both and is suppressed as a boundary of its own. A
/// marker with neither contributes nothing.
fn marker_boundary(
    tree: &MarkupTree,
    node: NodeId,
    claimed_donors: &mut HashSet<NodeId>,
) -> Option<Boundary> {
    if let Some(level) = tree.attr(node, "data-level").and_then(|v| v.parse::<u8>().ok()) {
        let title = tree.attr(node, "data-title").unwrap_or_default().to_string();
        return Some(Boundary {
            level: level.min(6),
            title,
            anchor_node: node,
        });
    }
    let mut sibling = tree.next_sibling(node);
    while sibling.is_some() {
        if tree.has_class(sibling, MARKER_CLASS) {
            break;
        }
        if let Some(level) = tree.heading_level(sibling) {
            if claimed_donors.insert(sibling) {
                return Some(Boundary {
                    level,
                    title: tree.text_content(sibling),
                    anchor_node: node,
                });
            }
        }
        sibling = tree.next_sibling(sibling);
    }
    None
}

fn ensure_anchor(tree: &mut MarkupTree, node: NodeId, next_anchor: &mut u32) -> String {
    if let Some(id) = tree.attr(node, "id") {
        if !id.is_empty() {
            return id.to_string();
        }
    }
    *next_anchor += 1;
    let id = format!("chapter-{}", next_anchor);
    tree.set_attr(node, "id", &id);
    id
}

fn is_fullscreen_image(tree: &MarkupTree, node: NodeId) -> bool {
    tree.is_element(node, "img") && tree.has_class(node, FULLSCREEN_CLASS)
}

fn image_page(src: &str, alt: &str) -> String {
    use quick_xml::escape::escape;
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head><title>{alt}</title></head>\n\
         <body><p class=\"fullscreen\"><img src=\"{src}\" alt=\"{alt}\"/></p></body>\n\
         </html>\n",
        src = escape(src),
        alt = escape(alt),
    )
}
