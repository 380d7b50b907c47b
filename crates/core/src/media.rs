//! Extension → MIME type mapping for manifest entries.

/// Resolve the manifest media type for a package path. Matching is on the
/// lowercased extension; anything unknown maps to `application/octet-stream`.
pub fn media_type(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "html" | "htm" | "xhtml" => "application/xhtml+xml",
        "css" => "text/css",
        "txt" => "text/plain",
        "xml" => "text/xml",
        "ncx" => "application/x-dtbncx+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "otf" => "application/x-font-opentype",
        "ttf" => "application/x-font-ttf",
        _ => "application/octet-stream",
    }
}
