//! Merge a folder of HTML files into one document, in file-name order.
//!
//! The first file contributes everything through its `<body>` line; every
//! file contributes the lines between its `<body>` and `</body>`; the result
//! is closed with fresh `</body></html>` tags. Line-oriented on purpose so
//! authored formatting passes through untouched.

use std::fs;
use std::path::Path;

use crate::error::MergeError;

pub fn merge_folder(dir: &Path) -> Result<Vec<u8>, MergeError> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".html") || lower.ends_with(".htm") {
            names.push(name);
        }
    }
    names.sort();

    let mut out = String::new();
    for (index, name) in names.iter().enumerate() {
        let text = fs::read_to_string(dir.join(name))?;
        let lines: Vec<&str> = text.lines().collect();

        let body_open = lines
            .iter()
            .position(|l| l.contains("<body"))
            .ok_or_else(|| MergeError::Malformed {
                path: name.clone(),
                what: "<body>",
            })?;
        let body_close = lines
            .iter()
            .position(|l| l.contains("</body>"))
            .filter(|&close| close > body_open)
            .ok_or_else(|| MergeError::Malformed {
                path: name.clone(),
                what: "</body>",
            })?;

        if index == 0 {
            for line in &lines[..=body_open] {
                out.push_str(line);
                out.push('\n');
            }
        }
        for line in &lines[body_open + 1..body_close] {
            out.push_str(line);
            out.push('\n');
        }
        tracing::debug!(file = %name, "merged");
    }

    out.push_str("</body>\n</html>\n");
    Ok(out.into_bytes())
}
