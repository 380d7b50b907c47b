//! Reader for the per-book `book.ini` file.
//!
//! Sectioned `key=value` text. Keys and section names are case-insensitive
//! and addressed as `/section/key`. A blank-keyed line (`=value`) continues
//! the value of the previous key: an empty continuation appends a newline,
//! ASCII-to-ASCII joins get a separating space, and CJK text joins without
//! one.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BookConfig {
    data: HashMap<String, String>,
}

impl BookConfig {
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut data: HashMap<String, String> = HashMap::new();
        let mut section = "/".to_string();
        let mut last_key = String::new();

        for line in text.lines() {
            let s = line.trim();
            if s.is_empty() || s.starts_with('#') {
                continue;
            }

            if s.starts_with('[') && s.ends_with(']') {
                section = format!("/{}", s[1..s.len() - 1].trim().to_lowercase());
                continue;
            }

            if let Some((k, v)) = s.split_once('=') {
                let k = k.trim().to_lowercase();
                if !k.is_empty() {
                    last_key = format!("{}/{}", section, k);
                    data.insert(last_key.clone(), v.trim().to_string());
                    continue;
                }
            }

            // Blank-keyed continuation of the previous value.
            if last_key.is_empty() {
                continue;
            }
            let value = data.entry(last_key.clone()).or_default();
            let fragment = s.split_once('=').map(|(_, v)| v.trim()).unwrap_or("");
            if fragment.is_empty() {
                value.push('\n');
            } else {
                let prev = value.bytes().last();
                let joins_ascii = matches!(prev, Some(c) if c.is_ascii() && c != b'-' && c != b'\n')
                    && fragment.bytes().next().is_some_and(|c| c.is_ascii());
                if !value.is_empty() && joins_ascii {
                    value.push(' ');
                }
                value.push_str(fragment);
            }
        }

        Self { data }
    }

    pub fn get_str<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.data
            .get(&path.to_lowercase())
            .map(String::as_str)
            .unwrap_or(default)
    }

    pub fn get_int(&self, path: &str, default: i32) -> i32 {
        self.data
            .get(&path.to_lowercase())
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        match self.data.get(&path.to_lowercase()).map(String::as_str) {
            Some(v) => match v.to_lowercase().as_str() {
                "1" | "t" | "true" | "yes" => true,
                "0" | "f" | "false" | "no" => false,
                _ => default,
            },
            None => default,
        }
    }
}

/// Clamp a numeric option to its valid range, substituting the default with
/// a warning on invalid input (never fatal).
pub fn clamp_option(value: i32, min: i32, max: i32, default: u8, key: &str) -> u8 {
    if value < min || value > max {
        tracing::warn!(key, value, default, "invalid option value, using default");
        default
    } else {
        value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sections_and_keys_are_case_insensitive() {
        let cfg = BookConfig::parse("[Book]\nName = My Title\nAUTHOR=Someone\n");
        assert_eq!(cfg.get_str("/book/name", ""), "My Title");
        assert_eq!(cfg.get_str("/BOOK/author", ""), "Someone");
        assert_eq!(cfg.get_str("/book/missing", "dflt"), "dflt");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let cfg = BookConfig::parse("# leading comment\n\n[book]\n# inner\nname=X\n");
        assert_eq!(cfg.get_str("/book/name", ""), "X");
    }

    #[test]
    fn bom_is_stripped() {
        let cfg = BookConfig::parse("\u{feff}[book]\nname=X\n");
        assert_eq!(cfg.get_str("/book/name", ""), "X");
    }

    #[test]
    fn continuation_lines_extend_the_previous_value() {
        let cfg = BookConfig::parse("[book]\ndescription=first\n=second\n");
        assert_eq!(cfg.get_str("/book/description", ""), "first second");
    }

    #[test]
    fn empty_continuation_inserts_newline() {
        let cfg = BookConfig::parse("[book]\ndescription=first\n=\n=second\n");
        assert_eq!(cfg.get_str("/book/description", ""), "first\nsecond");
    }

    #[test]
    fn cjk_continuation_joins_without_space() {
        let cfg = BookConfig::parse("[book]\ndescription=第一行\n=第二行\n");
        assert_eq!(cfg.get_str("/book/description", ""), "第一行第二行");
    }

    #[test]
    fn int_and_bool_accessors_fall_back() {
        let cfg = BookConfig::parse("[split]\natlevel=3\nbydiv=yes\nbad=maybe\n");
        assert_eq!(cfg.get_int("/split/atlevel", 1), 3);
        assert_eq!(cfg.get_int("/split/other", 1), 1);
        assert!(cfg.get_bool("/split/bydiv", false));
        assert!(!cfg.get_bool("/split/bad", false));
    }

    #[test]
    fn clamp_substitutes_default_outside_range() {
        assert_eq!(clamp_option(3, 1, 6, 2, "book/toc"), 3);
        assert_eq!(clamp_option(9, 1, 6, 2, "book/toc"), 2);
        assert_eq!(clamp_option(0, 1, 6, 2, "book/toc"), 2);
        assert_eq!(clamp_option(0, 0, 6, 1, "split/atlevel"), 0);
    }
}
