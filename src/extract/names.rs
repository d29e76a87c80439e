use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ID_SUFFIX_RE: Regex = Regex::new(r"\s*\((\d+)\)\s*$").unwrap();
}

/// Canonical join key across "Last, First" and "First Last" name forms:
/// lowercased, whitespace collapsed, comma-reordered. Only the first two
/// comma segments are used; anything beyond is dropped. Idempotent, and
/// never used as a display name.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }
    let reordered = match name.split_once(',') {
        Some((last, rest)) => {
            let first = rest.split(',').next().unwrap_or("").trim();
            format!("{} {}", first, last.trim())
        }
        None => name.to_string(),
    };
    collapse(&reordered.to_lowercase())
}

/// Fuzzy variant of [`normalize_name`] with punctuation stripped, used
/// to join the free-text affiliation field against the id-hint map.
pub fn match_key(name: &str) -> String {
    let normalized = normalize_name(name);
    let stripped: String = normalized
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    collapse(&stripped)
}

/// Numeric author id from a trailing "(digits)" group, if present.
pub fn extract_author_id(text: &str) -> Option<String> {
    ID_SUFFIX_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Display name with any trailing "(digits)" id group removed.
pub fn strip_id_suffix(text: &str) -> String {
    ID_SUFFIX_RE.replace(text, "").trim().to_string()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
