//! Link extraction from index pages.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::Contents;

/// Table header cells hold the column sort links of Apache-style listings.
static HEADER_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<th\b.*?</th\s*>").unwrap());

static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#).unwrap()
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Collects every link of a listing page that is not in a table header.
///
/// A link labelled "Parent Directory" is reported as `../` whatever its href.
pub fn parse_listing(html: &str) -> Contents {
    let body = HEADER_CELL.replace_all(html, "");
    let mut contents = Contents::default();

    for caps in ANCHOR.captures_iter(&body) {
        let href = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let text = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
        let label = decode_entities(TAG.replace_all(text, "").trim());

        let link = if label.eq_ignore_ascii_case("Parent Directory") {
            "../".to_string()
        } else {
            decode_entities(href)
        };
        contents.push_link(link);
    }

    contents
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
