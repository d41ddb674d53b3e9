use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in a query component; everything but `A-Za-z0-9-_.!~*'()`
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const CRUNCHYROLL_BASE: &str = "https://www.crunchyroll.com";
const MAX_SLUG_TITLE_LEN: usize = 50;

/// Lowercased, hyphen-separated form of a title, keeping only `[a-z0-9-]`
pub fn crunchyroll_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;

    for c in title.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }

    let mut collapsed = String::with_capacity(slug.len());
    for c in slug.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.trim_matches('-').to_string()
}

/// Crunchyroll page for a title
///
/// Long titles, or titles with characters outside word characters, whitespace
/// and `-`, fall back to a search URL since their series slug is unpredictable.
pub fn crunchyroll_url(title: &str) -> String {
    let needs_search = title.chars().count() > MAX_SLUG_TITLE_LEN
        || title
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || c == '-'));

    if needs_search {
        let query = utf8_percent_encode(title, QUERY_COMPONENT);
        return format!("{}/search?q={}", CRUNCHYROLL_BASE, query);
    }

    format!("{}/series/{}", CRUNCHYROLL_BASE, crunchyroll_slug(title))
}
