//! Entity handling for storage-format markup.
//!
//! Confluence emits a few HTML named entities that an XML parser does not
//! know. Those are rewritten to numeric character references before parsing;
//! every other entity passes through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Regex pattern for matching named entities.
static NAMED_ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Regex pattern for matching any entity or character reference.
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);")
        .expect("invalid reference regex")
});

/// Rewrite named entities unknown to the XML parser into numeric references.
///
/// Standard XML entities (amp, lt, gt, quot, apos) and anything not in the
/// replacement table are left unchanged.
pub fn replace_entities(markup: &str) -> Cow<'_, str> {
    if !markup.contains('&') {
        return Cow::Borrowed(markup);
    }
    NAMED_ENTITY_PATTERN.replace_all(markup, |caps: &regex::Captures| {
        entity_to_numeric(&caps[1]).map_or_else(|| caps[0].to_owned(), str::to_owned)
    })
}

/// Map a named entity to its numeric replacement.
fn entity_to_numeric(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("&#160;"),
        _ => None,
    }
}

/// Decode entity and character references in escaped text.
///
/// Unknown named entities are preserved as-is.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    REFERENCE_PATTERN.replace_all(raw, |caps: &regex::Captures| decode_entity(&caps[1]))
}

/// Decode references in HTML text, including HTML named entities.
///
/// Names outside the XML set and [`html_entity`] are preserved as-is.
pub fn decode_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    REFERENCE_PATTERN.replace_all(raw, |caps: &regex::Captures| {
        html_entity(&caps[1]).map_or_else(|| decode_entity(&caps[1]), str::to_owned)
    })
}

/// Map an HTML named entity to its character.
fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "plusmn" => "\u{00b1}",
        "times" => "\u{00d7}",
        "deg" => "\u{00b0}",
        "micro" => "\u{00b5}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "sect" => "\u{00a7}",
        "para" => "\u{00b6}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "shy" => "\u{00ad}",
        _ => return None,
    })
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        "nbsp" => "\u{00a0}".to_owned(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}

/// Escape text for XML content.
pub fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
pub fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

/// Escape XML special characters.
fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
