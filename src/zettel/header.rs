//! Textual metadata header
//!
//! A header is a sequence of `key: value` lines, optionally enclosed in `---` fences.
//! Without fences it ends at the first blank line, or at the first line that is not a
//! metadata line (that line already belongs to the content). Lines starting with `%` are
//! comments, indented lines continue the previous value, and a repeated key appends its
//! value separated by a single space.

use crate::zettel::id::Zid;
use crate::zettel::meta::{Meta, MetaBuilder};
use std::str::Utf8Error;

const FENCE: &str = "---";

/// Parse a text consisting only of metadata, e.g. a `.meta` file.
pub fn parse_meta(zid: Zid, text: &str) -> Meta {
    parse_header(zid, text).0
}

/// Parse the header at the start of `text`, returning the metadata and the remaining content.
pub fn parse_header(zid: Zid, text: &str) -> (Meta, &str) {
    let (meta, rest, _) = parse_header_text(zid, text);
    (meta, rest)
}

/// Parse the header at the start of raw file data, returning the metadata and the content
/// bytes. Only the header has to be UTF-8.
pub fn parse_header_bytes(zid: Zid, data: &[u8]) -> Result<(Meta, &[u8]), Utf8Error> {
    let (text, invalid) = match std::str::from_utf8(data) {
        Ok(text) => (text, None),
        Err(err) => (std::str::from_utf8(&data[..err.valid_up_to()])?, Some(err)),
    };
    let (meta, rest, terminated) = parse_header_text(zid, text);
    let consumed = text.len() - rest.len();
    if let Some(err) = invalid {
        // A line starting with a non-UTF-8 byte is never a metadata line.
        let content_line = consumed == 0 || text[..consumed].ends_with('\n');
        if !terminated && (meta.yaml_sep() || !content_line) {
            return Err(err);
        }
    }
    Ok((meta, &data[consumed..]))
}

/// Header parser. The flag tells whether the header ended before the text ran out.
fn parse_header_text(zid: Zid, text: &str) -> (Meta, &str, bool) {
    let mut builder = MetaBuilder::new(zid);
    let mut rest = text;

    let fenced = match split_line(rest) {
        Some((line, after)) if line.trim_end() == FENCE => {
            rest = after;
            true
        }
        _ => false,
    };
    builder.yaml_sep(fenced);

    let mut terminated = false;
    let mut last_key: Option<String> = None;
    while let Some((line, after)) = split_line(rest) {
        let trimmed = line.trim_end();
        if fenced && trimmed == FENCE {
            rest = after;
            terminated = true;
            break;
        }
        if trimmed.is_empty() {
            if fenced {
                rest = after;
                continue;
            }
            rest = after;
            terminated = true;
            break;
        }
        if trimmed.starts_with('%') {
            rest = after;
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(key) = &last_key {
                builder.append(key, trimmed.trim_start());
                rest = after;
                continue;
            }
        }
        match parse_line(trimmed) {
            Some((key, value)) => {
                builder.append(&key, value);
                last_key = Some(key);
                rest = after;
            }
            None if fenced => {
                rest = after;
            }
            None => {
                terminated = true;
                break;
            }
        }
    }
    (builder.build(), rest, terminated)
}

/// Split a key line into lowercased key and value.
fn parse_line(line: &str) -> Option<(String, &str)> {
    let key_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(line.len());
    if key_end == 0 {
        return None;
    }
    let key = line[..key_end].to_ascii_lowercase();
    let after_key = line[key_end..].trim_start_matches([' ', '\t']);
    let value = after_key.strip_prefix(':')?;
    if !crate::zettel::keys::key_is_valid(&key) {
        return None;
    }
    Some((key, value.trim()))
}

fn split_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    match text.find('\n') {
        Some(idx) => Some((text[..idx].trim_end_matches('\r'), &text[idx + 1..])),
        None => Some((text, "")),
    }
}

/// Metadata as `key: value` lines without fences. Computed keys are omitted.
pub fn write_meta(meta: &Meta) -> String {
    let mut out = String::new();
    for (key, value) in meta.stored_pairs() {
        out.push_str(key);
        out.push(':');
        if !value.is_empty() {
            out.push(' ');
            out.push_str(value);
        }
        out.push('\n');
    }
    out
}

/// Metadata as a header that can be followed directly by content.
pub fn write_header(meta: &Meta) -> String {
    let body = write_meta(meta);
    if meta.yaml_sep() {
        format!("{FENCE}\n{body}{FENCE}\n")
    } else {
        format!("{body}\n")
    }
}
