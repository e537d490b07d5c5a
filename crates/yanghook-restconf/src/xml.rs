//! Minimal single-pass XML element scanner.
//!
//! Notification payloads arrive as text and only ever need a handful of
//! named elements pulled out, so this module scans for them directly
//! instead of parsing a full document tree. Nesting of same-named
//! elements is handled by depth tracking; attributes are ignored except
//! to find the end of an open tag.

use yanghook_core::Result;
use yanghook_core::error::DecodeError;

/// Byte offsets of one element occurrence within the scanned input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// Offset of the `<`.
    pub start: usize,
    /// First byte of the element content.
    pub content_start: usize,
    /// One past the last byte of the element content.
    pub content_end: usize,
    /// One past the closing tag.
    pub end: usize,
}

/// Find the first occurrence of element `name`, at any depth.
///
/// Returns `Ok(None)` when no open tag is found. An open tag without a
/// matching close tag is an [`DecodeError::UnterminatedElement`] error.
pub fn find_span(input: &str, name: &str) -> Result<Option<Span>> {
    find_span_from(input, name, 0)
}

/// Content of the first occurrence of element `name`.
pub fn find_element<'a>(input: &'a str, name: &str) -> Result<Option<&'a str>> {
    Ok(find_span(input, name)?.map(|span| &input[span.content_start..span.content_end]))
}

/// Trimmed text content of the first occurrence of element `name`.
pub fn find_text<'a>(input: &'a str, name: &str) -> Result<Option<&'a str>> {
    Ok(find_element(input, name)?.map(str::trim))
}

/// Content of every occurrence of element `name`, in document order.
///
/// Occurrences nested inside each other are not descended into; the scan
/// resumes after each complete element.
pub fn find_elements<'a>(input: &'a str, name: &str) -> Result<Vec<&'a str>> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(span) = find_span_from(input, name, from)? {
        out.push(&input[span.content_start..span.content_end]);
        from = span.end;
    }
    Ok(out)
}

/// Content of every direct child element named `name`, in document order.
///
/// Unlike [`find_elements`], occurrences nested inside other elements are
/// not reported; only children at the top level of `input` count.
pub fn find_children<'a>(input: &'a str, name: &str) -> Result<Vec<&'a str>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut cursor = 0;

    while let Some(rel) = input[cursor..].find('<') {
        let at = cursor + rel;
        let rest = &input[at..];

        if rest.starts_with("</") {
            depth = depth.saturating_sub(1);
            cursor = match rest.find('>') {
                Some(end) => at + end + 1,
                None => break,
            };
            continue;
        }

        let tag_end = match rest.find('>') {
            Some(end) => at + end,
            // Truncated open tag at the end of the buffer
            None => break,
        };
        let self_closing = input.as_bytes()[tag_end - 1] == b'/';

        if depth == 0 && tag_matches(&input[at..tag_end], name) {
            let Some(span) = find_span_from(input, name, at)? else {
                break;
            };
            out.push(&input[span.content_start..span.content_end]);
            cursor = span.end;
            continue;
        }

        if !self_closing {
            depth += 1;
        }
        cursor = tag_end + 1;
    }
    Ok(out)
}

/// Does this open tag (without its closing `>`) carry exactly `name`?
fn tag_matches(tag: &str, name: &str) -> bool {
    let rest = &tag[1..];
    rest.strip_prefix(name)
        .is_some_and(|after| after.is_empty() || after.starts_with([' ', '\t', '\r', '\n', '/']))
}

fn find_span_from(input: &str, name: &str, from: usize) -> Result<Option<Span>> {
    let open = format!("<{}", name);
    let close = format!("</{}>", name);

    let Some(start) = find_open(input, &open, from) else {
        return Ok(None);
    };

    let tag_end = match input[start..].find('>') {
        Some(rel) => start + rel,
        None => return Err(unterminated(name)),
    };
    if input.as_bytes()[tag_end - 1] == b'/' {
        // Self-closing: empty content
        let end = tag_end + 1;
        return Ok(Some(Span {
            start,
            content_start: end,
            content_end: end,
            end,
        }));
    }

    let content_start = tag_end + 1;
    let mut depth = 1usize;
    let mut cursor = content_start;
    loop {
        let next_open = find_open(input, &open, cursor);
        let next_close = input[cursor..].find(&close).map(|rel| cursor + rel);
        match (next_open, next_close) {
            (_, None) => return Err(unterminated(name)),
            (Some(o), Some(c)) if o < c => {
                // Nested element with the same name
                let tag_end = match input[o..].find('>') {
                    Some(rel) => o + rel,
                    None => return Err(unterminated(name)),
                };
                if input.as_bytes()[tag_end - 1] != b'/' {
                    depth += 1;
                }
                cursor = tag_end + 1;
            }
            (_, Some(c)) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(Span {
                        start,
                        content_start,
                        content_end: c,
                        end: c + close.len(),
                    }));
                }
                cursor = c + close.len();
            }
        }
    }
}

/// Find an open tag for `open` (`"<name"`) whose name ends at a tag
/// boundary, so `<name` does not match `<namespace`.
fn find_open(input: &str, open: &str, mut from: usize) -> Option<usize> {
    while let Some(rel) = input[from..].find(open) {
        let at = from + rel;
        let after = at + open.len();
        match input.as_bytes().get(after) {
            Some(b) if b" \t\r\n>/".contains(b) => return Some(at),
            // Tag truncated at the end of the buffer
            None => return None,
            _ => from = at + 1,
        }
    }
    None
}

fn unterminated(name: &str) -> yanghook_core::Error {
    DecodeError::UnterminatedElement {
        name: name.to_string(),
    }
    .into()
}
