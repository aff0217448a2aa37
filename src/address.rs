// File: ./src/address.rs
// Extracts reminder recipients from a `NOTIFY:` block inside a description.
//
// The block looks like this, anywhere in the text:
//
//     NOTIFY:
//     Ann Example <ann@example.com>
//     bob@example.com
//     -
//
// A missing or unterminated block yields no recipients, never an error.
use lettre::Address;
use lettre::message::{Mailbox, Mailboxes};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Recipients in description order, duplicates kept.
pub type AddressList = Vec<String>;

static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\S\r\n]*(?i:notify):[^\S\r\n]*$").expect("valid regex"));

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\r\n]\s*").expect("valid regex"));

/// A located address block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyBlock<'a> {
    /// Byte range from the marker line up to, not including, the terminator line.
    pub span: Range<usize>,
    /// Lines between the marker and the terminator.
    pub body: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    content_end: usize,
    end: usize,
}

/// Splits on CR, LF and CRLF, keeping byte offsets.
fn lines(text: &str) -> Vec<Line> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                let end = if bytes.get(i + 1) == Some(&b'\n') { i + 2 } else { i + 1 };
                out.push(Line {
                    start,
                    content_end: i,
                    end,
                });
                start = end;
                i = end;
            }
            b'\n' => {
                out.push(Line {
                    start,
                    content_end: i,
                    end: i + 1,
                });
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        out.push(Line {
            start,
            content_end: bytes.len(),
            end: bytes.len(),
        });
    }
    out
}

/// Finds the first `NOTIFY:` marker line and the `-` line that closes it.
///
/// The marker must sit alone on its line (surrounding blanks allowed) and be
/// followed by a line break. Returns `None` when there is no marker or the
/// block is never closed.
pub fn locate_block(text: &str) -> Option<NotifyBlock<'_>> {
    let lines = lines(text);
    let marker_pos = lines.iter().position(|l| {
        l.end > l.content_end && MARKER_LINE.is_match(&text[l.start..l.content_end])
    })?;

    let marker = lines[marker_pos];
    let terminator = lines[marker_pos + 1..]
        .iter()
        .find(|l| text[l.start..].starts_with('-'))?;

    Some(NotifyBlock {
        span: marker.start..terminator.start,
        body: &text[marker.end..terminator.start],
    })
}

/// Reads one address per line of a block body.
///
/// Lines that do not yield an address are skipped; the rest are re-formatted
/// as `Name <addr>` or `addr`.
pub fn parse_addresses(body: &str) -> AddressList {
    let body = body.trim();
    if body.is_empty() {
        return Vec::new();
    }
    LINE_BREAK
        .split(body)
        .filter_map(parse_mailbox)
        .map(|mailbox| mailbox.to_string())
        .collect()
}

/// Recipients named in `description`, or an empty list when it has no block.
pub fn extract_addresses(description: &str) -> AddressList {
    locate_block(description)
        .map(|block| parse_addresses(block.body))
        .unwrap_or_default()
}

/// The description with its address block cut out. Text without a complete
/// block comes back unchanged.
pub fn strip_block(description: &str) -> String {
    match locate_block(description) {
        Some(block) => {
            let mut out = String::with_capacity(description.len());
            out.push_str(&description[..block.span.start]);
            out.push_str(&description[block.span.end..]);
            out
        }
        None => description.to_string(),
    }
}

/// The first mailbox a token names.
///
/// Accepts `Name <addr>`, `"Quoted, Name" <addr>`, `addr (Name)` and a bare
/// `addr`. A token listing several addresses yields the first one that parses.
pub fn parse_mailbox(token: &str) -> Option<Mailbox> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Some(mailbox) = parse_commented(token) {
        return Some(mailbox);
    }
    if let Ok(mailbox) = token.parse::<Mailbox>() {
        return Some(mailbox);
    }
    if let Some(first) = token
        .parse::<Mailboxes>()
        .ok()
        .and_then(|list| list.into_iter().next())
    {
        return Some(first);
    }
    token
        .split([',', ';'])
        .find_map(|piece| piece.trim().parse::<Mailbox>().ok())
}

/// `addr (Name)`: the trailing comment becomes the display name.
fn parse_commented(token: &str) -> Option<Mailbox> {
    let inner = token.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let addr: Address = inner[..open].trim().parse().ok()?;
    let name = inner[open + 1..].trim();
    Some(Mailbox::new(
        (!name.is_empty()).then(|| name.to_string()),
        addr,
    ))
}
