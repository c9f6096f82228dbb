//! Resolving simulator positions back to statement text.
//!
//! Positions index into the document exactly as it was transmitted, so the
//! text passed here must be the stored raw document, never a re-serialization.

use log::debug;
use serde_json::Value;

use crate::types::Position;

/// Extract the text between two 1-based positions of `document`.
///
/// The end column is inclusive and clamped to the end of its line. Returns an
/// empty string when either position is missing or points outside the
/// document. The result is trimmed of surrounding whitespace and of a single
/// leading and trailing comma, since reported ranges do not always start or end
/// on the statement's braces.
#[must_use]
pub fn extract_statement_text(
    document: &str,
    start: Option<Position>,
    end: Option<Position>,
) -> String {
    let (Some(start), Some(end)) = (start, end) else {
        return String::new();
    };
    match slice_range(document, start, end) {
        Some(text) => normalize_fragment(&text).to_string(),
        None => {
            debug!("Position range {start:?}..{end:?} is outside the transmitted document");
            String::new()
        }
    }
}

/// Read the `Sid` of a statement fragment, or an empty string if the fragment
/// is not a JSON object with a string `Sid`.
#[must_use]
pub fn extract_sid(fragment: &str) -> String {
    serde_json::from_str::<Value>(fragment)
        .ok()
        .and_then(|value| value.get("Sid")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn slice_range(document: &str, start: Position, end: Position) -> Option<String> {
    if start.line == 0 || start.column == 0 || end.line < start.line {
        return None;
    }
    let lines: Vec<&str> = document.lines().collect();
    let first = usize::try_from(start.line - 1).ok()?;
    let last = usize::try_from(end.line - 1).ok()?;
    if last >= lines.len() {
        return None;
    }
    let from = usize::try_from(start.column - 1).ok()?;
    let to = usize::try_from(end.column).ok()?;

    if first == last {
        let line = lines[first];
        let begin = byte_offset(line, from)?;
        let finish = byte_offset(line, to).unwrap_or(line.len());
        return (begin <= finish).then(|| line[begin..finish].to_string());
    }

    let head = lines[first];
    let tail = lines[last];
    let mut text = String::from(&head[byte_offset(head, from)?..]);
    for line in &lines[first + 1..last] {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    text.push_str(&tail[..byte_offset(tail, to).unwrap_or(tail.len())]);
    Some(text)
}

/// Byte offset of the `chars`-th character, allowing one past the end.
fn byte_offset(line: &str, chars: usize) -> Option<usize> {
    line.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(line.len()))
        .nth(chars)
}

fn normalize_fragment(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix(',').map_or(text, str::trim_start);
    text.strip_suffix(',').map_or(text, str::trim_end)
}
