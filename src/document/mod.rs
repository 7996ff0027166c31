//! Document positions, ranges, and hover payloads.
//!
//! These types are wire-compatible with the LSP shapes of the same name but
//! carry no protocol dependency, so the crate can sit underneath any
//! transport (native server, WASM host, tests).

use serde::{Deserialize, Serialize};

/// Zero-based line/character position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// In-memory snapshot of an open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    uri: String,
    text: String,
}

impl TextDocument {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the given zero-based line without its trailing newline.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.text
            .split('\n')
            .nth(line as usize)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }

    /// Converts a position into a byte offset, clamping the character column
    /// to the end of its line. Returns `None` when the line does not exist.
    pub fn offset_at(&self, pos: Position) -> Option<usize> {
        let mut offset = 0usize;
        for (idx, line) in self.text.split('\n').enumerate() {
            if idx == pos.line as usize {
                let column = line
                    .char_indices()
                    .nth(pos.character as usize)
                    .map(|(byte, _)| byte)
                    .unwrap_or(line.len());
                return Some(offset + column);
            }
            offset += line.len() + 1;
        }
        None
    }
}

/// Format of a [`MarkupContent`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    PlainText,
    Markdown,
}

/// Rich-text payload carried by a hover response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

impl MarkupContent {
    pub fn markdown(value: impl Into<String>) -> Self {
        Self {
            kind: MarkupKind::Markdown,
            value: value.into(),
        }
    }
}

/// Hover response: content plus the document range it anchors to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub contents: MarkupContent,
    pub range: Range,
}

/// Math source located at a request position, with the range it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    pub math: String,
    pub range: Range,
}

/// Locates the math span enclosing a position, if any.
///
/// Detection lives with the host's markdown analysis; this crate only
/// consumes the result. Returning `None` means "no math here" and suppresses
/// the hover entirely.
pub trait MathRangeDetector {
    fn math_range(&self, doc: &TextDocument, pos: Position) -> Option<MathSpan>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_strips_carriage_returns() {
        let doc = TextDocument::new("file:///t.md", "alpha\r\nbeta\r\ngamma");
        assert_eq!(doc.line(0), Some("alpha"));
        assert_eq!(doc.line(1), Some("beta"));
        assert_eq!(doc.line(3), None);
    }

    #[test]
    fn offset_clamps_to_line_end() {
        let doc = TextDocument::new("file:///t.md", "ab\ncd");
        assert_eq!(doc.offset_at(Position::new(0, 1)), Some(1));
        assert_eq!(doc.offset_at(Position::new(0, 99)), Some(2));
        assert_eq!(doc.offset_at(Position::new(1, 0)), Some(3));
        assert_eq!(doc.offset_at(Position::new(5, 0)), None);
    }

    #[test]
    fn markup_kind_serialises_lowercase() {
        let content = MarkupContent::markdown("hi");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "markdown");
        assert_eq!(json["value"], "hi");
    }
}
