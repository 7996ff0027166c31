//! Hover content building: the pipeline from math source to hover payload.
//!
//! The stages mirror the data flow: convert (active engine) → style (theme
//! injection) → encode (inline image) → wrap as Markdown. Failures anywhere
//! below become displayable error content; nothing propagates past
//! [`render_math`]. A malformed fragment must never suppress the tooltip —
//! it explains itself in place instead.

pub(crate) mod adaptor;
pub mod encode;
pub mod style;

use tracing::debug;

use crate::config::{self, RenderOptions};
use crate::document::{Hover, MarkupContent, MathRangeDetector, Position, TextDocument};

/// Top-level entry point: detect the math span at `pos`, render it, anchor
/// the result. `None` only when there is no math at the position — in that
/// case the pipeline is never touched.
pub fn math_hover<D: MathRangeDetector>(
    detector: &D,
    doc: &TextDocument,
    pos: Position,
) -> Option<Hover> {
    let span = detector.math_range(doc, pos)?;
    Some(Hover {
        contents: render_math(&span.math),
        range: span.range,
    })
}

/// Renders math source into Markdown hover content. Always yields content:
/// render failures come back as a bolded `LaTeX Error` block carrying the
/// engine's message.
pub fn render_math(math: &str) -> MarkupContent {
    let options = config::render_options();
    match image_stage(math, &options) {
        Ok(url) => MarkupContent::markdown(format!("![equation]({url})")),
        Err(message) => {
            debug!(
                target: "texhover::hover",
                error = %message,
                "math hover degraded to error content"
            );
            latex_error_content(&message)
        }
    }
}

fn image_stage(math: &str, options: &RenderOptions) -> Result<String, String> {
    let svg = adaptor::convert(math).map_err(|err| err.message().to_string())?;
    let styled = style::apply_theme(svg.to_markup(), options);
    encode::svg_to_data_url(&styled).map_err(|err| err.to_string())
}

fn latex_error_content(message: &str) -> MarkupContent {
    let message = if message.trim().is_empty() {
        "Unknown error"
    } else {
        message
    };
    MarkupContent::markdown(format!("**LaTeX Error**:\n{message}"))
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::document::{MarkupKind, MathSpan, Range};

    struct FixedSpan(Option<MathSpan>);

    impl MathRangeDetector for FixedSpan {
        fn math_range(&self, _doc: &TextDocument, _pos: Position) -> Option<MathSpan> {
            self.0.clone()
        }
    }

    fn range() -> Range {
        Range::new(Position::new(0, 2), Position::new(0, 16))
    }

    #[test]
    #[serial]
    fn valid_math_renders_an_image_reference() {
        let content = render_math("x^2 + y^2 = z^2");
        assert_eq!(content.kind, MarkupKind::Markdown);
        assert!(content.value.starts_with("![equation](data:image/svg+xml;base64,"));
        assert!(content.value.ends_with(')'));
    }

    #[test]
    #[serial]
    fn invalid_math_renders_error_content() {
        let content = render_math("\\frac{1}{");
        assert!(content.value.starts_with("**LaTeX Error**:\n"));
        assert!(content.value.contains("Missing close brace"));
    }

    #[test]
    fn empty_failure_message_uses_the_fallback() {
        let content = latex_error_content("");
        assert_eq!(content.value, "**LaTeX Error**:\nUnknown error");
        let content = latex_error_content("  ");
        assert_eq!(content.value, "**LaTeX Error**:\nUnknown error");
    }

    #[test]
    #[serial]
    fn hover_anchors_to_the_detected_range() {
        let detector = FixedSpan(Some(MathSpan {
            math: "E = mc^2".into(),
            range: range(),
        }));
        let doc = TextDocument::new("file:///t.md", "a $E = mc^2$ b");
        let hover = math_hover(&detector, &doc, Position::new(0, 5)).unwrap();
        assert_eq!(hover.range, range());
        assert!(hover.contents.value.starts_with("![equation]("));
    }

    #[test]
    fn no_math_at_position_yields_no_hover() {
        let detector = FixedSpan(None);
        let doc = TextDocument::new("file:///t.md", "plain prose");
        assert!(math_hover(&detector, &doc, Position::new(0, 3)).is_none());
    }
}
