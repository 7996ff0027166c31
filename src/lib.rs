//! Hover previews for TeX math.
//!
//! Given a span of math markup and a cursor position, this crate locates the
//! enclosing math range (through a host-provided detector), typesets the
//! math into SVG, themes and scales the graphics, encodes them as an inline
//! `data:` image, and packages the result as Markdown hover content anchored
//! to the detected range. The enabled extension packages, rendering scale,
//! and light/dark theme are reconfigurable at runtime via [`config::update`]
//! and take effect for subsequent renders without restarting the host.
//!
//! ```
//! use texhover::{Position, Range, MathRangeDetector, MathSpan, TextDocument, math_hover};
//!
//! struct DollarSpans;
//!
//! impl MathRangeDetector for DollarSpans {
//!     fn math_range(&self, doc: &TextDocument, pos: Position) -> Option<MathSpan> {
//!         let line = doc.line(pos.line)?;
//!         let open = line.find('$')?;
//!         let close = open + 1 + line[open + 1..].find('$')?;
//!         let cursor = pos.character as usize;
//!         (open < cursor && cursor <= close).then(|| MathSpan {
//!             math: line[open + 1..close].to_string(),
//!             range: Range::new(
//!                 Position::new(pos.line, open as u32),
//!                 Position::new(pos.line, close as u32 + 1),
//!             ),
//!         })
//!     }
//! }
//!
//! let doc = TextDocument::new("file:///demo.md", "Pythagoras: $x^2 + y^2 = z^2$");
//! let hover = math_hover(&DollarSpans, &doc, Position::new(0, 15)).unwrap();
//! assert!(hover.contents.value.starts_with("![equation](data:image/svg+xml;base64,"));
//! ```

pub mod config;
pub mod document;
pub mod hover;
pub mod typeset;
mod util;

pub use config::{RenderOptions, Settings, Theme};
pub use document::{
    Hover, MarkupContent, MarkupKind, MathRangeDetector, MathSpan, Position, Range, TextDocument,
};
pub use hover::{math_hover, render_math};
pub use typeset::{ConvertOptions, Engine, ExtensionSet, Package, Svg, TypesetError};
