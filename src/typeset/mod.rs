//! The typesetting engine: TeX-subset math in, scalable vector graphics out.
//!
//! Engines are cheap-ish to build but not free (command tables are compiled
//! from the extension set), so the hover pipeline keeps one alive per
//! process and replaces it wholesale on reconfiguration — see
//! [`crate::hover`].

mod fonts;
pub(crate) mod layout;
mod lexer;
pub(crate) mod packages;
pub(crate) mod parser;
mod svg;

pub use packages::{BASELINE, ExtensionSet, Package};
pub use svg::Svg;

use thiserror::Error;

use parser::CommandTable;

/// Failure reported by the typesetting engine. The message is exactly what
/// ends up in user-visible error content, so it stays human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypesetError {
    message: String,
}

impl TypesetError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Fixed conversion parameters: display mode, the em/ex metric basis in
/// pixels, and the container width used solely for line breaking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    pub display: bool,
    pub em: f64,
    pub ex: f64,
    pub container_width: f64,
}

impl ConvertOptions {
    /// The parameters every hover conversion runs with: block display on an
    /// 18px em / 9px ex basis, wrapping at 80 characters.
    pub fn hover() -> Self {
        Self {
            display: true,
            em: 18.0,
            ex: 9.0,
            container_width: 80.0 * 18.0,
        }
    }
}

/// A typesetting engine bound to a fixed extension set.
pub struct Engine {
    table: CommandTable,
}

impl Engine {
    /// Builds an engine whose parsing is restricted to the given set. Pure
    /// factory: deterministic for the same set, touches no shared state.
    pub fn build(extensions: &ExtensionSet) -> Engine {
        Engine {
            table: CommandTable::compile(extensions),
        }
    }

    pub fn extensions(&self) -> &ExtensionSet {
        self.table.extensions()
    }

    /// Typesets math source into SVG. The error carries the engine-reported
    /// message verbatim.
    pub fn convert(&self, math: &str, opts: &ConvertOptions) -> Result<Svg, TypesetError> {
        let node = parser::parse(math, &self.table)?;
        let laid_out = layout::layout_root(&node, opts);
        Ok(svg::emit(&laid_out, opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sets_build_identical_engines() {
        let set = ExtensionSet::from_config(&["mathtools".to_string()]);
        let a = Engine::build(&set);
        let b = Engine::build(&set);
        let opts = ConvertOptions::hover();
        let left = a.convert("x \\coloneqq \\frac{1}{2}", &opts).unwrap();
        let right = b.convert("x \\coloneqq \\frac{1}{2}", &opts).unwrap();
        assert_eq!(left.to_markup(), right.to_markup());
    }

    #[test]
    fn engine_reports_parse_failures() {
        let engine = Engine::build(&ExtensionSet::baseline());
        let err = engine
            .convert("\\frac{1}{", &ConvertOptions::hover())
            .unwrap_err();
        assert_eq!(err.message(), "Missing close brace");
    }

    #[test]
    fn engines_expose_their_set() {
        let set = ExtensionSet::from_config(&["physics".to_string()]);
        let engine = Engine::build(&set);
        assert!(engine.extensions().contains(Package::Physics));
        assert!(engine.extensions().contains(Package::Base));
    }
}
