//! SVG emission.
//!
//! Each conversion gets its own glyph cache: every distinct character is
//! defined once as a `<symbol>` inside `<defs>` and referenced by `<use>`.
//! Geometry inherits `currentColor`, which is what lets the post-processor
//! re-theme the image with a single injected CSS rule.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::ConvertOptions;
use super::layout::{Item, Layout, catalog};

/// A rendered expression: self-contained SVG markup plus its pixel extents.
#[derive(Debug, Clone, PartialEq)]
pub struct Svg {
    markup: String,
    width: f64,
    height: f64,
}

impl Svg {
    pub fn to_markup(&self) -> &str {
        &self.markup
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

pub(crate) fn emit(layout: &Layout, opts: &ConvertOptions) -> Svg {
    let width = layout.width.max(1.0);
    let height = (layout.height + layout.depth).max(1.0);
    let baseline = layout.height.max(0.0);

    let mut glyphs: Vec<char> = Vec::new();
    let mut ids: HashMap<char, usize> = HashMap::new();
    let mut body = String::new();

    for item in &layout.items {
        match item {
            Item::Glyph {
                ch,
                x,
                y,
                scale,
                fill,
            } => {
                let next_id = glyphs.len();
                let id = *ids.entry(*ch).or_insert_with(|| {
                    glyphs.push(*ch);
                    next_id
                });
                let _ = write!(body, "<use xlink:href=\"#eq-g{id}\"");
                if (*scale - 1.0).abs() < 1e-9 {
                    let _ = write!(body, " x=\"{}\" y=\"{}\"", fmt(*x), fmt(*y));
                } else {
                    let _ = write!(
                        body,
                        " transform=\"translate({} {}) scale({})\"",
                        fmt(*x),
                        fmt(*y),
                        fmt(*scale)
                    );
                }
                push_fill(&mut body, fill, "fill");
                body.push_str("/>");
            }
            Item::Rule {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let _ = write!(
                    body,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"",
                    fmt(*x),
                    fmt(*y),
                    fmt(*width),
                    fmt(*height)
                );
                push_fill(&mut body, fill, "fill");
                body.push_str("/>");
            }
            Item::Line {
                x1,
                y1,
                x2,
                y2,
                thickness,
                fill,
            } => {
                let _ = write!(
                    body,
                    "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke-width=\"{}\"",
                    fmt(*x1),
                    fmt(*y1),
                    fmt(*x2),
                    fmt(*y2),
                    fmt(*thickness)
                );
                push_fill(&mut body, fill, "stroke");
                body.push_str("/>");
            }
            Item::Frame {
                x,
                y,
                width,
                height,
                thickness,
                fill,
            } => {
                let _ = write!(
                    body,
                    "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\" stroke-width=\"{}\"",
                    fmt(*x),
                    fmt(*y),
                    fmt(*width),
                    fmt(*height),
                    fmt(*thickness)
                );
                push_fill(&mut body, fill, "stroke");
                body.push_str("/>");
            }
        }
    }

    let mut defs = String::new();
    for (id, ch) in glyphs.iter().enumerate() {
        let _ = write!(
            defs,
            "<symbol id=\"eq-g{id}\" overflow=\"visible\"><text font-family=\"{}\" font-size=\"{}px\" x=\"0\" y=\"0\">{}</text></symbol>",
            catalog().family,
            fmt(opts.em),
            escape_text(*ch)
        );
    }

    let markup = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{w}px\" height=\"{h}px\" viewBox=\"0 0 {w} {h}\" role=\"img\" focusable=\"false\" \
         style=\"vertical-align: -{d}px;\"><defs>{defs}</defs>\
         <g stroke=\"currentColor\" fill=\"currentColor\" stroke-width=\"0\" \
         transform=\"translate(0 {b})\">{body}</g></svg>",
        w = fmt(width),
        h = fmt(height),
        d = fmt(layout.depth.max(0.0)),
        b = fmt(baseline),
    );

    Svg {
        markup,
        width,
        height,
    }
}

fn push_fill(out: &mut String, fill: &Option<String>, attr: &str) {
    if let Some(color) = fill {
        let _ = write!(out, " {attr}=\"{color}\"");
    }
}

fn escape_text(ch: char) -> String {
    match ch {
        '<' => "&lt;".to_string(),
        '>' => "&gt;".to_string(),
        '&' => "&amp;".to_string(),
        c => c.to_string(),
    }
}

/// Deterministic fixed-point formatting: two decimals, trailing zeros
/// trimmed, negative zero normalised.
fn fmt(v: f64) -> String {
    let mut rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    let mut s = format!("{rounded:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeset::packages::ExtensionSet;
    use crate::typeset::parser::{CommandTable, parse};
    use crate::typeset::layout::layout_root;

    fn render(src: &str) -> Svg {
        let table = CommandTable::compile(&ExtensionSet::baseline());
        let node = parse(src, &table).unwrap();
        let layout = layout_root(&node, &ConvertOptions::hover());
        emit(&layout, &ConvertOptions::hover())
    }

    #[test]
    fn markup_is_well_formed_xml() {
        let svg = render("x^2 + y^2 = z^2");
        roxmltree::Document::parse(svg.to_markup()).expect("emitted SVG must parse");
    }

    #[test]
    fn markup_always_contains_defs() {
        let svg = render("");
        assert!(svg.to_markup().contains("<defs>"));
    }

    #[test]
    fn repeated_glyphs_share_one_definition() {
        let svg = render("x + x + x");
        let markup = svg.to_markup();
        assert_eq!(markup.matches("<symbol id=\"eq-g0\"").count(), 1);
        // Three uses of the same cached glyph.
        assert_eq!(markup.matches("xlink:href=\"#eq-g0\"").count(), 3);
    }

    #[test]
    fn relation_characters_are_escaped() {
        let svg = render("a < b");
        let markup = svg.to_markup();
        assert!(markup.contains("&lt;"));
        roxmltree::Document::parse(markup).expect("escaped SVG must parse");
    }

    #[test]
    fn geometry_inherits_current_color() {
        let svg = render("\\frac{1}{2}");
        let markup = svg.to_markup();
        assert!(markup.contains("stroke=\"currentColor\" fill=\"currentColor\""));
    }

    #[test]
    fn color_subtrees_override_fill() {
        let table = CommandTable::compile(&ExtensionSet::baseline());
        let node = parse("\\color{red}{x}", &table).unwrap();
        let layout = layout_root(&node, &ConvertOptions::hover());
        let svg = emit(&layout, &ConvertOptions::hover());
        assert!(svg.to_markup().contains("fill=\"red\""));
    }

    #[test]
    fn number_formatting_is_compact() {
        assert_eq!(fmt(18.0), "18");
        assert_eq!(fmt(12.5), "12.5");
        assert_eq!(fmt(0.333333), "0.33");
        assert_eq!(fmt(-0.0001), "0");
    }
}
