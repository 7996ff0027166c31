//! Box layout on a fixed metric basis.
//!
//! Parse nodes are placed into positioned primitives (glyphs, rules, lines)
//! relative to the first baseline at y = 0, with y growing downward as in
//! SVG. All distances are in pixels derived from the conversion options'
//! em/ex basis; the container width only decides line breaking, never
//! cropping.

use unicode_width::UnicodeWidthChar;

use super::ConvertOptions;
use super::fonts::{MathFont, restyle};
use super::parser::{AtomClass, CancelKind, Node};

/// Fixed font metrics shared by every engine in the process. This is the
/// headless rendering context: it holds no per-conversion state and is never
/// rebuilt.
#[derive(Debug)]
pub(crate) struct FontCatalog {
    pub(crate) family: &'static str,
}

static CATALOG: FontCatalog = FontCatalog {
    family: "STIX Two Math, Cambria Math, XITS Math, serif",
};

pub(crate) fn catalog() -> &'static FontCatalog {
    &CATALOG
}

impl FontCatalog {
    /// Horizontal advance in em: half an em per terminal column.
    pub(crate) fn advance(&self, ch: char) -> f64 {
        ch.width().unwrap_or(1).max(1) as f64 * 0.5
    }

    /// (height, depth) above/below the baseline in em.
    pub(crate) fn vertical(&self, ch: char) -> (f64, f64) {
        match ch {
            '(' | ')' | '[' | ']' | '{' | '}' | '|' | '‖' | '⟨' | '⟩' | '⌈' | '⌉'
            | '⌊' | '⌋' | '/' | '\\' => (0.75, 0.25),
            '∫' | '∮' | '∬' | '∭' => (0.85, 0.35),
            '∑' | '∏' | '∐' | '⋃' | '⋂' | '⨁' | '⨂' | '⋀' | '⋁' => (0.75, 0.25),
            'g' | 'j' | 'p' | 'q' | 'y' => (0.45, 0.2),
            'b' | 'd' | 'f' | 'h' | 'k' | 'l' | 't' | 'i' => (0.7, 0.0),
            c if c.is_ascii_lowercase() => (0.45, 0.0),
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => (0.68, 0.0),
            '+' | '−' | '=' | '<' | '>' | '±' | '×' | '⋅' => (0.55, 0.05),
            ',' | ';' => (0.15, 0.15),
            '.' => (0.12, 0.0),
            _ => (0.62, 0.12),
        }
    }
}

/// A positioned drawing primitive. Coordinates are relative to the layout's
/// first baseline; `fill` overrides `currentColor` for `\color` subtrees.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Glyph {
        ch: char,
        x: f64,
        y: f64,
        scale: f64,
        fill: Option<String>,
    },
    Rule {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<String>,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        thickness: f64,
        fill: Option<String>,
    },
    Frame {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        thickness: f64,
        fill: Option<String>,
    },
}

impl Item {
    fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Item::Glyph { x, y, .. } | Item::Rule { x, y, .. } | Item::Frame { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Item::Line { x1, y1, x2, y2, .. } => {
                *x1 += dx;
                *y1 += dy;
                *x2 += dx;
                *y2 += dy;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) depth: f64,
    pub(crate) items: Vec<Item>,
}

impl Layout {
    fn translated(mut self, dx: f64, dy: f64) -> Layout {
        for item in &mut self.items {
            item.translate(dx, dy);
        }
        self
    }
}

struct Ctx<'a> {
    opts: &'a ConvertOptions,
}

impl Ctx<'_> {
    fn em(&self, size: f64) -> f64 {
        self.opts.em * size
    }
}

/// Lays out a parsed expression, breaking the top-level row into lines at
/// the container width.
pub(crate) fn layout_root(node: &Node, opts: &ConvertOptions) -> Layout {
    let ctx = Ctx { opts };
    let children: Vec<&Node> = match node {
        Node::Row(items) => items.iter().collect(),
        other => vec![other],
    };

    struct LineBox {
        layout: Layout,
        prev_class: Option<AtomClass>,
    }

    let mut lines: Vec<Layout> = Vec::new();
    let mut current = LineBox {
        layout: Layout::default(),
        prev_class: None,
    };

    let mut flush = |current: &mut LineBox, lines: &mut Vec<Layout>| {
        let done = std::mem::take(&mut current.layout);
        current.prev_class = None;
        lines.push(done);
    };

    for child in children {
        if matches!(child, Node::Newline) {
            flush(&mut current, &mut lines);
            continue;
        }
        let class = node_class(child);
        let piece = ctx.layout_node(child, 1.0, None);
        let gap = match current.prev_class {
            Some(prev) => class_gap(prev, class) * ctx.em(1.0),
            None => 0.0,
        };
        let would_be = current.layout.width + gap + piece.width;
        if would_be > opts.container_width && current.layout.width > 0.0 {
            flush(&mut current, &mut lines);
            append(&mut current.layout, piece, 0.0);
        } else {
            append(&mut current.layout, piece, gap);
        }
        current.prev_class = Some(class);
    }
    flush(&mut current, &mut lines);

    stack_lines(lines, &ctx)
}

/// Appends `piece` to `line` at the current right edge plus `gap`.
fn append(line: &mut Layout, piece: Layout, gap: f64) {
    let x = line.width + gap;
    let piece = piece.translated(x, 0.0);
    line.width = x + piece.width;
    line.height = line.height.max(piece.height);
    line.depth = line.depth.max(piece.depth);
    line.items.extend(piece.items);
}

fn stack_lines(lines: Vec<Layout>, ctx: &Ctx<'_>) -> Layout {
    let mut lines = lines;
    // Trailing empty lines contribute nothing.
    while lines.len() > 1 && lines.last().is_some_and(|l| l.items.is_empty()) {
        lines.pop();
    }
    if lines.len() == 1 {
        return lines.into_iter().next().unwrap_or_default();
    }

    let leading = 0.35 * ctx.em(1.0);
    let mut out = Layout::default();
    let mut baseline = 0.0f64;
    for (idx, line) in lines.into_iter().enumerate() {
        if idx > 0 {
            baseline += out.depth_below(baseline) + line.height + leading;
        }
        out.width = out.width.max(line.width);
        if idx == 0 {
            out.height = line.height;
        }
        out.depth = baseline + line.depth;
        let shifted = line.translated(0.0, baseline);
        out.items.extend(shifted.items);
    }
    out
}

impl Layout {
    /// Depth of content below the given baseline offset.
    fn depth_below(&self, baseline: f64) -> f64 {
        (self.depth - baseline).max(0.0)
    }
}

fn node_class(node: &Node) -> AtomClass {
    match node {
        Node::Glyph { class, .. } => *class,
        Node::Text { class, .. } => *class,
        Node::Scripts { base, .. } => node_class(base),
        _ => AtomClass::Ord,
    }
}

/// Inter-atom spacing in em, a flattened version of TeX's spacing table.
fn class_gap(prev: AtomClass, next: AtomClass) -> f64 {
    use AtomClass::*;
    if prev == Open || next == Close {
        return 0.0;
    }
    if prev == Rel || next == Rel {
        return 5.0 / 18.0;
    }
    if prev == Bin || next == Bin {
        return 4.0 / 18.0;
    }
    if prev == Punct {
        return 3.0 / 18.0;
    }
    if prev == Op || next == Op {
        return 3.0 / 18.0;
    }
    0.0
}

impl Ctx<'_> {
    fn layout_node(&self, node: &Node, size: f64, fill: Option<&str>) -> Layout {
        match node {
            Node::Glyph { ch, font, .. } => self.layout_glyph(*ch, *font, size, fill),
            Node::Row(items) => self.layout_row(items, size, fill),
            Node::Frac { num, den } => self.layout_frac(num, den, size, fill),
            Node::Sqrt { index, radicand } => {
                self.layout_sqrt(index.as_deref(), radicand, size, fill)
            }
            Node::Scripts { base, sub, sup } => {
                self.layout_scripts(base, sub.as_deref(), sup.as_deref(), size, fill)
            }
            Node::Delimited { left, right, body } => {
                self.layout_delimited(*left, *right, body, size, fill)
            }
            Node::Text { content, .. } => self.layout_text(content, size, fill),
            Node::Overline(body) => self.layout_overline(body, size, fill),
            Node::Accent { accent, base } => self.layout_accent(*accent, base, size, fill),
            Node::Color { color, body } => self.layout_node(body, size, Some(color)),
            Node::Cancel { body, kind } => self.layout_cancel(body, *kind, size, fill),
            Node::Bbox(body) => self.layout_bbox(body, size, fill),
            Node::Kern(em) => Layout {
                width: em * self.em(size),
                ..Layout::default()
            },
            Node::Newline => Layout::default(),
        }
    }

    /// Metrics come from the unstyled character; the emitted glyph is its
    /// math-alphabet counterpart.
    fn layout_glyph(&self, ch: char, font: MathFont, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        let (height, depth) = catalog().vertical(ch);
        Layout {
            width: catalog().advance(ch) * em,
            height: height * em,
            depth: depth * em,
            items: vec![Item::Glyph {
                ch: restyle(ch, font),
                x: 0.0,
                y: 0.0,
                scale: size,
                fill: fill.map(str::to_string),
            }],
        }
    }

    fn layout_row(&self, items: &[Node], size: f64, fill: Option<&str>) -> Layout {
        let mut out = Layout::default();
        let mut prev: Option<AtomClass> = None;
        for child in items {
            if matches!(child, Node::Newline) {
                // Forced breaks only apply at the top level.
                continue;
            }
            let class = node_class(child);
            let piece = self.layout_node(child, size, fill);
            let gap = prev
                .map(|p| class_gap(p, class) * self.em(size))
                .unwrap_or(0.0);
            append(&mut out, piece, gap);
            prev = Some(class);
        }
        out
    }

    fn layout_frac(&self, num: &Node, den: &Node, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        // The fraction bar sits on the math axis, half an ex up.
        let axis = 0.5 * self.opts.ex * size;
        let rule = 0.05 * em;
        let gap = 0.13 * em;
        let pad = 0.12 * em;

        let num_l = self.layout_node(num, size, fill);
        let den_l = self.layout_node(den, size, fill);
        let inner = num_l.width.max(den_l.width);
        let width = inner + 2.0 * pad;

        let rule_top = -axis - rule / 2.0;
        let num_baseline = rule_top - gap - num_l.depth;
        let den_baseline = rule_top + rule + gap + den_l.height;

        let mut out = Layout {
            width,
            height: -(num_baseline - num_l.height),
            depth: den_baseline + den_l.depth,
            items: Vec::new(),
        };
        let num_x = pad + (inner - num_l.width) / 2.0;
        let den_x = pad + (inner - den_l.width) / 2.0;
        out.items
            .extend(num_l.translated(num_x, num_baseline).items);
        out.items
            .extend(den_l.translated(den_x, den_baseline).items);
        out.items.push(Item::Rule {
            x: 0.0,
            y: rule_top,
            width,
            height: rule,
            fill: fill.map(str::to_string),
        });
        out
    }

    fn layout_sqrt(
        &self,
        index: Option<&Node>,
        radicand: &Node,
        size: f64,
        fill: Option<&str>,
    ) -> Layout {
        let em = self.em(size);
        let rad = self.layout_node(radicand, size, fill);
        let gap = 0.08 * em;
        let rule = 0.05 * em;

        let total = rad.height + rad.depth + gap + rule;
        let glyph_scale = (total / (0.9 * self.opts.em)).max(size);
        let glyph_width = catalog().advance('√') * self.opts.em * glyph_scale;

        let mut out = Layout::default();
        let mut extra_height = 0.0f64;

        // Optional index tucks in ahead of the radical, raised over its
        // shoulder and set at half size.
        let mut glyph_x = 0.0;
        if let Some(node) = index {
            let ix = self.layout_node(node, size * 0.5, fill);
            let raised = -(rad.height * 0.6);
            glyph_x = (ix.width - 0.2 * em).max(0.0);
            extra_height = (-raised + ix.height).max(0.0);
            out.items.extend(ix.translated(0.0, raised).items);
        }

        out.items.push(Item::Glyph {
            ch: '√',
            x: glyph_x,
            y: rad.depth,
            scale: glyph_scale,
            fill: fill.map(str::to_string),
        });

        let x = glyph_x + glyph_width;
        let top = -(rad.height + gap + rule);
        out.items.push(Item::Rule {
            x,
            y: top,
            width: rad.width,
            height: rule,
            fill: fill.map(str::to_string),
        });
        out.width = x + rad.width;
        out.height = (-top).max(extra_height);
        out.depth = rad.depth;
        out.items.extend(rad.translated(x, 0.0).items);
        out
    }

    fn layout_scripts(
        &self,
        base: &Node,
        sub: Option<&Node>,
        sup: Option<&Node>,
        size: f64,
        fill: Option<&str>,
    ) -> Layout {
        let em = self.em(size);
        let base_l = self.layout_node(base, size, fill);
        let script_size = size * 0.7;
        let limits = self.opts.display && node_class(base) == AtomClass::Op;

        let sub_l = sub.map(|n| self.layout_node(n, script_size, fill));
        let sup_l = sup.map(|n| self.layout_node(n, script_size, fill));

        if limits {
            let gap = 0.15 * em;
            let width = base_l
                .width
                .max(sub_l.as_ref().map_or(0.0, |l| l.width))
                .max(sup_l.as_ref().map_or(0.0, |l| l.width));
            let mut out = Layout {
                width,
                height: base_l.height,
                depth: base_l.depth,
                items: Vec::new(),
            };
            let base_x = (width - base_l.width) / 2.0;
            if let Some(sup_l) = sup_l {
                let y = -(base_l.height + gap + sup_l.depth);
                out.height = -(y - sup_l.height);
                let x = (width - sup_l.width) / 2.0;
                out.items.extend(sup_l.translated(x, y).items);
            }
            if let Some(sub_l) = sub_l {
                let y = base_l.depth + gap + sub_l.height;
                out.depth = y + sub_l.depth;
                let x = (width - sub_l.width) / 2.0;
                out.items.extend(sub_l.translated(x, y).items);
            }
            out.items.extend(base_l.translated(base_x, 0.0).items);
            return out;
        }

        let kern = 0.03 * em;
        let shift_up = 0.42 * em;
        let shift_dn = 0.22 * em;
        let script_x = base_l.width + kern;

        let mut out = Layout {
            width: base_l.width,
            height: base_l.height,
            depth: base_l.depth,
            items: base_l.items,
        };
        let mut right = out.width;
        if let Some(sup_l) = sup_l {
            let y = -shift_up;
            out.height = out.height.max(shift_up + sup_l.height);
            right = right.max(script_x + sup_l.width);
            out.items.extend(sup_l.translated(script_x, y).items);
        }
        if let Some(sub_l) = sub_l {
            let y = shift_dn;
            out.depth = out.depth.max(shift_dn + sub_l.depth);
            right = right.max(script_x + sub_l.width);
            out.items.extend(sub_l.translated(script_x, y).items);
        }
        out.width = right;
        out
    }

    fn layout_delimited(
        &self,
        left: Option<char>,
        right: Option<char>,
        body: &Node,
        size: f64,
        fill: Option<&str>,
    ) -> Layout {
        let em = self.em(size);
        let axis = 0.5 * self.opts.ex * size;
        let body_l = self.layout_node(body, size, fill);
        let half = (body_l.height - axis)
            .max(body_l.depth + axis)
            .max(0.5 * em);
        let scale = ((2.0 * half) / self.opts.em).max(size);

        let mut out = Layout::default();
        let mut x = 0.0;
        if let Some(ch) = left {
            x += self.place_delimiter(&mut out, ch, x, axis, scale, fill);
        }
        let body_shifted = body_l.translated(x, 0.0);
        x += body_shifted.width;
        out.width = x;
        out.height = out.height.max(body_shifted.height);
        out.depth = out.depth.max(body_shifted.depth);
        out.items.extend(body_shifted.items);
        if let Some(ch) = right {
            let w = self.place_delimiter(&mut out, ch, x, axis, scale, fill);
            out.width = x + w;
        }
        out
    }

    /// Places a vertically stretched delimiter centred on the math axis and
    /// returns its advance width.
    fn place_delimiter(
        &self,
        out: &mut Layout,
        ch: char,
        x: f64,
        axis: f64,
        scale: f64,
        fill: Option<&str>,
    ) -> f64 {
        let (h, d) = catalog().vertical(ch);
        let h_px = h * self.opts.em * scale;
        let d_px = d * self.opts.em * scale;
        let y = -axis + (h_px - d_px) / 2.0;
        out.items.push(Item::Glyph {
            ch,
            x,
            y,
            scale,
            fill: fill.map(str::to_string),
        });
        out.height = out.height.max(h_px - y);
        out.depth = out.depth.max(y + d_px);
        catalog().advance(ch) * self.opts.em * scale
    }

    fn layout_text(&self, content: &str, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        let mut out = Layout::default();
        let mut x = 0.0;
        for ch in content.chars() {
            let (h, d) = catalog().vertical(ch);
            out.items.push(Item::Glyph {
                ch,
                x,
                y: 0.0,
                scale: size,
                fill: fill.map(str::to_string),
            });
            x += catalog().advance(ch) * em;
            out.height = out.height.max(h * em);
            out.depth = out.depth.max(d * em);
        }
        out.width = x;
        out
    }

    fn layout_overline(&self, body: &Node, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        let body_l = self.layout_node(body, size, fill);
        let gap = 0.08 * em;
        let rule = 0.05 * em;
        let top = -(body_l.height + gap + rule);
        let mut out = Layout {
            width: body_l.width,
            height: -top,
            depth: body_l.depth,
            items: body_l.items,
        };
        out.items.push(Item::Rule {
            x: 0.0,
            y: top,
            width: out.width,
            height: rule,
            fill: fill.map(str::to_string),
        });
        out
    }

    fn layout_accent(&self, accent: char, base: &Node, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        let base_l = self.layout_node(base, size, fill);
        let acc = self.layout_glyph(accent, MathFont::Upright, size * 0.8, fill);
        let y = -(base_l.height + 0.05 * em);
        let x = (base_l.width - acc.width) / 2.0;
        let mut out = Layout {
            width: base_l.width,
            height: base_l.height + 0.05 * em + acc.height,
            depth: base_l.depth,
            items: base_l.items,
        };
        out.items.extend(acc.translated(x, y).items);
        out
    }

    fn layout_cancel(
        &self,
        body: &Node,
        kind: CancelKind,
        size: f64,
        fill: Option<&str>,
    ) -> Layout {
        let em = self.em(size);
        let body_l = self.layout_node(body, size, fill);
        let thickness = 0.05 * em;
        let mut out = body_l;
        let (w, h, d) = (out.width, out.height, out.depth);
        let fill_owned = fill.map(str::to_string);
        if matches!(kind, CancelKind::Up | CancelKind::Cross) {
            out.items.push(Item::Line {
                x1: 0.0,
                y1: d,
                x2: w,
                y2: -h,
                thickness,
                fill: fill_owned.clone(),
            });
        }
        if matches!(kind, CancelKind::Down | CancelKind::Cross) {
            out.items.push(Item::Line {
                x1: 0.0,
                y1: -h,
                x2: w,
                y2: d,
                thickness,
                fill: fill_owned,
            });
        }
        out
    }

    fn layout_bbox(&self, body: &Node, size: f64, fill: Option<&str>) -> Layout {
        let em = self.em(size);
        let pad = 0.15 * em;
        let thickness = 0.04 * em;
        let body_l = self.layout_node(body, size, fill);
        let width = body_l.width + 2.0 * pad;
        let height = body_l.height + pad;
        let depth = body_l.depth + pad;
        let mut out = Layout {
            width,
            height,
            depth,
            items: body_l.translated(pad, 0.0).items,
        };
        out.items.push(Item::Frame {
            x: 0.0,
            y: -height,
            width,
            height: height + depth,
            thickness,
            fill: fill.map(str::to_string),
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeset::packages::ExtensionSet;
    use crate::typeset::parser::{CommandTable, parse};

    fn layout_of(src: &str) -> Layout {
        let table = CommandTable::compile(&ExtensionSet::baseline());
        let node = parse(src, &table).unwrap();
        layout_root(&node, &ConvertOptions::hover())
    }

    #[test]
    fn glyph_row_accumulates_width() {
        let a = layout_of("x");
        let ab = layout_of("xy");
        assert!(ab.width > a.width);
        assert!(a.width > 0.0);
        assert!(a.height > 0.0);
    }

    #[test]
    fn relations_add_space() {
        let plain = layout_of("xy");
        let related = layout_of("x=y");
        let x = layout_of("x");
        let eq = layout_of("=");
        // Spacing means the relation row is wider than the glyph sum.
        assert!(related.width > plain.width);
        assert!(related.width > x.width * 2.0 + eq.width);
    }

    #[test]
    fn fractions_extend_above_and_below() {
        let frac = layout_of("\\frac{1}{2}");
        let digit = layout_of("1");
        assert!(frac.height > digit.height);
        assert!(frac.depth > digit.depth);
        assert!(frac.items.iter().any(|i| matches!(i, Item::Rule { .. })));
    }

    #[test]
    fn scripts_raise_height() {
        let base = layout_of("x");
        let sup = layout_of("x^2");
        let sub = layout_of("x_2");
        assert!(sup.height > base.height);
        assert!(sub.depth > base.depth);
    }

    #[test]
    fn display_limits_stack_over_big_operators() {
        let with_limits = layout_of("\\sum_{i=0}^{n}");
        let bare = layout_of("\\sum");
        assert!(with_limits.height > bare.height);
        assert!(with_limits.depth > bare.depth);
        // Inline scripts would widen instead.
        let inline = ConvertOptions {
            display: false,
            ..ConvertOptions::hover()
        };
        let table = CommandTable::compile(&ExtensionSet::baseline());
        let node = parse("\\sum_{i=0}^{n}", &table).unwrap();
        let inline_l = layout_root(&node, &inline);
        assert!(inline_l.width > with_limits.width);
    }

    #[test]
    fn long_expressions_wrap_at_container_width() {
        let narrow = ConvertOptions {
            container_width: 60.0,
            ..ConvertOptions::hover()
        };
        let table = CommandTable::compile(&ExtensionSet::baseline());
        let node = parse("a+b+c+d+e+f+g", &table).unwrap();
        let wrapped = layout_root(&node, &narrow);
        let unwrapped = layout_root(&node, &ConvertOptions::hover());
        assert!(wrapped.width <= 60.0 + f64::EPSILON || wrapped.depth > unwrapped.depth);
        assert!(wrapped.depth > unwrapped.depth);
    }

    #[test]
    fn forced_newline_stacks_lines() {
        let single = layout_of("a+b");
        let stacked = layout_of("a \\\\ b");
        assert!(stacked.depth > single.depth);
        assert!(stacked.width < single.width);
    }

    #[test]
    fn empty_input_is_a_zero_box() {
        let empty = layout_of("");
        assert_eq!(empty.items.len(), 0);
        assert_eq!(empty.width, 0.0);
    }
}
