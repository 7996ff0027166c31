//! TeX parsing: tokens to layout-ready nodes.
//!
//! The parser is table-driven: an engine's [`CommandTable`] is precompiled
//! from its extension set, so parsing is restricted to exactly the enabled
//! packages. Errors carry the human-readable message that ultimately lands
//! in hover error content.

use std::collections::{HashMap, VecDeque};

use super::TypesetError;
use super::fonts::MathFont;
use super::lexer::{Token, tokenize};
use super::packages::{Definition, ExtensionSet, Package};

const MAX_EXPANSIONS: usize = 512;

/// Spacing class of an atom, following TeX's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum AtomClass {
    Ord,
    Op,
    Bin,
    Rel,
    Open,
    Close,
    Punct,
}

/// Cancellation stroke direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelKind {
    Up,
    Down,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Glyph {
        ch: char,
        class: AtomClass,
        font: MathFont,
    },
    Row(Vec<Node>),
    Frac {
        num: Box<Node>,
        den: Box<Node>,
    },
    Sqrt {
        index: Option<Box<Node>>,
        radicand: Box<Node>,
    },
    Scripts {
        base: Box<Node>,
        sub: Option<Box<Node>>,
        sup: Option<Box<Node>>,
    },
    Delimited {
        left: Option<char>,
        right: Option<char>,
        body: Box<Node>,
    },
    /// Upright text run; class `Op` marks named operators that take limits.
    Text {
        content: String,
        class: AtomClass,
    },
    Overline(Box<Node>),
    Accent {
        accent: char,
        base: Box<Node>,
    },
    Color {
        color: String,
        body: Box<Node>,
    },
    Cancel {
        body: Box<Node>,
        kind: CancelKind,
    },
    Bbox(Box<Node>),
    /// Horizontal kern in em.
    Kern(f64),
    Newline,
}

/// A parameterised macro body, pre-tokenised.
#[derive(Debug, Clone)]
pub(crate) struct MacroBody {
    params: u8,
    tokens: Vec<Token>,
}

/// Command lookup tables for one engine, compiled from its extension set.
#[derive(Debug)]
pub(crate) struct CommandTable {
    extensions: ExtensionSet,
    symbols: HashMap<&'static str, (char, AtomClass)>,
    macros: HashMap<&'static str, MacroBody>,
}

impl CommandTable {
    pub(crate) fn compile(extensions: &ExtensionSet) -> Self {
        let mut symbols = HashMap::new();
        let mut macros = HashMap::new();
        for package in extensions.iter() {
            for (name, definition) in package.definitions() {
                match definition {
                    Definition::Symbol(ch, class) => {
                        symbols.insert(*name, (*ch, *class));
                    }
                    Definition::Expansion { params, body } => {
                        let tokens = tokenize(body)
                            .expect("package macro body must tokenise");
                        macros.insert(
                            *name,
                            MacroBody {
                                params: *params,
                                tokens,
                            },
                        );
                    }
                }
            }
        }
        Self {
            extensions: extensions.clone(),
            symbols,
            macros,
        }
    }

    pub(crate) fn enabled(&self, package: Package) -> bool {
        self.extensions.contains(package)
    }

    pub(crate) fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }
}

/// Parses math source against a command table. The returned root is always a
/// [`Node::Row`].
pub(crate) fn parse(src: &str, table: &CommandTable) -> Result<Node, TypesetError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        table,
        tokens: tokens.into(),
        user_macros: HashMap::new(),
        expansions: 0,
    };
    let items = parser.parse_sequence(SeqEnd::Eof)?;
    Ok(Node::Row(items))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeqEnd {
    Eof,
    Group,
    Right,
    Bracket,
}

struct Parser<'a> {
    table: &'a CommandTable,
    tokens: VecDeque<Token>,
    user_macros: HashMap<String, MacroBody>,
    expansions: usize,
}

const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "coth", "log", "ln", "lg", "exp", "arg", "deg", "dim", "ker", "hom",
];

const LIMIT_FUNCTIONS: &[(&str, &str)] = &[
    ("lim", "lim"),
    ("limsup", "lim sup"),
    ("liminf", "lim inf"),
    ("max", "max"),
    ("min", "min"),
    ("sup", "sup"),
    ("inf", "inf"),
    ("det", "det"),
    ("gcd", "gcd"),
    ("Pr", "Pr"),
];

const ACCENTS: &[(&str, char)] = &[
    ("hat", 'ˆ'),
    ("widehat", 'ˆ'),
    ("bar", 'ˉ'),
    ("overbar", 'ˉ'),
    ("vec", '→'),
    ("tilde", '˜'),
    ("widetilde", '˜'),
    ("dot", '˙'),
    ("ddot", '¨'),
    ("check", 'ˇ'),
    ("breve", '˘'),
    ("acute", '´'),
    ("grave", '`'),
];

impl Parser<'_> {
    fn next(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    fn skip_ws(&mut self) {
        while self.peek() == Some(&Token::Whitespace) {
            self.next();
        }
    }

    fn parse_sequence(&mut self, end: SeqEnd) -> Result<Vec<Node>, TypesetError> {
        let mut items: Vec<Node> = Vec::new();
        loop {
            let Some(token) = self.next() else {
                return match end {
                    SeqEnd::Eof => Ok(items),
                    SeqEnd::Group => Err(TypesetError::new("Missing close brace")),
                    SeqEnd::Right => Err(TypesetError::new("Missing \\right")),
                    SeqEnd::Bracket => {
                        Err(TypesetError::new("Could not find closing ']'"))
                    }
                };
            };
            match token {
                Token::Whitespace => {}
                Token::EndGroup => {
                    if end == SeqEnd::Group {
                        return Ok(items);
                    }
                    return Err(TypesetError::new(
                        "Extra close brace or missing open brace",
                    ));
                }
                Token::Superscript => self.attach_script(&mut items, true)?,
                Token::Subscript => self.attach_script(&mut items, false)?,
                Token::Param(_) => {
                    return Err(TypesetError::new(
                        "You can't use 'macro parameter character #' in math mode",
                    ));
                }
                Token::BeginGroup => {
                    let inner = self.parse_sequence(SeqEnd::Group)?;
                    items.push(Node::Row(inner));
                }
                Token::Char(']') if end == SeqEnd::Bracket => return Ok(items),
                Token::Char(c) => items.push(self.char_node(c)?),
                Token::Command(name) if name == "right" => {
                    if end == SeqEnd::Right {
                        return Ok(items);
                    }
                    return Err(TypesetError::new("Extra \\right"));
                }
                Token::Command(name) => {
                    if let Some(node) = self.command_node(&name)? {
                        items.push(node);
                    }
                }
            }
        }
    }

    /// A single atom in argument position.
    fn parse_argument(&mut self, owner: &str) -> Result<Node, TypesetError> {
        loop {
            let Some(token) = self.next() else {
                return Err(TypesetError::new(format!("Missing argument for {owner}")));
            };
            match token {
                Token::Whitespace => {}
                Token::BeginGroup => {
                    return Ok(Node::Row(self.parse_sequence(SeqEnd::Group)?));
                }
                Token::EndGroup => {
                    return Err(TypesetError::new(
                        "Extra close brace or missing open brace",
                    ));
                }
                Token::Superscript | Token::Subscript => {
                    return Err(TypesetError::new(format!("Missing argument for {owner}")));
                }
                Token::Param(_) => {
                    return Err(TypesetError::new(
                        "You can't use 'macro parameter character #' in math mode",
                    ));
                }
                Token::Char(c) => return self.char_node(c),
                Token::Command(name) if name == "right" => {
                    return Err(TypesetError::new("Extra \\right"));
                }
                Token::Command(name) => {
                    if let Some(node) = self.command_node(&name)? {
                        return Ok(node);
                    }
                    // Macro expansion or a definition: keep scanning.
                }
            }
        }
    }

    fn attach_script(&mut self, items: &mut Vec<Node>, is_sup: bool) -> Result<(), TypesetError> {
        let owner = if is_sup { "^" } else { "_" };
        let script = Box::new(self.parse_argument(owner)?);
        let base = items.pop().unwrap_or(Node::Row(Vec::new()));
        let node = match base {
            Node::Scripts { base, sub, sup } => {
                if is_sup {
                    if sup.is_some() {
                        return Err(TypesetError::new(
                            "Double exponent: use braces to clarify",
                        ));
                    }
                    Node::Scripts {
                        base,
                        sub,
                        sup: Some(script),
                    }
                } else {
                    if sub.is_some() {
                        return Err(TypesetError::new(
                            "Double subscript: use braces to clarify",
                        ));
                    }
                    Node::Scripts {
                        base,
                        sub: Some(script),
                        sup,
                    }
                }
            }
            other => {
                let (sub, sup) = if is_sup {
                    (None, Some(script))
                } else {
                    (Some(script), None)
                };
                Node::Scripts {
                    base: Box::new(other),
                    sub,
                    sup,
                }
            }
        };
        items.push(node);
        Ok(())
    }

    fn char_node(&self, c: char) -> Result<Node, TypesetError> {
        use AtomClass::*;
        let node = |ch, class, font| Node::Glyph { ch, class, font };
        Ok(match c {
            c if c.is_ascii_alphabetic() => node(c, Ord, MathFont::Italic),
            '0'..='9' | '.' => node(c, Ord, MathFont::Upright),
            '+' => node('+', Bin, MathFont::Upright),
            '-' => node('−', Bin, MathFont::Upright),
            '*' => node('∗', Bin, MathFont::Upright),
            '=' => node('=', Rel, MathFont::Upright),
            '<' => node('<', Rel, MathFont::Upright),
            '>' => node('>', Rel, MathFont::Upright),
            ':' => node(':', Rel, MathFont::Upright),
            ',' => node(',', Punct, MathFont::Upright),
            ';' => node(';', Punct, MathFont::Upright),
            '(' => node('(', Open, MathFont::Upright),
            '[' => node('[', Open, MathFont::Upright),
            ')' => node(')', Close, MathFont::Upright),
            ']' => node(']', Close, MathFont::Upright),
            '\'' => node('′', Ord, MathFont::Upright),
            '&' => self.unsupported("Misplaced alignment tab character &", '&')?,
            '#' => self.unsupported(
                "You can't use 'macro parameter character #' in math mode",
                '#',
            )?,
            '$' => {
                self.unsupported("You can't use 'math shift character $' in math mode", '$')?
            }
            c if c.is_control() => self.unsupported(
                &format!("Unsupported character U+{:04X}", c as u32),
                '\u{FFFD}',
            )?,
            c => node(c, Ord, MathFont::Upright),
        })
    }

    /// Characters outside the supported repertoire degrade to a literal glyph
    /// under `noerrors`, otherwise they surface the engine-reported message.
    fn unsupported(&self, message: &str, literal: char) -> Result<Node, TypesetError> {
        if self.table.enabled(Package::Noerrors) {
            Ok(Node::Glyph {
                ch: literal,
                class: AtomClass::Ord,
                font: MathFont::Upright,
            })
        } else {
            Err(TypesetError::new(message))
        }
    }

    fn command_node(&mut self, name: &str) -> Result<Option<Node>, TypesetError> {
        if let Some(mac) = self.user_macros.get(name).cloned() {
            self.expand_macro(name, &mac)?;
            return Ok(None);
        }
        if let Some(mac) = self.table.macros.get(name).cloned() {
            self.expand_macro(name, &mac)?;
            return Ok(None);
        }

        let base = self.table.enabled(Package::Base);
        let node = match name {
            "frac" | "dfrac" | "tfrac" if base => {
                let num = Box::new(self.parse_argument("\\frac")?);
                let den = Box::new(self.parse_argument("\\frac")?);
                Node::Frac { num, den }
            }
            "sqrt" if base => {
                let index = self.parse_optional_bracket()?;
                let radicand = Box::new(self.parse_argument("\\sqrt")?);
                Node::Sqrt { index, radicand }
            }
            "overline" if base => Node::Overline(Box::new(self.parse_argument("\\overline")?)),
            "left" if base => {
                let left = self.read_delimiter("left")?;
                let body = Node::Row(self.parse_sequence(SeqEnd::Right)?);
                let right = self.read_delimiter("right")?;
                Node::Delimited {
                    left,
                    right,
                    body: Box::new(body),
                }
            }
            "text" | "mbox" if base => Node::Text {
                content: self.parse_text_group("\\text")?,
                class: AtomClass::Ord,
            },
            "operatorname" if base => Node::Text {
                content: self.parse_text_group("\\operatorname")?,
                class: AtomClass::Ord,
            },
            "mathrm" if base => self.styled_argument("\\mathrm", MathFont::Upright)?,
            "mathbf" if base => self.styled_argument("\\mathbf", MathFont::Bold)?,
            "mathit" if base => self.styled_argument("\\mathit", MathFont::Italic)?,
            "mathcal" if base => self.styled_argument("\\mathcal", MathFont::Script)?,
            "mathbb" if self.table.enabled(Package::Ams) => {
                self.styled_argument("\\mathbb", MathFont::DoubleStruck)?
            }
            "mathfrak" if self.table.enabled(Package::Ams) => {
                self.styled_argument("\\mathfrak", MathFont::Fraktur)?
            }
            "boldsymbol" if self.table.enabled(Package::Boldsymbol) => {
                self.styled_argument("\\boldsymbol", MathFont::BoldItalic)?
            }
            "color" | "textcolor" if self.table.enabled(Package::Color) => {
                let color = self.parse_color_spec()?;
                let body = Box::new(self.parse_argument("\\color")?);
                Node::Color { color, body }
            }
            "cancel" if self.table.enabled(Package::Cancel) => Node::Cancel {
                body: Box::new(self.parse_argument("\\cancel")?),
                kind: CancelKind::Up,
            },
            "bcancel" if self.table.enabled(Package::Cancel) => Node::Cancel {
                body: Box::new(self.parse_argument("\\bcancel")?),
                kind: CancelKind::Down,
            },
            "xcancel" if self.table.enabled(Package::Cancel) => Node::Cancel {
                body: Box::new(self.parse_argument("\\xcancel")?),
                kind: CancelKind::Cross,
            },
            "bbox" if self.table.enabled(Package::Bbox) => {
                // The optional [padding/border] spec is accepted and ignored.
                if self.peek_after_ws() == Some(&Token::Char('[')) {
                    self.skip_ws();
                    self.next();
                    self.parse_sequence(SeqEnd::Bracket)?;
                }
                Node::Bbox(Box::new(self.parse_argument("\\bbox")?))
            }
            "unicode" if self.table.enabled(Package::Unicode) => {
                let spec = self.parse_text_group("\\unicode")?;
                let digits = spec
                    .trim()
                    .trim_start_matches("U+")
                    .trim_start_matches('x');
                let ch = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| TypesetError::new("Invalid \\unicode code point"))?;
                Node::Glyph {
                    ch,
                    class: AtomClass::Ord,
                    font: MathFont::Upright,
                }
            }
            "newcommand" if self.table.enabled(Package::Newcommand) => {
                self.parse_newcommand(false)?;
                return Ok(None);
            }
            "renewcommand" if self.table.enabled(Package::Newcommand) => {
                self.parse_newcommand(true)?;
                return Ok(None);
            }
            "," if base => Node::Kern(3.0 / 18.0),
            ";" if base => Node::Kern(5.0 / 18.0),
            "!" if base => Node::Kern(-3.0 / 18.0),
            " " if base => Node::Kern(0.25),
            "quad" if base => Node::Kern(1.0),
            "qquad" if base => Node::Kern(2.0),
            "\\" if base => Node::Newline,
            "{" if base => glyph('{', AtomClass::Open),
            "}" if base => glyph('}', AtomClass::Close),
            "|" if base => glyph('‖', AtomClass::Ord),
            "_" if base => glyph('_', AtomClass::Ord),
            "#" if base => glyph('#', AtomClass::Ord),
            "%" if base => glyph('%', AtomClass::Ord),
            "&" if base => glyph('&', AtomClass::Ord),
            "$" if base => glyph('$', AtomClass::Ord),
            name if base && FUNCTIONS.contains(&name) => Node::Text {
                content: name.to_string(),
                class: AtomClass::Ord,
            },
            name if base
                && LIMIT_FUNCTIONS
                    .iter()
                    .any(|(cmd, _)| *cmd == name) =>
            {
                let display = LIMIT_FUNCTIONS
                    .iter()
                    .find(|(cmd, _)| *cmd == name)
                    .map(|(_, text)| *text)
                    .unwrap_or(name);
                Node::Text {
                    content: display.to_string(),
                    class: AtomClass::Op,
                }
            }
            name if base && ACCENTS.iter().any(|(cmd, _)| *cmd == name) => {
                let accent = ACCENTS
                    .iter()
                    .find(|(cmd, _)| *cmd == name)
                    .map(|(_, ch)| *ch)
                    .unwrap_or('ˆ');
                Node::Accent {
                    accent,
                    base: Box::new(self.parse_argument(&format!("\\{name}"))?),
                }
            }
            _ => {
                if let Some(&(ch, class)) = self.table.symbols.get(name) {
                    return Ok(Some(Node::Glyph {
                        ch,
                        class,
                        font: MathFont::Upright,
                    }));
                }
                if self.table.enabled(Package::Noundefined) {
                    return Ok(Some(Node::Text {
                        content: format!("\\{name}"),
                        class: AtomClass::Ord,
                    }));
                }
                return Err(TypesetError::new(format!(
                    "Undefined control sequence \\{name}"
                )));
            }
        };
        Ok(Some(node))
    }

    fn styled_argument(
        &mut self,
        owner: &str,
        font: MathFont,
    ) -> Result<Node, TypesetError> {
        let arg = self.parse_argument(owner)?;
        Ok(restyle_node(arg, font))
    }

    fn peek_after_ws(&mut self) -> Option<&Token> {
        // Leading whitespace never matters before an optional bracket.
        while self.tokens.front() == Some(&Token::Whitespace) {
            self.tokens.pop_front();
        }
        self.tokens.front()
    }

    fn parse_optional_bracket(&mut self) -> Result<Option<Box<Node>>, TypesetError> {
        if self.peek_after_ws() == Some(&Token::Char('[')) {
            self.next();
            let items = self.parse_sequence(SeqEnd::Bracket)?;
            Ok(Some(Box::new(Node::Row(items))))
        } else {
            Ok(None)
        }
    }

    fn parse_color_spec(&mut self) -> Result<String, TypesetError> {
        let spec = self.parse_text_group("\\color")?;
        let spec = spec.trim().to_string();
        let named = spec.chars().all(|c| c.is_ascii_alphabetic()) && !spec.is_empty();
        let hex = spec.strip_prefix('#').is_some_and(|rest| {
            (rest.len() == 3 || rest.len() == 6) && rest.chars().all(|c| c.is_ascii_hexdigit())
        });
        if named || hex {
            Ok(spec)
        } else {
            Err(TypesetError::new(format!("Invalid color specification '{spec}'")))
        }
    }

    fn read_delimiter(&mut self, owner: &str) -> Result<Option<char>, TypesetError> {
        self.skip_ws();
        let unrecognized =
            || TypesetError::new(format!("Missing or unrecognized delimiter for \\{owner}"));
        match self.next() {
            Some(Token::Char('.')) => Ok(None),
            Some(Token::Char(c)) if "()[]|/".contains(c) => Ok(Some(c)),
            Some(Token::Command(name)) => match name.as_str() {
                "{" => Ok(Some('{')),
                "}" => Ok(Some('}')),
                "|" => Ok(Some('‖')),
                _ => match self.table.symbols.get(name.as_str()) {
                    Some(&(ch, _)) => Ok(Some(ch)),
                    None => Err(unrecognized()),
                },
            },
            _ => Err(unrecognized()),
        }
    }

    /// Reads a brace group as plain text (for `\text` and friends).
    fn parse_text_group(&mut self, owner: &str) -> Result<String, TypesetError> {
        self.skip_ws();
        match self.next() {
            Some(Token::BeginGroup) => {
                let mut depth = 1u32;
                let mut out = String::new();
                loop {
                    match self.next() {
                        None => return Err(TypesetError::new("Missing close brace")),
                        Some(Token::BeginGroup) => depth += 1,
                        Some(Token::EndGroup) => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(out);
                            }
                        }
                        Some(Token::Whitespace) => out.push(' '),
                        Some(Token::Char(c)) => out.push(c),
                        Some(Token::Superscript) => out.push('^'),
                        Some(Token::Subscript) => out.push('_'),
                        Some(Token::Param(n)) => {
                            out.push('#');
                            out.push((b'0' + n) as char);
                        }
                        Some(Token::Command(name)) => {
                            let mut chars = name.chars();
                            match (chars.next(), chars.next()) {
                                (Some(c), None) if !c.is_ascii_alphabetic() => out.push(c),
                                _ => {
                                    out.push('\\');
                                    out.push_str(&name);
                                }
                            }
                        }
                    }
                }
            }
            Some(Token::Char(c)) => Ok(c.to_string()),
            _ => Err(TypesetError::new(format!("Missing argument for {owner}"))),
        }
    }

    /// Reads a raw (unparsed) argument: a brace group's tokens, or a single
    /// token. Used for macro arguments and bodies, which substitute before
    /// parsing.
    fn read_raw_argument(&mut self, owner: &str) -> Result<Vec<Token>, TypesetError> {
        self.skip_ws();
        match self.next() {
            Some(Token::BeginGroup) => {
                let mut depth = 1u32;
                let mut out = Vec::new();
                loop {
                    match self.next() {
                        None => return Err(TypesetError::new("Missing close brace")),
                        Some(Token::BeginGroup) => {
                            depth += 1;
                            out.push(Token::BeginGroup);
                        }
                        Some(Token::EndGroup) => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(out);
                            }
                            out.push(Token::EndGroup);
                        }
                        Some(token) => out.push(token),
                    }
                }
            }
            Some(Token::EndGroup) => Err(TypesetError::new(
                "Extra close brace or missing open brace",
            )),
            Some(token) => Ok(vec![token]),
            None => Err(TypesetError::new(format!("Missing argument for {owner}"))),
        }
    }

    fn expand_macro(&mut self, name: &str, mac: &MacroBody) -> Result<(), TypesetError> {
        self.expansions += 1;
        if self.expansions > MAX_EXPANSIONS {
            return Err(TypesetError::new(
                "Maximum macro substitution depth exceeded; is there a recursive macro call?",
            ));
        }
        let owner = format!("\\{name}");
        let mut args: Vec<Vec<Token>> = Vec::with_capacity(mac.params as usize);
        for _ in 0..mac.params {
            args.push(self.read_raw_argument(&owner)?);
        }
        let mut expanded: Vec<Token> = Vec::new();
        for token in &mac.tokens {
            match token {
                Token::Param(n) => match args.get(*n as usize - 1) {
                    Some(arg) => expanded.extend(arg.iter().cloned()),
                    None => {
                        return Err(TypesetError::new(format!(
                            "Illegal macro parameter #{n} in definition of {owner}"
                        )));
                    }
                },
                other => expanded.push(other.clone()),
            }
        }
        for token in expanded.into_iter().rev() {
            self.tokens.push_front(token);
        }
        Ok(())
    }

    fn parse_newcommand(&mut self, renew: bool) -> Result<(), TypesetError> {
        let owner = if renew {
            "\\renewcommand"
        } else {
            "\\newcommand"
        };
        self.skip_ws();
        let name = match self.next() {
            Some(Token::BeginGroup) => {
                let name = match self.next() {
                    Some(Token::Command(name)) => name,
                    _ => {
                        return Err(TypesetError::new(format!(
                            "Illegal control sequence name for {owner}"
                        )));
                    }
                };
                match self.next() {
                    Some(Token::EndGroup) => name,
                    _ => return Err(TypesetError::new("Missing close brace")),
                }
            }
            Some(Token::Command(name)) => name,
            _ => {
                return Err(TypesetError::new(format!(
                    "Illegal control sequence name for {owner}"
                )));
            }
        };

        let mut params = 0u8;
        if self.peek_after_ws() == Some(&Token::Char('[')) {
            self.next();
            let mut digits = String::new();
            loop {
                match self.next() {
                    Some(Token::Char(']')) => break,
                    Some(Token::Char(c)) if c.is_ascii_digit() => digits.push(c),
                    _ => {
                        return Err(TypesetError::new(
                            "Illegal number of parameters specified",
                        ));
                    }
                }
            }
            params = digits
                .parse()
                .ok()
                .filter(|n| *n <= 9)
                .ok_or_else(|| TypesetError::new("Illegal number of parameters specified"))?;
        }

        let body = self.read_raw_argument(owner)?;

        let defined = self.user_macros.contains_key(&name)
            || self.table.macros.contains_key(name.as_str())
            || self.table.symbols.contains_key(name.as_str());
        if renew && !defined {
            return Err(TypesetError::new(format!(
                "\\renewcommand: \\{name} is not defined"
            )));
        }
        if !renew && defined {
            return Err(TypesetError::new(format!("Command \\{name} already defined")));
        }

        self.user_macros.insert(name, MacroBody { params, tokens: body });
        Ok(())
    }
}

fn glyph(ch: char, class: AtomClass) -> Node {
    Node::Glyph {
        ch,
        class,
        font: MathFont::Upright,
    }
}

/// Rewrites every glyph in a subtree into the given alphabet.
fn restyle_node(node: Node, font: MathFont) -> Node {
    match node {
        // The alphabet mapping itself happens at emission; only the tag moves.
        Node::Glyph { ch, class, .. } => Node::Glyph { ch, class, font },
        Node::Row(items) => Node::Row(
            items
                .into_iter()
                .map(|item| restyle_node(item, font))
                .collect(),
        ),
        Node::Frac { num, den } => Node::Frac {
            num: Box::new(restyle_node(*num, font)),
            den: Box::new(restyle_node(*den, font)),
        },
        Node::Sqrt { index, radicand } => Node::Sqrt {
            index: index.map(|n| Box::new(restyle_node(*n, font))),
            radicand: Box::new(restyle_node(*radicand, font)),
        },
        Node::Scripts { base, sub, sup } => Node::Scripts {
            base: Box::new(restyle_node(*base, font)),
            sub: sub.map(|n| Box::new(restyle_node(*n, font))),
            sup: sup.map(|n| Box::new(restyle_node(*n, font))),
        },
        Node::Delimited { left, right, body } => Node::Delimited {
            left,
            right,
            body: Box::new(restyle_node(*body, font)),
        },
        Node::Color { color, body } => Node::Color {
            color,
            body: Box::new(restyle_node(*body, font)),
        },
        Node::Cancel { body, kind } => Node::Cancel {
            body: Box::new(restyle_node(*body, font)),
            kind,
        },
        Node::Bbox(body) => Node::Bbox(Box::new(restyle_node(*body, font))),
        Node::Overline(body) => Node::Overline(Box::new(restyle_node(*body, font))),
        Node::Accent { accent, base } => Node::Accent {
            accent,
            base: Box::new(restyle_node(*base, font)),
        },
        other @ (Node::Text { .. } | Node::Kern(_) | Node::Newline) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CommandTable {
        CommandTable::compile(&ExtensionSet::baseline())
    }

    fn table_with(extra: &[&str]) -> CommandTable {
        let names: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
        CommandTable::compile(&ExtensionSet::from_config(&names))
    }

    #[test]
    fn parses_simple_equation() {
        let node = parse("x^2 + y^2 = z^2", &table()).unwrap();
        let Node::Row(items) = node else {
            panic!("root must be a row");
        };
        assert_eq!(items.len(), 5);
        assert!(matches!(items[0], Node::Scripts { .. }));
        assert!(matches!(
            items[1],
            Node::Glyph {
                ch: '+',
                class: AtomClass::Bin,
                ..
            }
        ));
        assert!(matches!(
            items[3],
            Node::Glyph {
                ch: '=',
                class: AtomClass::Rel,
                ..
            }
        ));
    }

    #[test]
    fn unbalanced_brace_reports_missing_close() {
        let err = parse("\\frac{1}{", &table()).unwrap_err();
        assert_eq!(err.to_string(), "Missing close brace");
    }

    #[test]
    fn extra_close_brace_is_reported() {
        let err = parse("x}", &table()).unwrap_err();
        assert!(err.to_string().contains("Extra close brace"));
    }

    #[test]
    fn double_exponent_is_reported() {
        let err = parse("x^2^3", &table()).unwrap_err();
        assert!(err.to_string().starts_with("Double exponent"));
    }

    #[test]
    fn undefined_command_degrades_under_noundefined() {
        let node = parse("\\notacommand", &table()).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert_eq!(
            items[0],
            Node::Text {
                content: "\\notacommand".into(),
                class: AtomClass::Ord,
            }
        );
    }

    #[test]
    fn undefined_command_errors_without_noundefined() {
        let set = ExtensionSet::from_packages([Package::Base, Package::Ams]);
        let table = CommandTable::compile(&set);
        let err = parse("\\notacommand", &table).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Undefined control sequence \\notacommand"
        );
    }

    #[test]
    fn alignment_tab_errors_without_noerrors() {
        let set = ExtensionSet::from_packages([Package::Base]);
        let table = CommandTable::compile(&set);
        let err = parse("a & b", &table).unwrap_err();
        assert!(err.to_string().contains("alignment tab"));
        // Baseline includes noerrors, so the same input degrades.
        assert!(parse("a & b", &self::table()).is_ok());
    }

    #[test]
    fn mathtools_symbols_require_the_package() {
        let node = parse("x \\coloneqq y", &table_with(&["mathtools"])).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert!(items.iter().any(|n| matches!(
            n,
            Node::Glyph { ch: '≔', .. }
        )));

        // Without the package the command follows the noundefined path.
        let node = parse("x \\coloneqq y", &table()).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert!(items.iter().any(|n| matches!(
            n,
            Node::Text { content, .. } if content == "\\coloneqq"
        )));
    }

    #[test]
    fn braket_macros_expand() {
        let node = parse("\\ket{\\psi}", &table_with(&["braket"])).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert!(matches!(
            items.first(),
            Some(Node::Glyph { ch: '|', class: AtomClass::Open, .. })
        ));
        assert!(matches!(
            items.last(),
            Some(Node::Glyph { ch: '⟩', class: AtomClass::Close, .. })
        ));
    }

    #[test]
    fn newcommand_defines_and_expands() {
        let node = parse("\\newcommand{\\half}{\\frac{1}{2}} \\half", &table()).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Node::Frac { .. }));
    }

    #[test]
    fn newcommand_with_parameters_substitutes() {
        let node = parse("\\newcommand{\\sq}[1]{#1^2} \\sq{ab}", &table()).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        // Braces are stripped from the argument, so the script binds to `b`.
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Node::Scripts { .. }));
    }

    #[test]
    fn recursive_macro_hits_expansion_limit() {
        let err = parse("\\newcommand{\\loop}{\\loop x} \\loop", &table()).unwrap_err();
        assert!(err.to_string().contains("Maximum macro substitution depth"));
    }

    #[test]
    fn redefinition_requires_renewcommand() {
        let err = parse(
            "\\newcommand{\\half}{a} \\newcommand{\\half}{b}",
            &table(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("already defined"));
        assert!(parse(
            "\\newcommand{\\half}{a} \\renewcommand{\\half}{b} \\half",
            &table()
        )
        .is_ok());
    }

    #[test]
    fn left_right_delimiters_pair() {
        let node = parse("\\left( \\frac{a}{b} \\right)", &table()).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert!(matches!(
            items[0],
            Node::Delimited {
                left: Some('('),
                right: Some(')'),
                ..
            }
        ));
    }

    #[test]
    fn missing_right_is_reported() {
        let err = parse("\\left( x", &table()).unwrap_err();
        assert_eq!(err.to_string(), "Missing \\right");
    }

    #[test]
    fn invalid_color_is_reported() {
        let err = parse("\\color{not a color!}{x}", &table()).unwrap_err();
        assert!(err.to_string().contains("Invalid color"));
        assert!(parse("\\color{red}{x}", &table()).is_ok());
        assert!(parse("\\color{#ff0000}{x}", &table()).is_ok());
    }

    #[test]
    fn unicode_command_requires_package() {
        let node = parse("\\unicode{x2764}", &table_with(&["unicode"])).unwrap();
        let Node::Row(items) = node else { unreachable!() };
        assert!(matches!(items[0], Node::Glyph { ch: '❤', .. }));
    }
}
