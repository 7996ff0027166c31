//! Math-language extension packages and the sets they form.
//!
//! An [`Engine`](super::Engine) is always built against an [`ExtensionSet`].
//! The baseline packages are implicit in every configuration-derived set;
//! the optional packages mirror the whitelist a host is allowed to enable.
//! Configuration values outside the whitelist are dropped silently.

use std::collections::BTreeSet;

use tracing::debug;

use super::parser::AtomClass;

/// A recognised extension package. Ordering follows declaration order, which
/// keeps [`ExtensionSet`] iteration stable across identical configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Package {
    // Baseline, always active.
    Ams,
    Base,
    Color,
    Newcommand,
    Noerrors,
    Noundefined,
    // Optional whitelist.
    Amscd,
    Bbox,
    Boldsymbol,
    Braket,
    Bussproofs,
    Cancel,
    Cases,
    Centernot,
    Colortbl,
    Empheq,
    Enclose,
    Extpfeil,
    Gensymb,
    Html,
    Mathtools,
    Mhchem,
    Physics,
    Textcomp,
    Textmacros,
    Unicode,
    Upgreek,
    Verb,
}

/// Packages active in every engine regardless of configuration.
pub const BASELINE: [Package; 6] = [
    Package::Ams,
    Package::Base,
    Package::Color,
    Package::Newcommand,
    Package::Noerrors,
    Package::Noundefined,
];

const WHITELIST: [Package; 22] = [
    Package::Amscd,
    Package::Bbox,
    Package::Boldsymbol,
    Package::Braket,
    Package::Bussproofs,
    Package::Cancel,
    Package::Cases,
    Package::Centernot,
    Package::Colortbl,
    Package::Empheq,
    Package::Enclose,
    Package::Extpfeil,
    Package::Gensymb,
    Package::Html,
    Package::Mathtools,
    Package::Mhchem,
    Package::Physics,
    Package::Textcomp,
    Package::Textmacros,
    Package::Unicode,
    Package::Upgreek,
    Package::Verb,
];

impl Package {
    pub fn name(self) -> &'static str {
        match self {
            Package::Ams => "ams",
            Package::Base => "base",
            Package::Color => "color",
            Package::Newcommand => "newcommand",
            Package::Noerrors => "noerrors",
            Package::Noundefined => "noundefined",
            Package::Amscd => "amscd",
            Package::Bbox => "bbox",
            Package::Boldsymbol => "boldsymbol",
            Package::Braket => "braket",
            Package::Bussproofs => "bussproofs",
            Package::Cancel => "cancel",
            Package::Cases => "cases",
            Package::Centernot => "centernot",
            Package::Colortbl => "colortbl",
            Package::Empheq => "empheq",
            Package::Enclose => "enclose",
            Package::Extpfeil => "extpfeil",
            Package::Gensymb => "gensymb",
            Package::Html => "html",
            Package::Mathtools => "mathtools",
            Package::Mhchem => "mhchem",
            Package::Physics => "physics",
            Package::Textcomp => "textcomp",
            Package::Textmacros => "textmacros",
            Package::Unicode => "unicode",
            Package::Upgreek => "upgreek",
            Package::Verb => "verb",
        }
    }

    /// Resolves a configured extension name against the optional whitelist.
    /// Baseline names are intentionally not resolvable here: they are always
    /// active and never appear in host configuration.
    pub fn from_whitelisted_name(name: &str) -> Option<Package> {
        WHITELIST.iter().copied().find(|p| p.name() == name)
    }

    /// Extra control sequences this package defines, as either plain symbols
    /// or parameterised textual expansions.
    pub(crate) fn definitions(self) -> &'static [(&'static str, Definition)] {
        match self {
            Package::Base => BASE_SYMBOLS,
            Package::Ams => AMS_SYMBOLS,
            Package::Braket => BRAKET_MACROS,
            Package::Centernot => CENTERNOT_MACROS,
            Package::Extpfeil => EXTPFEIL_SYMBOLS,
            Package::Gensymb => GENSYMB_SYMBOLS,
            Package::Mathtools => MATHTOOLS_SYMBOLS,
            Package::Mhchem => MHCHEM_MACROS,
            Package::Physics => PHYSICS_MACROS,
            Package::Textcomp => TEXTCOMP_SYMBOLS,
            Package::Textmacros => TEXTMACROS_SYMBOLS,
            Package::Upgreek => UPGREEK_SYMBOLS,
            // Behavioural packages: they gate parser features rather than
            // defining control sequences.
            Package::Color
            | Package::Newcommand
            | Package::Noerrors
            | Package::Noundefined
            | Package::Bbox
            | Package::Boldsymbol
            | Package::Cancel
            | Package::Unicode => &[],
            // TODO: amscd/bussproofs/cases/colortbl/empheq/enclose/html/verb
            // need environment and verbatim parsing before they can define
            // anything; until then enabling them only affects set identity.
            Package::Amscd
            | Package::Bussproofs
            | Package::Cases
            | Package::Colortbl
            | Package::Empheq
            | Package::Enclose
            | Package::Html
            | Package::Verb => &[],
        }
    }
}

/// A control-sequence definition contributed by a package.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Definition {
    /// A single glyph with its spacing class.
    Symbol(char, AtomClass),
    /// A textual expansion with `params` positional arguments (`#1`..`#n`).
    Expansion { params: u8, body: &'static str },
}

const fn sym(ch: char, class: AtomClass) -> Definition {
    Definition::Symbol(ch, class)
}

const fn expand(params: u8, body: &'static str) -> Definition {
    Definition::Expansion { params, body }
}

/// Ordered, deduplicated set of enabled packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    packages: BTreeSet<Package>,
}

impl ExtensionSet {
    /// The set every engine starts from: exactly the baseline packages.
    pub fn baseline() -> Self {
        Self {
            packages: BASELINE.into_iter().collect(),
        }
    }

    /// Baseline plus every configured name found in the whitelist. Unknown
    /// names are dropped without error.
    pub fn from_config(names: &[String]) -> Self {
        let mut set = Self::baseline();
        for name in names {
            match Package::from_whitelisted_name(name) {
                Some(package) => {
                    set.packages.insert(package);
                }
                None => {
                    debug!(
                        target: "texhover::typeset",
                        extension = %name,
                        "ignoring unrecognised math extension"
                    );
                }
            }
        }
        set
    }

    /// An arbitrary set, baseline not implied. This is the factory-facing
    /// constructor: engines can be built against any combination.
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            packages: packages.into_iter().collect(),
        }
    }

    pub fn contains(&self, package: Package) -> bool {
        self.packages.contains(&package)
    }

    pub fn iter(&self) -> impl Iterator<Item = Package> + '_ {
        self.packages.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.packages.iter().map(|p| p.name()).collect()
    }
}

use super::parser::AtomClass::{Bin, Close, Open, Ord, Punct, Rel};

static BASE_SYMBOLS: &[(&str, Definition)] = &[
    // Greek lowercase.
    ("alpha", sym('α', Ord)),
    ("beta", sym('β', Ord)),
    ("gamma", sym('γ', Ord)),
    ("delta", sym('δ', Ord)),
    ("epsilon", sym('ϵ', Ord)),
    ("varepsilon", sym('ε', Ord)),
    ("zeta", sym('ζ', Ord)),
    ("eta", sym('η', Ord)),
    ("theta", sym('θ', Ord)),
    ("vartheta", sym('ϑ', Ord)),
    ("iota", sym('ι', Ord)),
    ("kappa", sym('κ', Ord)),
    ("lambda", sym('λ', Ord)),
    ("mu", sym('μ', Ord)),
    ("nu", sym('ν', Ord)),
    ("xi", sym('ξ', Ord)),
    ("pi", sym('π', Ord)),
    ("varpi", sym('ϖ', Ord)),
    ("rho", sym('ρ', Ord)),
    ("varrho", sym('ϱ', Ord)),
    ("sigma", sym('σ', Ord)),
    ("varsigma", sym('ς', Ord)),
    ("tau", sym('τ', Ord)),
    ("upsilon", sym('υ', Ord)),
    ("phi", sym('ϕ', Ord)),
    ("varphi", sym('φ', Ord)),
    ("chi", sym('χ', Ord)),
    ("psi", sym('ψ', Ord)),
    ("omega", sym('ω', Ord)),
    // Greek uppercase.
    ("Gamma", sym('Γ', Ord)),
    ("Delta", sym('Δ', Ord)),
    ("Theta", sym('Θ', Ord)),
    ("Lambda", sym('Λ', Ord)),
    ("Xi", sym('Ξ', Ord)),
    ("Pi", sym('Π', Ord)),
    ("Sigma", sym('Σ', Ord)),
    ("Upsilon", sym('Υ', Ord)),
    ("Phi", sym('Φ', Ord)),
    ("Psi", sym('Ψ', Ord)),
    ("Omega", sym('Ω', Ord)),
    // Binary operators.
    ("pm", sym('±', Bin)),
    ("mp", sym('∓', Bin)),
    ("times", sym('×', Bin)),
    ("div", sym('÷', Bin)),
    ("cdot", sym('⋅', Bin)),
    ("ast", sym('∗', Bin)),
    ("star", sym('⋆', Bin)),
    ("circ", sym('∘', Bin)),
    ("bullet", sym('•', Bin)),
    ("cap", sym('∩', Bin)),
    ("cup", sym('∪', Bin)),
    ("setminus", sym('∖', Bin)),
    ("wedge", sym('∧', Bin)),
    ("land", sym('∧', Bin)),
    ("vee", sym('∨', Bin)),
    ("lor", sym('∨', Bin)),
    ("oplus", sym('⊕', Bin)),
    ("ominus", sym('⊖', Bin)),
    ("otimes", sym('⊗', Bin)),
    ("oslash", sym('⊘', Bin)),
    ("odot", sym('⊙', Bin)),
    // Relations.
    ("le", sym('≤', Rel)),
    ("leq", sym('≤', Rel)),
    ("ge", sym('≥', Rel)),
    ("geq", sym('≥', Rel)),
    ("ne", sym('≠', Rel)),
    ("neq", sym('≠', Rel)),
    ("equiv", sym('≡', Rel)),
    ("sim", sym('∼', Rel)),
    ("simeq", sym('≃', Rel)),
    ("approx", sym('≈', Rel)),
    ("cong", sym('≅', Rel)),
    ("propto", sym('∝', Rel)),
    ("subset", sym('⊂', Rel)),
    ("supset", sym('⊃', Rel)),
    ("subseteq", sym('⊆', Rel)),
    ("supseteq", sym('⊇', Rel)),
    ("in", sym('∈', Rel)),
    ("ni", sym('∋', Rel)),
    ("notin", sym('∉', Rel)),
    ("mid", sym('∣', Rel)),
    ("parallel", sym('∥', Rel)),
    ("perp", sym('⊥', Rel)),
    ("prec", sym('≺', Rel)),
    ("succ", sym('≻', Rel)),
    ("ll", sym('≪', Rel)),
    ("gg", sym('≫', Rel)),
    ("vdash", sym('⊢', Rel)),
    ("dashv", sym('⊣', Rel)),
    ("models", sym('⊨', Rel)),
    // Arrows.
    ("to", sym('→', Rel)),
    ("rightarrow", sym('→', Rel)),
    ("leftarrow", sym('←', Rel)),
    ("gets", sym('←', Rel)),
    ("leftrightarrow", sym('↔', Rel)),
    ("Rightarrow", sym('⇒', Rel)),
    ("Leftarrow", sym('⇐', Rel)),
    ("Leftrightarrow", sym('⇔', Rel)),
    ("mapsto", sym('↦', Rel)),
    ("uparrow", sym('↑', Rel)),
    ("downarrow", sym('↓', Rel)),
    ("longrightarrow", sym('⟶', Rel)),
    ("longleftarrow", sym('⟵', Rel)),
    ("hookrightarrow", sym('↪', Rel)),
    // Big operators.
    ("sum", sym('∑', AtomClass::Op)),
    ("prod", sym('∏', AtomClass::Op)),
    ("coprod", sym('∐', AtomClass::Op)),
    ("int", sym('∫', AtomClass::Op)),
    ("oint", sym('∮', AtomClass::Op)),
    ("bigcup", sym('⋃', AtomClass::Op)),
    ("bigcap", sym('⋂', AtomClass::Op)),
    ("bigoplus", sym('⨁', AtomClass::Op)),
    ("bigotimes", sym('⨂', AtomClass::Op)),
    ("bigvee", sym('⋁', AtomClass::Op)),
    ("bigwedge", sym('⋀', AtomClass::Op)),
    // Delimiters.
    ("langle", sym('⟨', Open)),
    ("rangle", sym('⟩', Close)),
    ("lceil", sym('⌈', Open)),
    ("rceil", sym('⌉', Close)),
    ("lfloor", sym('⌊', Open)),
    ("rfloor", sym('⌋', Close)),
    ("lbrace", sym('{', Open)),
    ("rbrace", sym('}', Close)),
    ("lbrack", sym('[', Open)),
    ("rbrack", sym(']', Close)),
    ("vert", sym('|', Ord)),
    ("lvert", sym('|', Open)),
    ("rvert", sym('|', Close)),
    ("Vert", sym('‖', Ord)),
    ("lVert", sym('‖', Open)),
    ("rVert", sym('‖', Close)),
    ("backslash", sym('\\', Ord)),
    // Miscellaneous.
    ("infty", sym('∞', Ord)),
    ("partial", sym('∂', Ord)),
    ("nabla", sym('∇', Ord)),
    ("forall", sym('∀', Ord)),
    ("exists", sym('∃', Ord)),
    ("emptyset", sym('∅', Ord)),
    ("aleph", sym('ℵ', Ord)),
    ("hbar", sym('ℏ', Ord)),
    ("ell", sym('ℓ', Ord)),
    ("wp", sym('℘', Ord)),
    ("Re", sym('ℜ', Ord)),
    ("Im", sym('ℑ', Ord)),
    ("angle", sym('∠', Ord)),
    ("triangle", sym('△', Ord)),
    ("prime", sym('′', Ord)),
    ("top", sym('⊤', Ord)),
    ("bot", sym('⊥', Ord)),
    ("neg", sym('¬', Ord)),
    ("lnot", sym('¬', Ord)),
    ("surd", sym('√', Ord)),
    ("cdots", sym('⋯', Ord)),
    ("ldots", sym('…', Ord)),
    ("dots", sym('…', Ord)),
    ("vdots", sym('⋮', Ord)),
    ("ddots", sym('⋱', Ord)),
    ("colon", sym(':', Punct)),
];

static AMS_SYMBOLS: &[(&str, Definition)] = &[
    ("implies", sym('⟹', Rel)),
    ("impliedby", sym('⟸', Rel)),
    ("iff", sym('⟺', Rel)),
    ("nexists", sym('∄', Ord)),
    ("varnothing", sym('∅', Ord)),
    ("therefore", sym('∴', Rel)),
    ("because", sym('∵', Rel)),
    ("nmid", sym('∤', Rel)),
    ("nparallel", sym('∦', Rel)),
    ("lesssim", sym('≲', Rel)),
    ("gtrsim", sym('≳', Rel)),
    ("leqslant", sym('⩽', Rel)),
    ("geqslant", sym('⩾', Rel)),
    ("twoheadrightarrow", sym('↠', Rel)),
    ("twoheadleftarrow", sym('↞', Rel)),
    ("rightrightarrows", sym('⇉', Rel)),
    ("boxplus", sym('⊞', Bin)),
    ("boxtimes", sym('⊠', Bin)),
    ("ltimes", sym('⋉', Bin)),
    ("rtimes", sym('⋊', Bin)),
    ("smallsetminus", sym('∖', Bin)),
    ("iint", sym('∬', AtomClass::Op)),
    ("iiint", sym('∭', AtomClass::Op)),
    ("digamma", sym('ϝ', Ord)),
    ("beth", sym('ℶ', Ord)),
    ("gimel", sym('ℷ', Ord)),
    ("daleth", sym('ℸ', Ord)),
    ("square", sym('□', Ord)),
    ("blacksquare", sym('■', Ord)),
    ("lozenge", sym('◊', Ord)),
];

static MATHTOOLS_SYMBOLS: &[(&str, Definition)] = &[
    ("coloneqq", sym('≔', Rel)),
    ("eqqcolon", sym('≕', Rel)),
    ("coloneq", sym('≔', Rel)),
    ("dblcolon", sym('∷', Rel)),
    ("xhookrightarrow", sym('↪', Rel)),
    ("mathclap", expand(1, "#1")),
];

static BRAKET_MACROS: &[(&str, Definition)] = &[
    ("bra", expand(1, "\\langle #1 \\rvert")),
    ("ket", expand(1, "\\lvert #1 \\rangle")),
    ("braket", expand(1, "\\langle #1 \\rangle")),
    ("Bra", expand(1, "\\langle #1 \\rvert")),
    ("Ket", expand(1, "\\lvert #1 \\rangle")),
    ("set", expand(1, "\\lbrace #1 \\rbrace")),
];

static PHYSICS_MACROS: &[(&str, Definition)] = &[
    ("dd", expand(0, "\\mathrm{d}")),
    ("abs", expand(1, "\\lvert #1 \\rvert")),
    ("norm", expand(1, "\\lVert #1 \\rVert")),
    ("ev", expand(1, "\\langle #1 \\rangle")),
    ("grad", expand(0, "\\nabla")),
    ("laplacian", expand(0, "\\nabla^2")),
    ("curl", expand(0, "\\nabla \\times")),
    ("divergence", expand(0, "\\nabla \\cdot")),
    ("vb", expand(1, "\\mathbf{#1}")),
    ("va", expand(1, "\\vec{#1}")),
];

static CENTERNOT_MACROS: &[(&str, Definition)] = &[("centernot", expand(1, "\\cancel{#1}"))];

static MHCHEM_MACROS: &[(&str, Definition)] = &[("ce", expand(1, "\\mathrm{#1}"))];

static GENSYMB_SYMBOLS: &[(&str, Definition)] = &[
    ("degree", sym('°', Ord)),
    ("celsius", sym('℃', Ord)),
    ("ohm", sym('Ω', Ord)),
    ("micro", sym('µ', Ord)),
    ("perthousand", sym('‰', Ord)),
];

static UPGREEK_SYMBOLS: &[(&str, Definition)] = &[
    ("upalpha", sym('α', Ord)),
    ("upbeta", sym('β', Ord)),
    ("upgamma", sym('γ', Ord)),
    ("updelta", sym('δ', Ord)),
    ("upepsilon", sym('ε', Ord)),
    ("uptheta", sym('θ', Ord)),
    ("uplambda", sym('λ', Ord)),
    ("upmu", sym('μ', Ord)),
    ("uppi", sym('π', Ord)),
    ("upsigma", sym('σ', Ord)),
    ("upphi", sym('φ', Ord)),
    ("upomega", sym('ω', Ord)),
    ("Upgamma", sym('Γ', Ord)),
    ("Updelta", sym('Δ', Ord)),
    ("Upomega", sym('Ω', Ord)),
];

static TEXTCOMP_SYMBOLS: &[(&str, Definition)] = &[
    ("textdegree", sym('°', Ord)),
    ("textbullet", sym('•', Ord)),
    ("texteuro", sym('€', Ord)),
    ("textcelsius", sym('℃', Ord)),
    ("textohm", sym('Ω', Ord)),
    ("textmu", sym('µ', Ord)),
    ("textregistered", sym('®', Ord)),
    ("texttrademark", sym('™', Ord)),
    ("textsection", sym('§', Ord)),
    ("textparagraph", sym('¶', Ord)),
];

static TEXTMACROS_SYMBOLS: &[(&str, Definition)] = &[
    ("textbar", sym('|', Ord)),
    ("textdagger", sym('†', Ord)),
    ("textdaggerdbl", sym('‡', Ord)),
    ("textellipsis", sym('…', Ord)),
    ("textquotedblleft", sym('“', Ord)),
    ("textquotedblright", sym('”', Ord)),
    ("textsterling", sym('£', Ord)),
];

static EXTPFEIL_SYMBOLS: &[(&str, Definition)] = &[
    ("xtwoheadrightarrow", sym('↠', Rel)),
    ("xtwoheadleftarrow", sym('↞', Rel)),
    ("xmapsto", sym('↦', Rel)),
    ("xlongequal", sym('＝', Rel)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_always_present() {
        let set = ExtensionSet::from_config(&[]);
        for package in BASELINE {
            assert!(set.contains(package), "missing {}", package.name());
        }
        assert_eq!(set.len(), BASELINE.len());
    }

    #[test]
    fn unknown_extensions_are_dropped() {
        let set =
            ExtensionSet::from_config(&["mathtools".to_string(), "bogus-ext".to_string()]);
        assert!(set.contains(Package::Mathtools));
        assert_eq!(set.len(), BASELINE.len() + 1);
        assert!(!set.names().contains(&"bogus-ext"));
    }

    #[test]
    fn baseline_names_do_not_resolve_as_optional() {
        assert!(Package::from_whitelisted_name("ams").is_none());
        assert!(Package::from_whitelisted_name("base").is_none());
        assert_eq!(
            Package::from_whitelisted_name("physics"),
            Some(Package::Physics)
        );
    }

    #[test]
    fn duplicate_extensions_dedupe() {
        let set = ExtensionSet::from_config(&[
            "braket".to_string(),
            "braket".to_string(),
            "cancel".to_string(),
        ]);
        assert_eq!(set.len(), BASELINE.len() + 2);
    }

    #[test]
    fn iteration_order_is_stable() {
        let a = ExtensionSet::from_config(&["physics".to_string(), "braket".to_string()]);
        let b = ExtensionSet::from_config(&["braket".to_string(), "physics".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.names(), b.names());
    }
}
