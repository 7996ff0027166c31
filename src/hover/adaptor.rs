//! The conversion adaptor: process-wide engine state.
//!
//! One engine lives in a shared slot for the whole process; rebuilding it
//! per call would re-compile the command tables every hover. Reconfiguration
//! replaces the slot's contents wholesale — never mutates the engine in
//! place — so a conversion that already captured its `Arc` finishes on the
//! engine it started with, while later calls observe the replacement. The
//! font-metrics catalog (the fixed rendering context) is process-lifetime
//! static state and is never rebuilt; it holds no per-conversion data.

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::typeset::{ConvertOptions, Engine, ExtensionSet, Svg, TypesetError};
use crate::util::{read_lock, write_lock};

static ACTIVE_ENGINE: Lazy<RwLock<Arc<Engine>>> =
    Lazy::new(|| RwLock::new(Arc::new(Engine::build(&ExtensionSet::baseline()))));

/// Builds a fresh engine for the given set and atomically swaps it in.
pub(crate) fn reconfigure(extensions: &ExtensionSet) {
    let engine = Arc::new(Engine::build(extensions));
    *write_lock(&ACTIVE_ENGINE) = engine;
    debug!(
        target: "texhover::hover",
        extensions = ?extensions.names(),
        "typesetting engine replaced"
    );
}

/// Converts math source with the currently active engine and the fixed hover
/// parameters. The engine reference is captured up front, so the conversion
/// is unaffected by a concurrent reconfigure.
pub(crate) fn convert(math: &str) -> Result<Svg, TypesetError> {
    let engine = Arc::clone(&read_lock(&ACTIVE_ENGINE));
    engine.convert(math, &ConvertOptions::hover())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::typeset::Package;

    #[test]
    #[serial]
    fn reconfigure_gates_optional_commands() {
        reconfigure(&ExtensionSet::baseline());
        // Without mathtools the command survives only as literal fallback
        // text, which renders the backslash glyph.
        let baseline = convert("x \\coloneqq y").unwrap();
        assert!(baseline.to_markup().contains('\\'));

        reconfigure(&ExtensionSet::from_config(&["mathtools".to_string()]));
        let extended = convert("x \\coloneqq y").unwrap();
        assert!(extended.to_markup().contains('≔'));

        reconfigure(&ExtensionSet::baseline());
    }

    #[test]
    #[serial]
    fn reconfigure_is_idempotent() {
        let set = ExtensionSet::from_config(&["physics".to_string()]);
        reconfigure(&set);
        let first = convert("\\abs{x}").unwrap();
        reconfigure(&set);
        let second = convert("\\abs{x}").unwrap();
        assert_eq!(first.to_markup(), second.to_markup());
        reconfigure(&ExtensionSet::baseline());
    }

    #[test]
    #[serial]
    fn conversions_capture_the_engine_they_started_with() {
        reconfigure(&ExtensionSet::from_packages([
            Package::Base,
            Package::Ams,
            Package::Noerrors,
            Package::Noundefined,
        ]));
        let engine = Arc::clone(&read_lock(&ACTIVE_ENGINE));
        reconfigure(&ExtensionSet::baseline());
        // The captured engine still reflects the set it was built from.
        assert!(!engine.extensions().contains(Package::Newcommand));
        assert!(
            read_lock(&ACTIVE_ENGINE)
                .extensions()
                .contains(Package::Newcommand)
        );
        reconfigure(&ExtensionSet::baseline());
    }
}
