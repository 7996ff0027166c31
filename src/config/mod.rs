//! Runtime settings: extension allow-list, rendering scale, colour theme.
//!
//! Storage and change notification belong to the host. This module holds the
//! process-wide current value, sanitises incoming updates, and derives the
//! per-call [`RenderOptions`] snapshot the pipeline reads. Applying an update
//! also swaps the active typesetting engine so the new extension set takes
//! effect for subsequent renders.

use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hover::adaptor;
use crate::typeset::ExtensionSet;
use crate::util::{read_lock, write_lock};

const DEFAULT_SCALE: f64 = 1.0;

/// Hover preview colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Foreground colour injected into rendered previews. Light maps to pure
    /// black, dark to pure white; no other values exist.
    pub fn foreground(self) -> &'static str {
        match self {
            Theme::Light => "#000000",
            Theme::Dark => "#ffffff",
        }
    }
}

/// Host-facing settings, as read from whatever store the editor uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Optional extension package names; entries outside the whitelist are
    /// silently dropped.
    pub extensions: Vec<String>,
    /// Positive rendering scale; `1.0` renders at 100%.
    pub scale: f64,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            scale: DEFAULT_SCALE,
            theme: Theme::default(),
        }
    }
}

impl Settings {
    fn sanitized(mut self) -> Self {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            warn!(
                target: "texhover::config",
                scale = self.scale,
                "ignoring non-positive render scale"
            );
            self.scale = DEFAULT_SCALE;
        }
        self
    }
}

/// Per-call rendering options, snapshotted once so a single render never
/// observes a mid-call settings change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub scale: f64,
    pub theme: Theme,
}

static SETTINGS: Lazy<RwLock<Settings>> = Lazy::new(|| RwLock::new(Settings::default()));

/// Applies new settings: sanitise, store, and rebuild the typesetting engine
/// from the effective extension set (baseline plus whitelisted extras).
pub fn update(settings: Settings) {
    let settings = settings.sanitized();
    let extensions = ExtensionSet::from_config(&settings.extensions);
    debug!(
        target: "texhover::config",
        extensions = ?extensions.names(),
        scale = settings.scale,
        theme = ?settings.theme,
        "applying settings"
    );
    *write_lock(&SETTINGS) = settings;
    adaptor::reconfigure(&extensions);
}

/// Snapshot of the options a single render call should use.
pub fn render_options() -> RenderOptions {
    let settings = read_lock(&SETTINGS);
    RenderOptions {
        scale: settings.scale,
        theme: settings.theme,
    }
}

#[cfg(test)]
mod tests;
