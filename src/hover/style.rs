//! Graphics post-processing: theme and scale injection.

use tracing::debug;

use crate::config::RenderOptions;

/// Injects a `<style>` block right after the graphics' `<defs>` opening tag,
/// setting the font size to `scale * 100%` and the foreground colour for the
/// active theme. Markup without a `<defs>` tag is returned unchanged — a
/// skipped injection degrades the styling, not the render.
pub fn apply_theme(markup: &str, opts: &RenderOptions) -> String {
    let css = format!(
        "svg {{font-size: {}%;}} * {{ color: {} }}",
        100.0 * opts.scale,
        opts.theme.foreground()
    );
    if !markup.contains("<defs>") {
        debug!(
            target: "texhover::hover",
            "no <defs> injection point; returning unstyled markup"
        );
        return markup.to_string();
    }
    markup.replacen("<defs>", &format!("<defs><style>{css}</style>"), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;

    fn options(scale: f64, theme: Theme) -> RenderOptions {
        RenderOptions { scale, theme }
    }

    #[test]
    fn light_theme_injects_black() {
        let styled = apply_theme("<svg><defs></defs></svg>", &options(1.0, Theme::Light));
        assert_eq!(
            styled,
            "<svg><defs><style>svg {font-size: 100%;} * { color: #000000 }</style></defs></svg>"
        );
    }

    #[test]
    fn dark_theme_injects_white() {
        let styled = apply_theme("<svg><defs></defs></svg>", &options(1.0, Theme::Dark));
        assert!(styled.contains("color: #ffffff"));
        assert!(!styled.contains("#000000"));
    }

    #[test]
    fn scale_multiplies_the_percentage() {
        let styled = apply_theme("<svg><defs></defs></svg>", &options(1.5, Theme::Light));
        assert!(styled.contains("font-size: 150%;"));
        let styled = apply_theme("<svg><defs></defs></svg>", &options(0.875, Theme::Light));
        assert!(styled.contains("font-size: 87.5%;"));
    }

    #[test]
    fn missing_defs_returns_markup_unchanged() {
        let markup = "<svg><g></g></svg>";
        assert_eq!(apply_theme(markup, &options(1.0, Theme::Light)), markup);
    }

    #[test]
    fn only_the_first_defs_is_patched() {
        let styled = apply_theme(
            "<svg><defs></defs><defs></defs></svg>",
            &options(1.0, Theme::Light),
        );
        assert_eq!(styled.matches("<style>").count(), 1);
    }
}
