use pretty_assertions::assert_eq;
use serial_test::serial;

use super::*;

#[test]
fn defaults_are_light_at_full_scale() {
    let settings = Settings::default();
    assert_eq!(settings.scale, 1.0);
    assert_eq!(settings.theme, Theme::Light);
    assert!(settings.extensions.is_empty());
}

#[test]
fn theme_foregrounds_are_pure_black_and_white() {
    assert_eq!(Theme::Light.foreground(), "#000000");
    assert_eq!(Theme::Dark.foreground(), "#ffffff");
}

#[test]
fn settings_deserialise_from_host_json() {
    let settings: Settings = serde_json::from_str(
        r#"{"extensions": ["mathtools", "bogus-ext"], "scale": 1.5, "theme": "dark"}"#,
    )
    .unwrap();
    assert_eq!(settings.scale, 1.5);
    assert_eq!(settings.theme, Theme::Dark);
    assert_eq!(settings.extensions, vec!["mathtools", "bogus-ext"]);
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn sanitise_rejects_non_positive_scale() {
    let settings = Settings {
        scale: 0.0,
        ..Settings::default()
    }
    .sanitized();
    assert_eq!(settings.scale, 1.0);

    let settings = Settings {
        scale: f64::NAN,
        ..Settings::default()
    }
    .sanitized();
    assert_eq!(settings.scale, 1.0);

    let settings = Settings {
        scale: 0.5,
        ..Settings::default()
    }
    .sanitized();
    assert_eq!(settings.scale, 0.5);
}

#[test]
#[serial]
fn update_changes_subsequent_snapshots() {
    update(Settings {
        scale: 2.0,
        theme: Theme::Dark,
        ..Settings::default()
    });
    let options = render_options();
    assert_eq!(options.scale, 2.0);
    assert_eq!(options.theme, Theme::Dark);

    update(Settings::default());
    let options = render_options();
    assert_eq!(options.scale, 1.0);
    assert_eq!(options.theme, Theme::Light);
}

#[test]
#[serial]
fn update_with_bad_scale_keeps_rendering_possible() {
    update(Settings {
        scale: -3.0,
        ..Settings::default()
    });
    assert_eq!(render_options().scale, 1.0);
    update(Settings::default());
}
