use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::types::FormSettings;

const DEFAULT_PRIMARY: &str = "#6366f1";
const DEFAULT_INPUT_BORDER_COLOR: &str = "#d1d5db";

/// CSS custom properties for one form, scoped by `scope` (`form-<id>`) so the
/// rendering layer can attach them to that form's root element only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeTokens {
    pub scope: String,
    pub css_vars: BTreeMap<String, String>,
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let ch = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).ok();
            Some((ch(0)?, ch(1)?, ch(2)?))
        }
        _ => None,
    }
}

fn color_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(c) if parse_hex(c).is_some() => c.to_lowercase(),
        _ => fallback.to_string(),
    }
}

fn px_or(value: Option<&str>, fallback: u32) -> String {
    let n = value
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0);
    match n {
        Some(n) => format!("{n}px"),
        None => format!("{fallback}px"),
    }
}

/// Derive the theme from a form's settings. Pure; values that are not a hex
/// colour or a non-negative number fall back to the defaults so nothing
/// user-supplied reaches a stylesheet verbatim.
pub fn compute_theme_tokens(form_id: Uuid, settings: &FormSettings) -> ThemeTokens {
    let primary = color_or(settings.primary_color.as_deref(), DEFAULT_PRIMARY);
    let (r, g, b) = parse_hex(&primary).unwrap_or((0x63, 0x66, 0xf1));
    let hover = format!(
        "#{:02x}{:02x}{:02x}",
        r.saturating_sub(20),
        g.saturating_sub(20),
        b.saturating_sub(20)
    );

    let mut vars = BTreeMap::new();
    vars.insert("--form-primary-focus".to_string(), format!("rgba({r}, {g}, {b}, 0.1)"));
    vars.insert("--form-primary-hover".to_string(), hover);
    vars.insert(
        "--form-input-radius".to_string(),
        px_or(settings.input_border_radius.as_deref(), 6),
    );
    vars.insert(
        "--form-input-border-color".to_string(),
        color_or(settings.input_border_color.as_deref(), DEFAULT_INPUT_BORDER_COLOR),
    );
    vars.insert(
        "--form-input-border-width".to_string(),
        px_or(settings.input_border_width.as_deref(), 1),
    );
    vars.insert("--form-input-height".to_string(), px_or(settings.input_height.as_deref(), 40));
    vars.insert(
        "--form-button-radius".to_string(),
        px_or(settings.button_border_radius.as_deref(), 6),
    );
    vars.insert(
        "--form-button-border-color".to_string(),
        color_or(settings.button_border_color.as_deref(), &primary),
    );
    vars.insert(
        "--form-button-border-width".to_string(),
        px_or(settings.button_border_width.as_deref(), 0),
    );
    vars.insert("--form-button-height".to_string(), px_or(settings.button_height.as_deref(), 44));
    vars.insert("--form-primary-color".to_string(), primary);

    ThemeTokens {
        scope: format!("form-{form_id}"),
        css_vars: vars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_color_drives_hover_and_focus() {
        let settings = FormSettings {
            primary_color: Some("#601033".into()),
            ..FormSettings::default()
        };
        let id = Uuid::nil();
        let theme = compute_theme_tokens(id, &settings);
        assert_eq!(theme.scope, format!("form-{id}"));
        assert_eq!(theme.css_vars["--form-primary-color"], "#601033");
        assert_eq!(theme.css_vars["--form-primary-hover"], "#4c001f");
        assert_eq!(theme.css_vars["--form-primary-focus"], "rgba(96, 16, 51, 0.1)");
        assert_eq!(theme.css_vars["--form-button-border-color"], "#601033");
    }

    #[test]
    fn defaults_when_unset() {
        let theme = compute_theme_tokens(Uuid::nil(), &FormSettings::default());
        assert_eq!(theme.css_vars["--form-primary-color"], DEFAULT_PRIMARY);
        assert_eq!(theme.css_vars["--form-input-radius"], "6px");
        assert_eq!(theme.css_vars["--form-input-height"], "40px");
        assert_eq!(theme.css_vars["--form-button-border-width"], "0px");
        assert_eq!(theme.css_vars["--form-input-border-color"], DEFAULT_INPUT_BORDER_COLOR);
    }

    #[test]
    fn hostile_values_fall_back() {
        let settings = FormSettings {
            primary_color: Some("red; } body { display:none".into()),
            input_border_radius: Some("8px !important".into()),
            input_height: Some("48".into()),
            ..FormSettings::default()
        };
        let theme = compute_theme_tokens(Uuid::nil(), &settings);
        assert_eq!(theme.css_vars["--form-primary-color"], DEFAULT_PRIMARY);
        assert_eq!(theme.css_vars["--form-input-radius"], "6px");
        assert_eq!(theme.css_vars["--form-input-height"], "48px");
    }

    #[test]
    fn short_hex_is_expanded_for_channels() {
        assert_eq!(parse_hex("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_hex("#12"), None);
        assert_eq!(parse_hex("123456"), None);
    }
}
