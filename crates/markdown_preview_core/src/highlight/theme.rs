use super::CLASS_STYLE;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::css_for_theme_with_class_style;

const FALLBACK_THEMES: &[&str] = &["InspiredGitHub", "Solarized (light)", "base16-ocean.light"];

fn pick_theme<'a>(theme_set: &'a ThemeSet, name: &str) -> Option<&'a Theme> {
    theme_set
        .themes
        .get(name)
        .or_else(|| {
            tracing::warn!(theme = name, "Unknown highlight theme, using the default");
            FALLBACK_THEMES
                .iter()
                .find_map(|fallback| theme_set.themes.get(*fallback))
        })
        .or_else(|| theme_set.themes.values().next())
}

/// Stylesheet coloring the token classes emitted by the highlighter.
///
/// Returns an empty stylesheet if the theme cannot be converted; code blocks
/// are then shown uncolored.
pub fn theme_css(theme_name: &str) -> String {
    let theme_set = ThemeSet::load_defaults();
    let Some(theme) = pick_theme(&theme_set, theme_name) else {
        return String::new();
    };
    match css_for_theme_with_class_style(theme, CLASS_STYLE) {
        Ok(css) => css,
        Err(err) => {
            tracing::warn!(theme = theme_name, ?err, "Failed to generate theme css");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_css_uses_class_prefix() {
        let css = theme_css("InspiredGitHub");
        assert!(css.contains(".hl-"));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        assert_eq!(theme_css("no such theme"), theme_css("InspiredGitHub"));
    }
}
