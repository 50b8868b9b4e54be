//! Display colors for applications that have none yet.
//!
//! `color_for` is a pure function of the name and the colors already in
//! use, so the same application gets the same color on every poll without
//! any shared assignment cache.

use std::collections::BTreeMap;

use crate::storage::types::Application;

const PALETTE: [&str; 12] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899",
    "#14B8A6", "#F97316", "#6366F1", "#84CC16", "#06B6D4", "#A855F7",
];

// FNV-1a, stable across builds and platforms.
fn name_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Pick a color for `name`, preferring palette entries not present in
/// `existing`. Falls back to a hash-derived color once the palette is used up.
pub fn color_for<'a, I>(name: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<String> = existing.into_iter().map(|c| c.to_ascii_uppercase()).collect();
    let hash = name_hash(name);
    let offset = (hash % PALETTE.len() as u64) as usize;

    (0..PALETTE.len())
        .map(|i| PALETTE[(offset + i) % PALETTE.len()])
        .find(|candidate| !taken.iter().any(|t| t == candidate))
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{:06X}", hash & 0x00FF_FFFF))
}

/// Append an alpha channel to a `#RRGGBB` color, replacing the one of a
/// `#RRGGBBAA` color. An opacity of 0 is read as fully opaque.
pub fn with_alpha(color: &str, opacity: f64) -> String {
    let opacity = if opacity == 0.0 || opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    let base = match color.get(..7) {
        Some(rgb) if color.len() == 9 => rgb,
        _ => color,
    };
    format!("{}{:02X}", base, (opacity * 255.0).round() as u8)
}

/// Translucent fill per application, as used behind bars and line areas.
pub fn fill_colors(colors: &BTreeMap<String, String>, opacity: f64) -> BTreeMap<String, String> {
    colors
        .iter()
        .map(|(name, color)| (name.clone(), with_alpha(color, opacity)))
        .collect()
}

/// Display color per application name: the stored color when set, otherwise
/// one picked by `color_for` among the colors not yet used in `apps`.
pub fn resolve_colors(apps: &[Application]) -> BTreeMap<String, String> {
    let mut used: Vec<String> = apps
        .iter()
        .filter(|a| !a.color_hex.is_empty())
        .map(|a| a.color_hex.clone())
        .collect();
    let mut colors = BTreeMap::new();
    for app in apps {
        let color = if app.color_hex.is_empty() {
            let picked = color_for(&app.name, used.iter().map(String::as_str));
            used.push(picked.clone());
            picked
        } else {
            app.color_hex.clone()
        };
        colors.insert(app.name.clone(), color);
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, color_hex: &str) -> Application {
        Application {
            id: 0,
            name: name.to_string(),
            color_hex: color_hex.to_string(),
        }
    }

    #[test]
    fn resolve_keeps_stored_and_fills_missing() {
        let apps = vec![app("browser", ""), app("mail", "#000000"), app("shell", "")];
        let colors = resolve_colors(&apps);
        assert_eq!(colors["mail"], "#000000");
        assert_ne!(colors["browser"], colors["shell"]);
        assert!(colors.values().all(|c| c.starts_with('#')));
        assert_eq!(colors, resolve_colors(&apps));
    }

    #[test]
    fn same_name_same_color() {
        let first = color_for("browser", Vec::<&str>::new());
        assert_eq!(first, color_for("browser", Vec::<&str>::new()));
        assert!(PALETTE.contains(&first.as_str()));
    }

    #[test]
    fn skips_colors_in_use() {
        let taken = color_for("browser", Vec::<&str>::new());
        let next = color_for("browser", [taken.to_lowercase().as_str()]);
        assert_ne!(taken, next);
    }

    #[test]
    fn falls_back_when_palette_exhausted() {
        let color = color_for("browser", PALETTE);
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
        assert!(!PALETTE.contains(&color.as_str()));
    }

    #[test]
    fn alpha_suffix() {
        assert_eq!(with_alpha("#112233", 0.5), "#11223380");
        assert_eq!(with_alpha("#112233", 0.0), "#112233FF");
        assert_eq!(with_alpha("#112233", 2.0), "#112233FF");
        assert_eq!(with_alpha("#112233", 0.01), "#11223303");
        assert_eq!(with_alpha("#112233CC", 0.5), "#11223380");
    }
}
