//! Display colour attached to every profile.

use serde::{Deserialize, Serialize};

/// Colours offered by the profile creation surface, as (id, background).
pub const PALETTE: &[(&str, &str)] = &[
    ("color-1", "#1e88e5"),
    ("color-2", "#43a047"),
    ("color-3", "#e53935"),
    ("color-4", "#8e24aa"),
    ("color-5", "#fb8c00"),
    ("color-6", "#00897b"),
];

const DEFAULT_FOREGROUND: &str = "white";

/// Display-colour descriptor `{id, color, background}`.
///
/// The foreground is stored under the key `color` on the wire, which is
/// what existing clients read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileColor {
    pub id: String,
    #[serde(rename = "color", alias = "foreground")]
    pub foreground: String,
    pub background: String,
}

impl ProfileColor {
    pub fn new(
        id: impl Into<String>,
        foreground: impl Into<String>,
        background: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            foreground: foreground.into(),
            background: background.into(),
        }
    }

    /// Palette entry at `index`, wrapping around.
    pub fn from_palette(index: usize) -> Self {
        let (id, background) = PALETTE[index % PALETTE.len()];
        Self::new(id, DEFAULT_FOREGROUND, background)
    }
}

impl Default for ProfileColor {
    fn default() -> Self {
        Self::from_palette(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_first_palette_entry() {
        let color = ProfileColor::default();
        assert_eq!(color.id, "color-1");
        assert_eq!(color.foreground, "white");
        assert_eq!(color.background, "#1e88e5");
    }

    #[test]
    fn palette_index_wraps() {
        assert_eq!(ProfileColor::from_palette(PALETTE.len()), ProfileColor::default());
    }

    #[test]
    fn foreground_serializes_under_color_key() {
        let json = serde_json::to_value(ProfileColor::default()).unwrap();
        assert_eq!(json["color"], "white");
        assert!(json.get("foreground").is_none());
    }

    #[test]
    fn foreground_alias_is_accepted() {
        let color: ProfileColor = serde_json::from_str(
            r##"{"id": "x", "foreground": "black", "background": "#fff"}"##,
        )
        .unwrap();
        assert_eq!(color.foreground, "black");
    }
}
