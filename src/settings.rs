//! Per-widget display settings and the partial-update merge law.
//!
//! A full [`WidgetSettings`] record travels with render requests; settings
//! updates arrive as a [`SettingsPatch`] carrying only the fields the user
//! changed. Merging is last-writer-wins per field: a later patch overrides
//! exactly the fields it names and leaves the rest alone, so applying patch
//! A then patch B equals applying `A.overlay(B)` once.

use serde::{Deserialize, Serialize};

/// A width or height: a plain pixel count or a CSS-style text value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extent {
    Number(f64),
    Text(String),
}

const OPACITY_MIN: u8 = 1;
const OPACITY_MAX: u8 = 100;

fn default_opacity() -> u8 {
    OPACITY_MAX
}

fn clamp_opacity(value: u8) -> u8 {
    value.clamp(OPACITY_MIN, OPACITY_MAX)
}

fn de_opacity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u8::deserialize(deserializer).map(clamp_opacity)
}

/// A widget instance's full display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Unset means the widget's own declared size (if any) applies.
    #[serde(default)]
    pub width: Option<Extent>,
    #[serde(default)]
    pub height: Option<Extent>,
    /// Percent, clamped to 1..=100.
    #[serde(default = "default_opacity", deserialize_with = "de_opacity")]
    pub opacity: u8,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        WidgetSettings {
            x: 0,
            y: 0,
            width: None,
            height: None,
            opacity: default_opacity(),
        }
    }
}

impl WidgetSettings {
    /// Apply a partial update; unnamed fields keep their current values.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = &patch.width {
            self.width = Some(width.clone());
        }
        if let Some(height) = &patch.height {
            self.height = Some(height.clone());
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = clamp_opacity(opacity);
        }
    }

    /// Fill unset width/height from a size the widget module declares for
    /// itself. User-set values always win.
    pub fn fill_unset_size(&mut self, width: Option<Extent>, height: Option<Extent>) {
        if self.width.is_none() {
            self.width = width;
        }
        if self.height.is_none() {
            self.height = height;
        }
    }
}

/// A partial settings update; `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<Extent>,
    pub height: Option<Extent>,
    pub opacity: Option<u8>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// Combine two patches; fields named by `later` win.
    pub fn overlay(self, later: SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            x: later.x.or(self.x),
            y: later.y.or(self.y),
            width: later.width.or(self.width),
            height: later.height.or(self.height),
            opacity: later.opacity.or(self.opacity),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn px(n: f64) -> Option<Extent> {
        Some(Extent::Number(n))
    }

    #[test]
    fn defaults() {
        let settings = WidgetSettings::default();
        assert_eq!(settings.x, 0);
        assert_eq!(settings.opacity, 100);
        assert!(settings.width.is_none());
    }

    #[test]
    fn apply_overrides_only_named_fields() {
        let mut settings = WidgetSettings {
            x: 10,
            y: 20,
            width: px(300.0),
            height: None,
            opacity: 80,
        };
        settings.apply(&SettingsPatch {
            y: Some(25),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.x, 10);
        assert_eq!(settings.y, 25);
        assert_eq!(settings.width, px(300.0));
        assert_eq!(settings.opacity, 80);
    }

    #[test]
    fn opacity_is_clamped_on_apply() {
        let mut settings = WidgetSettings::default();
        settings.apply(&SettingsPatch {
            opacity: Some(0),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.opacity, 1);
        settings.apply(&SettingsPatch {
            opacity: Some(250),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.opacity, 100);
    }

    #[test]
    fn merge_law_holds() {
        // Applying A then B equals applying A.overlay(B).
        let a = SettingsPatch {
            x: Some(1),
            width: px(100.0),
            ..SettingsPatch::default()
        };
        let b = SettingsPatch {
            x: Some(2),
            opacity: Some(50),
            ..SettingsPatch::default()
        };

        let mut sequential = WidgetSettings::default();
        sequential.apply(&a);
        sequential.apply(&b);

        let mut merged = WidgetSettings::default();
        merged.apply(&a.overlay(b));

        assert_eq!(sequential, merged);
        assert_eq!(sequential.x, 2);
        assert_eq!(sequential.width, px(100.0));
        assert_eq!(sequential.opacity, 50);
    }

    #[test]
    fn declared_size_fills_only_unset_fields() {
        let mut settings = WidgetSettings {
            width: px(300.0),
            ..WidgetSettings::default()
        };
        settings.fill_unset_size(px(120.0), Some(Extent::Text("10em".into())));
        assert_eq!(settings.width, px(300.0));
        assert_eq!(settings.height, Some(Extent::Text("10em".into())));
    }

    #[test]
    fn extent_deserializes_number_or_text() {
        let settings: WidgetSettings =
            serde_json::from_str(r#"{ "width": 120, "height": "10em" }"#).unwrap();
        assert_eq!(settings.width, px(120.0));
        assert_eq!(settings.height, Some(Extent::Text("10em".into())));
    }

    #[test]
    fn opacity_is_clamped_on_deserialize() {
        let settings: WidgetSettings = serde_json::from_str(r#"{ "opacity": 0 }"#).unwrap();
        assert_eq!(settings.opacity, 1);
    }

    #[test]
    fn empty_patch() {
        assert!(SettingsPatch::default().is_empty());
        assert!(!SettingsPatch {
            x: Some(1),
            ..SettingsPatch::default()
        }
        .is_empty());
    }
}
