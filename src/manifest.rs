//! Widget manifest (`widget.json`) parsing.
//!
//! Every widget directory carries a manifest naming the widget, its entry
//! file, and its declared package dependencies. A manifest that cannot be
//! read or parsed does not fail the pipeline; it yields
//! [`WidgetConfig::Invalid`] with a human-readable message, so the shell can
//! show the broken widget instead of silently dropping it. An invalid widget
//! is never bundled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name of the manifest inside a widget directory.
pub const MANIFEST_FILE: &str = "widget.json";

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: String,
    entry: PathBuf,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// A widget's parsed configuration. Replaced wholesale whenever the widget
/// directory is rescanned; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetConfig {
    Valid {
        name: String,
        /// Entry file, relative to the widget directory.
        entry: PathBuf,
        /// Declared package name → version constraint.
        dependencies: BTreeMap<String, String>,
    },
    /// The manifest was missing or malformed; `message` says why, naming the
    /// missing field where serde can.
    Invalid { message: String },
}

impl WidgetConfig {
    /// Parse manifest text. Never fails; malformed input becomes `Invalid`.
    pub fn parse(text: &str) -> WidgetConfig {
        match serde_json::from_str::<RawManifest>(text) {
            Ok(raw) => WidgetConfig::Valid {
                name: raw.name,
                entry: raw.entry,
                dependencies: raw.dependencies,
            },
            Err(err) => WidgetConfig::Invalid {
                message: format!("invalid {MANIFEST_FILE}: {err}"),
            },
        }
    }

    /// Load `widget.json` from a widget directory.
    pub fn load(widget_dir: &Path) -> WidgetConfig {
        let path = widget_dir.join(MANIFEST_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read widget manifest");
                WidgetConfig::Invalid {
                    message: format!("cannot read {MANIFEST_FILE}: {err}"),
                }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, WidgetConfig::Valid { .. })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
