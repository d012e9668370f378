//! Widget bundling pipeline.
//!
//! Turns a widget's on-disk source tree into a single executable module
//! string, in four steps: resolve local imports ([`resolve`]), transform each
//! file to plain script ([`transform`], [`markup`]), collect external
//! packages ([`deps`]), and emit the bundle ([`assemble`]).
//!
//! Bundles are produced on demand and never cached across runs. Two
//! placeholder tokens survive into the output and are substituted by the
//! loader right before import: [`API_TOKEN`] stands for the widget's
//! personalized API module URL, [`BASE_ADDRESS_TOKEN`] for the host's base
//! address.

pub mod assemble;
pub mod deps;
pub mod lexer;
pub mod markup;
pub mod resolve;
pub mod syntax;
pub mod transform;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::manifest::WidgetConfig;
use crate::runtime::loader::{BundleHost, HostCallError};

pub use assemble::{assemble, AssembleError, ModuleGraph};
pub use deps::{collect as collect_dependencies, package_name};
pub use resolve::{classify, resolve, SpecifierKind, API_MODULE, HOST_PREFIX, SOURCE_EXTENSIONS};
pub use transform::{transform, SourceKind, TransformError};

/// Placeholder for the widget's personalized API module URL. Substituted by
/// the loader via exact string replacement.
pub const API_TOKEN: &str = "__WEFT_WIDGET_API__";

/// Placeholder for the host's base address.
pub const BASE_ADDRESS_TOKEN: &str = "__WEFT_BASE_ADDRESS__";

// ---------------------------------------------------------------------------
// Bundle service
// ---------------------------------------------------------------------------

/// Outcome of one bundle request. Transient; consumed immediately by the
/// requesting loader and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutput {
    Success { code: String },
    Failure { message: String },
}

/// In-process bundle request boundary: maps widget ids to directories under
/// one root, checks the manifest, and runs the assembler.
pub struct BundleService {
    widgets_root: PathBuf,
}

impl BundleService {
    pub fn new(widgets_root: impl Into<PathBuf>) -> Self {
        BundleService {
            widgets_root: widgets_root.into(),
        }
    }

    pub fn widget_dir(&self, widget_id: &str) -> PathBuf {
        self.widgets_root.join(widget_id)
    }

    /// Bundle one widget. An invalid manifest refuses the bundle outright;
    /// the widget is shown in its error state instead.
    pub fn bundle_widget(&self, widget_id: &str) -> BundleOutput {
        let dir = self.widget_dir(widget_id);
        match WidgetConfig::load(&dir) {
            WidgetConfig::Invalid { message } => {
                tracing::warn!(widget_id, %message, "refusing to bundle invalid widget");
                BundleOutput::Failure { message }
            }
            WidgetConfig::Valid { entry, .. } => match assemble(&dir.join(entry)) {
                Ok(code) => BundleOutput::Success { code },
                Err(err) => {
                    tracing::warn!(widget_id, %err, "bundling failed");
                    BundleOutput::Failure {
                        message: err.to_string(),
                    }
                }
            },
        }
    }

    /// The external packages a widget references, with declared constraints.
    pub fn dependencies(&self, widget_id: &str) -> Result<BTreeMap<String, String>, HostCallError> {
        let dir = self.widget_dir(widget_id);
        match WidgetConfig::load(&dir) {
            WidgetConfig::Invalid { message } => Err(HostCallError::new(message)),
            WidgetConfig::Valid {
                entry,
                dependencies,
                ..
            } => collect_dependencies(&dir.join(entry), &dependencies)
                .map_err(|err| HostCallError::new(err.to_string())),
        }
    }
}

impl BundleHost for BundleService {
    async fn bundle(&self, widget_id: &str) -> Result<String, HostCallError> {
        match self.bundle_widget(widget_id) {
            BundleOutput::Success { code } => Ok(code),
            BundleOutput::Failure { message } => Err(HostCallError::new(message)),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_FILE;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn widget(root: &TempDir, id: &str, manifest: &str, files: &[(&str, &str)]) {
        let dir = root.path().join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        for (rel, content) in files {
            let path = dir.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn bundles_a_valid_widget() {
        let root = TempDir::new().unwrap();
        widget(
            &root,
            "clock",
            r#"{ "name": "clock", "entry": "index.js" }"#,
            &[("index.js", "export default function Clock() {}")],
        );

        let service = BundleService::new(root.path());
        match service.bundle_widget("clock") {
            BundleOutput::Success { code } => {
                assert!(code.contains("export default function Clock() {}"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_manifest_refuses_the_bundle() {
        let root = TempDir::new().unwrap();
        widget(
            &root,
            "broken",
            r#"{ "name": "broken" }"#,
            &[("index.js", "export default 1;")],
        );

        let service = BundleService::new(root.path());
        match service.bundle_widget("broken") {
            BundleOutput::Failure { message } => assert!(message.contains("entry"), "{message}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_entry_file_is_a_failure_with_candidates() {
        let root = TempDir::new().unwrap();
        widget(
            &root,
            "ghost",
            r#"{ "name": "ghost", "entry": "index.js" }"#,
            &[],
        );

        let service = BundleService::new(root.path());
        match service.bundle_widget("ghost") {
            BundleOutput::Failure { message } => {
                assert!(message.contains("index.js"), "{message}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn dependencies_come_from_graph_and_manifest() {
        let root = TempDir::new().unwrap();
        widget(
            &root,
            "clock",
            r#"{ "name": "clock", "entry": "index.js", "dependencies": { "dayjs": "^1.11.0" } }"#,
            &[(
                "index.js",
                "import dayjs from \"dayjs\";\nimport lp from \"left-pad\";\nexport default () => lp(dayjs());",
            )],
        );

        let service = BundleService::new(root.path());
        let deps = service.dependencies("clock").unwrap();
        assert_eq!(deps.get("dayjs").map(String::as_str), Some("^1.11.0"));
        // Referenced but undeclared: surfaced with an empty constraint.
        assert_eq!(deps.get("left-pad").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn host_boundary_collapses_failures() {
        use crate::runtime::loader::BundleHost;

        let root = TempDir::new().unwrap();
        let service = BundleService::new(root.path());
        let err = service.bundle("absent").await.unwrap_err();
        assert!(err.to_string().contains(MANIFEST_FILE), "{err}");
    }
}
