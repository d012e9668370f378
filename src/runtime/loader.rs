//! Widget load cycle: bundle request, token substitution, import, shape check.
//!
//! The loader sits between the lifecycle store and two seams: a
//! [`BundleHost`] that produces bundle code carrying the placeholder tokens,
//! and a [`ModuleRuntime`] that evaluates the finished source. Substitution
//! is exact string replacement of the two tokens; nothing else in the bundle
//! is touched.

use crate::bundle::{API_TOKEN, BASE_ADDRESS_TOKEN};
use crate::runtime::module::{
    validate_shape, Component, ImportFailure, ModuleRuntime, ShapeError,
};
use crate::settings::Extent;

/// Failure from the bundle request boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HostCallError {
    pub message: String,
}

impl HostCallError {
    pub fn new(message: impl Into<String>) -> Self {
        HostCallError {
            message: message.into(),
        }
    }
}

/// The seam to whatever serves bundle requests (in-process
/// [`crate::bundle::BundleService`] here, an IPC boundary in the shell).
pub trait BundleHost: Send + Sync {
    /// Produce bundle code for `widget_id`, placeholder tokens included.
    fn bundle(
        &self,
        widget_id: &str,
    ) -> impl std::future::Future<Output = Result<String, HostCallError>> + Send;
}

/// Why a load failed, keyed to the fixed error title shown over the widget.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Bundle(#[from] HostCallError),
    #[error(transparent)]
    Import(#[from] ImportFailure),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl LoadError {
    /// The error-state title the shell renders in place of the widget.
    pub fn title(&self) -> &'static str {
        match self {
            LoadError::Bundle(_) => "Widget bundling failed",
            LoadError::Import(_) => "Widget import failed",
            LoadError::Shape(_) => "Invalid widget module",
        }
    }
}

/// A successfully loaded widget, ready for the store to commit.
#[derive(Debug, Clone)]
pub struct LoadedWidget {
    /// Final module source, tokens substituted.
    pub source: String,
    pub component: Component,
    pub declared_width: Option<Extent>,
    pub declared_height: Option<Extent>,
}

/// Runs the load cycle against the two seams.
pub struct Loader<R, B> {
    pub runtime: R,
    pub host: B,
    /// Substituted for [`BASE_ADDRESS_TOKEN`] in every bundle.
    pub base_address: String,
}

impl<R: ModuleRuntime, B: BundleHost> Loader<R, B> {
    pub fn new(runtime: R, host: B, base_address: impl Into<String>) -> Self {
        Loader {
            runtime,
            host,
            base_address: base_address.into(),
        }
    }

    /// Bundle, substitute, import, validate. `api_url` is the pseudo-URL of
    /// this widget's personalized API module.
    pub async fn load(&self, widget_id: &str, api_url: &str) -> Result<LoadedWidget, LoadError> {
        let bundled = self.host.bundle(widget_id).await?;
        let source = bundled
            .replace(API_TOKEN, api_url)
            .replace(BASE_ADDRESS_TOKEN, &self.base_address);
        tracing::debug!(widget_id, bytes = source.len(), "importing widget bundle");

        let exports = self.runtime.import(&source).await?;
        let component = validate_shape(&exports)?;
        let (declared_width, declared_height) = exports.declared_size();
        Ok(LoadedWidget {
            source,
            component,
            declared_width,
            declared_height,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubHost, StubRuntime};
    use pretty_assertions::assert_eq;

    fn loader(host: StubHost, runtime: StubRuntime) -> Loader<StubRuntime, StubHost> {
        Loader::new(runtime, host, "http://127.0.0.1:7340")
    }

    #[tokio::test]
    async fn substitutes_both_tokens() {
        let host = StubHost::with_code(format!(
            "import {{ invoke }} from \"{API_TOKEN}\";\nexport default () => \"{BASE_ADDRESS_TOKEN}\";"
        ));
        let runtime = StubRuntime::component();
        let loader = loader(host, runtime);

        let loaded = loader.load("clock", "weft://apis/1").await.unwrap();
        assert!(loaded.source.contains("from \"weft://apis/1\""));
        assert!(loaded.source.contains("http://127.0.0.1:7340"));
        assert!(!loaded.source.contains(API_TOKEN));
        assert!(!loaded.source.contains(BASE_ADDRESS_TOKEN));
    }

    #[tokio::test]
    async fn runtime_sees_substituted_source() {
        let host = StubHost::with_code(format!("export default {API_TOKEN};"));
        let runtime = StubRuntime::component();
        let loader = loader(host, runtime);

        loader.load("clock", "weft://apis/9").await.unwrap();
        let seen = loader.runtime.imported_sources();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], "export default weft://apis/9;");
    }

    #[tokio::test]
    async fn bundle_failure_has_the_bundling_title() {
        let host = StubHost::failing("entry file not found");
        let loader = loader(host, StubRuntime::component());

        let err = loader.load("clock", "weft://apis/1").await.unwrap_err();
        assert_eq!(err.title(), "Widget bundling failed");
        assert!(err.to_string().contains("entry file not found"));
    }

    #[tokio::test]
    async fn import_failure_has_the_import_title() {
        let host = StubHost::with_code("export default 1;".to_string());
        let runtime = StubRuntime::failing("SyntaxError: unexpected token");
        let loader = loader(host, runtime);

        let err = loader.load("clock", "weft://apis/1").await.unwrap_err();
        assert_eq!(err.title(), "Widget import failed");
    }

    #[tokio::test]
    async fn shape_failure_has_the_invalid_module_title() {
        let host = StubHost::with_code("export const x = 1;".to_string());
        let runtime = StubRuntime::empty_exports();
        let loader = loader(host, runtime);

        let err = loader.load("clock", "weft://apis/1").await.unwrap_err();
        assert_eq!(err.title(), "Invalid widget module");
        assert_eq!(err.to_string(), "widget module has no default export");
    }

    #[tokio::test]
    async fn declared_size_is_surfaced() {
        let host = StubHost::with_code("export default 0;".to_string());
        let runtime = StubRuntime::component_with_size(Some(120.0), None);
        let loader = loader(host, runtime);

        let loaded = loader.load("clock", "weft://apis/1").await.unwrap();
        assert_eq!(loaded.declared_width, Some(Extent::Number(120.0)));
        assert_eq!(loaded.declared_height, None);
    }
}
