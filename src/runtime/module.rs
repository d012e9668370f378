//! Module exports model and shape validation.
//!
//! [`ModuleRuntime`] is the seam to whatever actually evaluates a bundle (a
//! webview in production, [`crate::testing::StubRuntime`] in tests). It
//! reports what the module exported as an [`ModuleExports`] value tree, and
//! [`validate_shape`] decides whether those exports amount to a renderable
//! widget.
//!
//! A valid widget module either default-exports something invocable, or
//! default-exports an object whose `render` member is invocable. Everything
//! else maps to exactly one of the three [`ShapeError`] diagnostics.

use std::collections::BTreeMap;

use crate::settings::Extent;

// ---------------------------------------------------------------------------
// Exports model
// ---------------------------------------------------------------------------

/// One exported value, as observed in the module realm.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    /// A function or component reference.
    Invocable,
    Object(BTreeMap<String, ExportValue>),
    /// A plain data value.
    Scalar(serde_json::Value),
}

/// Everything a module exported, keyed by export name (`default` included).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    pub entries: BTreeMap<String, ExportValue>,
}

impl ModuleExports {
    /// The width/height the module declares for itself via scalar `width` /
    /// `height` exports, if any.
    pub fn declared_size(&self) -> (Option<Extent>, Option<Extent>) {
        (self.scalar_extent("width"), self.scalar_extent("height"))
    }

    fn scalar_extent(&self, name: &str) -> Option<Extent> {
        match self.entries.get(name)? {
            ExportValue::Scalar(serde_json::Value::Number(n)) => {
                n.as_f64().map(Extent::Number)
            }
            ExportValue::Scalar(serde_json::Value::String(s)) => {
                Some(Extent::Text(s.clone()))
            }
            _ => None,
        }
    }
}

/// Failure raised by the runtime while evaluating a bundle.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ImportFailure {
    pub message: String,
}

impl ImportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        ImportFailure {
            message: message.into(),
        }
    }
}

/// The seam to the module evaluation environment.
pub trait ModuleRuntime: Send + Sync {
    /// Evaluate `source` as a module and report its exports.
    fn import(
        &self,
        source: &str,
    ) -> impl std::future::Future<Output = Result<ModuleExports, ImportFailure>> + Send;
}

// ---------------------------------------------------------------------------
// Shape validation
// ---------------------------------------------------------------------------

/// The validated renderable entry point of a widget module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// The default export is itself invocable.
    Direct,
    /// The default export is an object; its `render` member is invocable.
    RenderMember,
}

/// Why a module's exports are not a renderable widget. The messages are
/// fixed diagnostics shown to the user in place of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("widget module has no default export")]
    MissingDefault,
    #[error("widget default export has no renderable entry point")]
    MissingEntryPoint,
    #[error("widget entry point has the wrong type")]
    WrongType,
}

/// Decide whether `exports` amount to a renderable widget.
pub fn validate_shape(exports: &ModuleExports) -> Result<Component, ShapeError> {
    match exports.entries.get("default") {
        None => Err(ShapeError::MissingDefault),
        Some(ExportValue::Invocable) => Ok(Component::Direct),
        Some(ExportValue::Object(members)) => match members.get("render") {
            Some(ExportValue::Invocable) => Ok(Component::RenderMember),
            Some(_) => Err(ShapeError::WrongType),
            None => Err(ShapeError::MissingEntryPoint),
        },
        Some(ExportValue::Scalar(_)) => Err(ShapeError::WrongType),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn exports(entries: Vec<(&str, ExportValue)>) -> ModuleExports {
        ModuleExports {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn object(members: Vec<(&str, ExportValue)>) -> ExportValue {
        ExportValue::Object(
            members
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    // ── Accepted shapes ──────────────────────────────────────────────

    #[test]
    fn invocable_default_is_direct() {
        let m = exports(vec![("default", ExportValue::Invocable)]);
        assert_eq!(validate_shape(&m), Ok(Component::Direct));
    }

    #[test]
    fn object_with_invocable_render_member() {
        let m = exports(vec![("default", object(vec![("render", ExportValue::Invocable)]))]);
        assert_eq!(validate_shape(&m), Ok(Component::RenderMember));
    }

    #[test]
    fn extra_members_do_not_matter() {
        let m = exports(vec![(
            "default",
            object(vec![
                ("render", ExportValue::Invocable),
                ("title", ExportValue::Scalar(json!("clock"))),
            ]),
        )]);
        assert_eq!(validate_shape(&m), Ok(Component::RenderMember));
    }

    // ── Rejected shapes, one diagnostic each ─────────────────────────

    #[test]
    fn no_default_export() {
        let m = exports(vec![("helper", ExportValue::Invocable)]);
        assert_eq!(validate_shape(&m), Err(ShapeError::MissingDefault));
        assert_eq!(
            ShapeError::MissingDefault.to_string(),
            "widget module has no default export"
        );
    }

    #[test]
    fn object_without_render_member() {
        let m = exports(vec![("default", object(vec![("mount", ExportValue::Invocable)]))]);
        assert_eq!(validate_shape(&m), Err(ShapeError::MissingEntryPoint));
    }

    #[test]
    fn render_member_is_not_invocable() {
        let m = exports(vec![(
            "default",
            object(vec![("render", ExportValue::Scalar(json!("soon")))]),
        )]);
        assert_eq!(validate_shape(&m), Err(ShapeError::WrongType));
    }

    #[test]
    fn scalar_default_is_wrong_type() {
        let m = exports(vec![("default", ExportValue::Scalar(json!(42)))]);
        assert_eq!(validate_shape(&m), Err(ShapeError::WrongType));
    }

    #[test]
    fn empty_exports() {
        assert_eq!(
            validate_shape(&ModuleExports::default()),
            Err(ShapeError::MissingDefault)
        );
    }

    // ── Declared size ────────────────────────────────────────────────

    #[test]
    fn declared_size_from_scalar_exports() {
        let m = exports(vec![
            ("default", ExportValue::Invocable),
            ("width", ExportValue::Scalar(json!(120))),
            ("height", ExportValue::Scalar(json!("10em"))),
        ]);
        let (w, h) = m.declared_size();
        assert_eq!(w, Some(Extent::Number(120.0)));
        assert_eq!(h, Some(Extent::Text("10em".into())));
    }

    #[test]
    fn non_scalar_size_exports_are_ignored() {
        let m = exports(vec![
            ("default", ExportValue::Invocable),
            ("width", ExportValue::Invocable),
        ]);
        assert_eq!(m.declared_size(), (None, None));
    }
}
