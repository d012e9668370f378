//! External dependency collection.
//!
//! Walks the same resolved module graph the assembler uses and reports every
//! package the widget's source actually imports, mapped to the version
//! constraint its manifest declares. A referenced package the manifest does
//! not declare still appears, with an empty constraint, so the shell can show
//! an "undeclared dependency" hint. Declared but unreferenced packages are
//! not reported.

use std::collections::BTreeMap;
use std::path::Path;

use crate::bundle::assemble::{AssembleError, ModuleGraph};
use crate::bundle::resolve::{classify, SpecifierKind};
use crate::bundle::syntax::ExportKind;

/// The package name of an npm-style specifier: the first path segment, or
/// the first two for a scoped package.
pub fn package_name(specifier: &str) -> String {
    let mut segments = specifier.splitn(3, '/');
    let head = segments.next().unwrap_or(specifier);
    if head.starts_with('@') {
        match segments.next() {
            Some(second) => format!("{head}/{second}"),
            None => head.to_string(),
        }
    } else {
        head.to_string()
    }
}

/// Collect the external packages referenced from `entry`'s module graph.
///
/// `declared` is the manifest's dependency table; the result maps package
/// name to its declared constraint, empty when undeclared. Traversal order
/// cannot affect the result and a second collection over unchanged sources
/// returns the same map.
pub fn collect(
    entry: &Path,
    declared: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, AssembleError> {
    let graph = ModuleGraph::build(entry)?;
    let mut found = BTreeMap::new();

    for path in &graph.order {
        let module = &graph.modules[path];
        let mut note = |specifier: &str| {
            if classify(specifier) == SpecifierKind::External {
                let package = package_name(specifier);
                let constraint = declared.get(&package).cloned().unwrap_or_default();
                if constraint.is_empty() {
                    tracing::warn!(%package, "widget imports an undeclared dependency");
                }
                found.insert(package, constraint);
            }
        };
        for imp in &module.syntax.imports {
            note(&imp.specifier);
        }
        for exp in &module.syntax.exports {
            match &exp.kind {
                ExportKind::Named {
                    from: Some(spec), ..
                } => note(spec),
                ExportKind::Star { from, .. } => note(from),
                _ => {}
            }
        }
    }

    Ok(found)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn declared(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ── Package names ────────────────────────────────────────────────

    #[test]
    fn package_name_plain() {
        assert_eq!(package_name("dayjs"), "dayjs");
        assert_eq!(package_name("lodash/debounce"), "lodash");
    }

    #[test]
    fn package_name_scoped() {
        assert_eq!(package_name("@scope/pkg"), "@scope/pkg");
        assert_eq!(package_name("@scope/pkg/deep/path"), "@scope/pkg");
    }

    // ── Collection ───────────────────────────────────────────────────

    #[test]
    fn collects_declared_constraint() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            &dir,
            "index.js",
            "import dayjs from \"dayjs\";\nexport default dayjs;",
        );

        let deps = collect(&entry, &declared(&[("dayjs", "^1.11.0")])).unwrap();
        assert_eq!(deps.get("dayjs").map(String::as_str), Some("^1.11.0"));
    }

    #[test]
    fn undeclared_dependency_gets_empty_constraint() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            &dir,
            "index.js",
            "import dayjs from \"dayjs\";\nexport default dayjs;",
        );

        let deps = collect(&entry, &BTreeMap::new()).unwrap();
        assert_eq!(deps.get("dayjs").map(String::as_str), Some(""));
    }

    #[test]
    fn declared_but_unreferenced_is_not_reported() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "index.js", "export default 1;");

        let deps = collect(&entry, &declared(&[("dayjs", "^1.11.0")])).unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn host_and_local_imports_are_not_dependencies() {
        let dir = TempDir::new().unwrap();
        write(&dir, "utils.js", "export const u = 1;");
        let entry = write(
            &dir,
            "index.js",
            "import { invoke } from \"@weft/api\";\nimport { u } from \"./utils\";\nexport default u;",
        );

        let deps = collect(&entry, &BTreeMap::new()).unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn deep_imports_collapse_to_one_package() {
        let dir = TempDir::new().unwrap();
        let entry = write(
            &dir,
            "index.js",
            "import a from \"lodash/debounce\";\nimport b from \"lodash/throttle\";\nexport default [a, b];",
        );

        let deps = collect(&entry, &declared(&[("lodash", "^4")])).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps.get("lodash").map(String::as_str), Some("^4"));
    }

    #[test]
    fn transitive_imports_are_collected() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "inner.js",
            "import dayjs from \"dayjs\";\nexport const t = dayjs();",
        );
        let entry = write(
            &dir,
            "index.js",
            "import { t } from \"./inner\";\nexport default t;",
        );

        let deps = collect(&entry, &declared(&[("dayjs", "^1")])).unwrap();
        assert_eq!(deps.get("dayjs").map(String::as_str), Some("^1"));
    }

    #[test]
    fn collection_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.js",
            "import x from \"alpha\";\nexport const a = x;",
        );
        write(
            &dir,
            "b.js",
            "import y from \"beta\";\nexport const b = y;",
        );
        let entry = write(
            &dir,
            "index.js",
            "import { a } from \"./a\";\nimport { b } from \"./b\";\nexport default a + b;",
        );

        let table = declared(&[("alpha", "1"), ("beta", "2")]);
        let first = collect(&entry, &table).unwrap();
        let second = collect(&entry, &table).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.keys().collect::<Vec<_>>(), ["alpha", "beta"]);
    }
}
