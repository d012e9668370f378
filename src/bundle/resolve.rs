//! Local module resolution: specifier + importing file → concrete file.
//!
//! Resolution is pure apart from read-only existence probes. The extension
//! priority order in [`SOURCE_EXTENSIONS`] is a contract with widget authors:
//! when an extension-less specifier is ambiguous (`./utils` with both
//! `utils.js` and `utils.jsx` on disk), the first extension in the order wins,
//! every time, regardless of prior resolutions.

use std::path::{Path, PathBuf};

/// Closed set of widget source extensions, in resolution priority order.
///
/// Probed first as `<specifier>.<ext>`, then as `<specifier>/index.<ext>`,
/// in this order within each form. Changing this order changes which file an
/// ambiguous specifier resolves to; treat it as public behavior.
pub const SOURCE_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

/// Reserved specifier prefix for capability modules the host injects at load
/// time. These are never resolved on disk and never bundled inline.
pub const HOST_PREFIX: &str = "@weft/";

/// The host-provided personalized API module.
pub const API_MODULE: &str = "@weft/api";

// ---------------------------------------------------------------------------
// Specifier classification
// ---------------------------------------------------------------------------

/// Where an import specifier points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `./` or `../` — part of the widget's own source tree.
    Local,
    /// `@weft/...` — injected by the host at load time.
    HostProvided,
    /// Anything else — an npm-style package dependency.
    External,
}

/// Classify a specifier without touching the filesystem.
pub fn classify(specifier: &str) -> SpecifierKind {
    if specifier.starts_with("./") || specifier.starts_with("../") {
        SpecifierKind::Local
    } else if specifier.starts_with(HOST_PREFIX) {
        SpecifierKind::HostProvided
    } else {
        SpecifierKind::External
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Errors from resolving a local specifier.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No candidate file exists. Carries every path that was probed so the
    /// user can see exactly what was tried.
    #[error("cannot resolve `{specifier}` from `{}`: tried {}", base.display(), format_attempts(attempted))]
    NotFound {
        specifier: String,
        base: PathBuf,
        attempted: Vec<PathBuf>,
    },
    /// The specifier is not local; only `./` and `../` specifiers resolve on disk.
    #[error("`{0}` is not a local specifier")]
    NotLocal(String),
}

fn format_attempts(attempted: &[PathBuf]) -> String {
    attempted
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a local `specifier` relative to the file that imports it.
///
/// A specifier with an explicit extension resolves literally: the file either
/// exists or resolution fails. Extension-less specifiers probe
/// [`SOURCE_EXTENSIONS`] as a direct file first, then as an `index` file
/// inside a directory of that name. The first existing candidate wins.
pub fn resolve(base_file: &Path, specifier: &str) -> Result<PathBuf, ResolveError> {
    if classify(specifier) != SpecifierKind::Local {
        return Err(ResolveError::NotLocal(specifier.to_string()));
    }

    let base_dir = base_file.parent().unwrap_or_else(|| Path::new("."));
    let target = base_dir.join(specifier);

    let mut attempted = Vec::new();

    if target.extension().is_some() {
        if target.is_file() {
            return Ok(normalize(&target));
        }
        attempted.push(target);
    } else {
        for ext in SOURCE_EXTENSIONS {
            let candidate = target.with_extension(ext);
            if candidate.is_file() {
                return Ok(normalize(&candidate));
            }
            attempted.push(candidate);
        }
        for ext in SOURCE_EXTENSIONS {
            let candidate = target.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Ok(normalize(&candidate));
            }
            attempted.push(candidate);
        }
    }

    Err(ResolveError::NotFound {
        specifier: specifier.to_string(),
        base: base_file.to_path_buf(),
        attempted,
    })
}

/// Canonicalize so two specifiers naming the same file compare equal
/// (dedup key for the graph walk). Falls back to the joined path if the
/// file vanished between the probe and this call.
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// ===========================================================================
// Tests
// ===========================================================================
