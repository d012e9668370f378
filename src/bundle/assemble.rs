//! Bundle assembly: module graph walk and single-string emission.
//!
//! [`ModuleGraph::build`] walks the widget's local import graph from the
//! entry file, transforming each file (see [`crate::bundle::transform`]) and
//! recording its module syntax. The walk is depth-first and post-order, so
//! [`ModuleGraph::order`] lists dependencies before their importers with the
//! entry last; modules are deduplicated by canonical path and a cycle fails
//! the walk.
//!
//! [`assemble`] emits the graph as one executable module string:
//!
//! - every non-entry module becomes a scope-isolated initializer,
//!   `const __weft_mN = (() => { ...body... return { exports }; })();`,
//!   so top-level names from different files cannot collide;
//! - local import statements become destructurings of those module objects;
//! - external and host packages are hoisted to the top as one namespace
//!   import per specifier, bound to a reserved `__weft_eN` name; each
//!   importing module rebinds its own names from that object, so binding
//!   names from different files cannot collide at the top level either. The
//!   personalized API specifier is replaced by [`crate::bundle::API_TOKEN`];
//! - the entry module's body stays top-level, so its `export default` is the
//!   bundle's default export.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bundle::lexer::lex_significant;
use crate::bundle::resolve::{classify, resolve, ResolveError, SpecifierKind, API_MODULE};
use crate::bundle::syntax::{scan_module, ExportKind, ImportStmt, ModuleSyntax};
use crate::bundle::transform::{apply_edits, transform, Edit, SourceKind, TransformError};
use crate::bundle::API_TOKEN;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can sink a bundle. The service boundary collapses these
/// into a single failure message.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("cannot read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{}` is not a widget source file", path.display())]
    UnsupportedExtension { path: PathBuf },
    #[error("in `{}`: {source}", path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("circular import: `{}` imports `{}`, which is still loading", from.display(), to.display())]
    Cycle { from: PathBuf, to: PathBuf },
    #[error("in `{}`: re-export from package `{specifier}` is not supported", path.display())]
    PackageReexport { path: PathBuf, specifier: String },
    #[error("in `{}`: `export * from` without a namespace is not supported at the entry", path.display())]
    StarReexport { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Module graph
// ---------------------------------------------------------------------------

/// One transformed source file.
pub struct Module {
    /// Transformed (plain script) source.
    pub code: String,
    pub syntax: ModuleSyntax,
    /// Local specifier → resolved canonical path, for every local import and
    /// re-export in this file.
    pub locals: HashMap<String, PathBuf>,
}

/// The widget's resolved local module graph.
pub struct ModuleGraph {
    pub entry: PathBuf,
    /// Post-order walk: dependencies first, entry last.
    pub order: Vec<PathBuf>,
    pub modules: HashMap<PathBuf, Module>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl ModuleGraph {
    /// Walk the local graph from `entry`, transforming every file.
    pub fn build(entry: &Path) -> Result<Self, AssembleError> {
        let entry = entry
            .canonicalize()
            .unwrap_or_else(|_| entry.to_path_buf());
        let mut graph = ModuleGraph {
            entry: entry.clone(),
            order: Vec::new(),
            modules: HashMap::new(),
        };
        let mut marks = HashMap::new();
        visit(&entry, &mut graph, &mut marks)?;
        Ok(graph)
    }
}

fn visit(
    path: &Path,
    graph: &mut ModuleGraph,
    marks: &mut HashMap<PathBuf, Mark>,
) -> Result<(), AssembleError> {
    marks.insert(path.to_path_buf(), Mark::Visiting);
    let mut module = load(path)?;

    let mut specifiers: Vec<String> = module
        .syntax
        .imports
        .iter()
        .map(|imp| imp.specifier.clone())
        .collect();
    for exp in &module.syntax.exports {
        match &exp.kind {
            ExportKind::Named {
                from: Some(spec), ..
            } => specifiers.push(spec.clone()),
            ExportKind::Star { from, .. } => specifiers.push(from.clone()),
            _ => {}
        }
    }

    for spec in specifiers {
        if classify(&spec) != SpecifierKind::Local {
            continue;
        }
        let child = resolve(path, &spec)?;
        module.locals.insert(spec, child.clone());
        match marks.get(&child) {
            Some(Mark::Visiting) => {
                return Err(AssembleError::Cycle {
                    from: path.to_path_buf(),
                    to: child,
                })
            }
            Some(Mark::Done) => {}
            None => visit(&child, graph, marks)?,
        }
    }

    marks.insert(path.to_path_buf(), Mark::Done);
    graph.order.push(path.to_path_buf());
    graph.modules.insert(path.to_path_buf(), module);
    Ok(())
}

/// Read and transform one file, then rescan its module syntax.
fn load(path: &Path) -> Result<Module, AssembleError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let kind = SourceKind::from_extension(ext).ok_or_else(|| AssembleError::UnsupportedExtension {
        path: path.to_path_buf(),
    })?;
    let raw = fs::read_to_string(path).map_err(|source| AssembleError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let wrap = |source| AssembleError::Transform {
        path: path.to_path_buf(),
        source,
    };
    let code = transform(&raw, kind).map_err(wrap)?;
    let toks = lex_significant(&code).map_err(|e| wrap(e.into()))?;
    let syntax = scan_module(&code, &toks).map_err(|e| wrap(e.into()))?;
    Ok(Module {
        code,
        syntax,
        locals: HashMap::new(),
    })
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// Bundle the widget rooted at `entry` into one module string.
pub fn assemble(entry: &Path) -> Result<String, AssembleError> {
    let graph = ModuleGraph::build(entry)?;
    emit(&graph)
}

/// Hoisted package imports, one namespace import per specifier bound to a
/// reserved name. Importing modules rebind from that object, so neither
/// formatting differences nor two files picking the same binding name for
/// different packages can produce duplicate top-level declarations.
struct Hoist {
    stmts: Vec<String>,
    bindings: HashMap<String, String>,
}

impl Hoist {
    fn new() -> Self {
        Hoist {
            stmts: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    /// The reserved binding for `specifier`, hoisting it on first use.
    fn binding(&mut self, specifier: &str) -> String {
        if let Some(name) = self.bindings.get(specifier) {
            return name.clone();
        }
        let name = format!("__weft_e{}", self.bindings.len());
        let from = if specifier == API_MODULE { API_TOKEN } else { specifier };
        self.stmts.push(format!("import * as {name} from \"{from}\";"));
        self.bindings.insert(specifier.to_string(), name.clone());
        name
    }
}

fn emit(graph: &ModuleGraph) -> Result<String, AssembleError> {
    // Deterministic initializer names in walk order.
    let mut names: HashMap<PathBuf, String> = HashMap::new();
    for (n, path) in graph.order.iter().filter(|p| **p != graph.entry).enumerate() {
        names.insert(path.clone(), format!("__weft_m{n}"));
    }

    let mut hoist = Hoist::new();
    let mut sections: Vec<String> = Vec::new();
    let mut entry_body = String::new();

    for path in &graph.order {
        let module = &graph.modules[path];
        let is_entry = *path == graph.entry;
        let mut edits: Vec<Edit> = Vec::new();
        let mut exports: Vec<String> = Vec::new();

        for imp in &module.syntax.imports {
            rewrite_import(module, imp, &names, &mut edits, &mut hoist);
        }
        for exp in &module.syntax.exports {
            let local_target = |spec: &str| {
                module
                    .locals
                    .get(spec)
                    .and_then(|child| names.get(child))
            };
            match &exp.kind {
                ExportKind::Decl { names: bound } => {
                    if is_entry {
                        continue;
                    }
                    edits.push(Edit::delete(exp.start, exp.end));
                    for name in bound {
                        exports.push(format!("{name}: {name}"));
                    }
                }
                ExportKind::Default => {
                    if is_entry {
                        continue;
                    }
                    edits.push(Edit::replace(exp.start, exp.end, "const __weft_default ="));
                    exports.push("\"default\": __weft_default".into());
                }
                ExportKind::Named { items, from: None } => {
                    if is_entry {
                        continue;
                    }
                    edits.push(Edit::delete(exp.start, exp.end));
                    for item in items {
                        exports.push(format!("{}: {}", item.effective(), item.name));
                    }
                }
                ExportKind::Named {
                    items,
                    from: Some(spec),
                } => {
                    let target = local_target(spec).ok_or_else(|| {
                        AssembleError::PackageReexport {
                            path: path.clone(),
                            specifier: spec.clone(),
                        }
                    })?;
                    if is_entry {
                        let stmts: Vec<String> = items
                            .iter()
                            .map(|item| {
                                format!(
                                    "export const {} = {target}.{};",
                                    item.effective(),
                                    item.name
                                )
                            })
                            .collect();
                        edits.push(Edit::replace(exp.start, exp.end, stmts.join("\n")));
                    } else {
                        edits.push(Edit::delete(exp.start, exp.end));
                        for item in items {
                            exports.push(format!("{}: {target}.{}", item.effective(), item.name));
                        }
                    }
                }
                ExportKind::Star { from, namespace } => {
                    let target = local_target(from).ok_or_else(|| {
                        AssembleError::PackageReexport {
                            path: path.clone(),
                            specifier: from.clone(),
                        }
                    })?;
                    match (is_entry, namespace) {
                        (true, Some(ns)) => {
                            edits.push(Edit::replace(
                                exp.start,
                                exp.end,
                                format!("export const {ns} = {target};"),
                            ));
                        }
                        (true, None) => {
                            return Err(AssembleError::StarReexport { path: path.clone() })
                        }
                        (false, Some(ns)) => {
                            edits.push(Edit::delete(exp.start, exp.end));
                            exports.push(format!("{ns}: {target}"));
                        }
                        (false, None) => {
                            edits.push(Edit::delete(exp.start, exp.end));
                            exports.push(format!("...{target}"));
                        }
                    }
                }
                // Type-only exports were removed by the transformer.
                ExportKind::TypeOnly => edits.push(Edit::delete(exp.start, exp.end)),
            }
        }

        let body = apply_edits(&module.code, edits);
        let body = body.trim();
        if is_entry {
            entry_body = body.to_string();
        } else if let Some(name) = names.get(path) {
            sections.push(format!(
                "const {name} = (() => {{\n{body}\nreturn {{ {} }};\n}})();",
                exports.join(", ")
            ));
        }
    }

    let mut out = Vec::new();
    if !hoist.stmts.is_empty() {
        out.push(hoist.stmts.join("\n"));
    }
    out.extend(sections);
    out.push(entry_body);
    let mut code = out.join("\n\n");
    code.push('\n');
    tracing::debug!(modules = graph.order.len(), bytes = code.len(), "assembled bundle");
    Ok(code)
}

fn rewrite_import(
    module: &Module,
    imp: &ImportStmt,
    names: &HashMap<PathBuf, String>,
    edits: &mut Vec<Edit>,
    hoist: &mut Hoist,
) {
    // Import statements cannot live inside an initializer, so local and
    // package imports alike become rebindings from a module object. A bare
    // import rebinds nothing; the hoisted namespace import still evaluates
    // the package.
    let target = match classify(&imp.specifier) {
        SpecifierKind::Local => {
            match module.locals.get(&imp.specifier).and_then(|c| names.get(c)) {
                Some(name) => name.clone(),
                // Every local specifier was resolved during the walk.
                None => return,
            }
        }
        SpecifierKind::HostProvided | SpecifierKind::External => hoist.binding(&imp.specifier),
    };
    let mut parts = Vec::new();
    if let Some(default) = &imp.default {
        parts.push(format!("const {default} = {target}[\"default\"];"));
    }
    if let Some(ns) = &imp.namespace {
        parts.push(format!("const {ns} = {target};"));
    }
    let named: Vec<String> = imp
        .named
        .iter()
        .filter(|m| !m.type_only)
        .map(|m| match &m.alias {
            Some(alias) => format!("{}: {alias}", m.name),
            None => m.name.clone(),
        })
        .collect();
    if !named.is_empty() {
        parts.push(format!("const {{ {} }} = {target};", named.join(", ")));
    }
    edits.push(Edit::replace(imp.start, imp.end, parts.join("\n")));
}

// ===========================================================================
// Tests
// ===========================================================================
