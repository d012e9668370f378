//! Import/export statement scanner.
//!
//! Walks a token stream and records every top-level `import` and `export`
//! statement with byte spans back into the source. The transformer uses the
//! spans to delete type-only statements, the dependency collector reads the
//! specifiers, and the assembler rewrites the statements wholesale.
//!
//! Only statements at bracket depth zero are module syntax; `import(...)`
//! dynamic imports and `import.meta` are expressions and are left alone.

use crate::bundle::lexer::{PTok, Tok};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One `name` or `name as alias` entry inside an import/export brace list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    /// The name on the left of `as` (local name for exports, source name for imports).
    pub name: String,
    /// The name on the right of `as`, if present.
    pub alias: Option<String>,
    /// Marked `type` inside the brace list (TypeScript).
    pub type_only: bool,
    /// Byte span of this entry, excluding separators.
    pub start: usize,
    pub end: usize,
}

impl NamedBinding {
    /// The binding name visible after the statement: the alias if present.
    pub fn effective(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A top-level `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStmt {
    /// Byte span of the whole statement, trailing semicolon included.
    pub start: usize,
    pub end: usize,
    /// The quoted specifier, without quotes.
    pub specifier: String,
    /// `import d from ...`
    pub default: Option<String>,
    /// `import * as ns from ...`
    pub namespace: Option<String>,
    /// `import { a, b as c } from ...`
    pub named: Vec<NamedBinding>,
    /// `import type ...` — the whole statement is type-only.
    pub type_only: bool,
}

impl ImportStmt {
    /// Whether this is a bare `import "spec"` with no bindings.
    pub fn side_effect_only(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// What a top-level `export` statement exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// `export const x = ..` / `export function f ..` — span covers only the
    /// `export` keyword; the declaration itself stays in place.
    Decl { names: Vec<String> },
    /// `export default ..` — span covers `export default`.
    Default,
    /// `export { a, b as c }` optionally `from "spec"` — span covers the
    /// whole statement.
    Named {
        items: Vec<NamedBinding>,
        from: Option<String>,
    },
    /// `export * from "spec"` — span covers the whole statement.
    Star {
        from: String,
        namespace: Option<String>,
    },
    /// `export type ..` / `export interface ..` — span covers the whole
    /// statement, which is deleted by the transformer.
    TypeOnly,
}

/// A top-level `export` statement. See [`ExportKind`] for what the span covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStmt {
    pub start: usize,
    pub end: usize,
    pub kind: ExportKind,
}

/// All module syntax found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSyntax {
    pub imports: Vec<ImportStmt>,
    pub exports: Vec<ExportStmt>,
}

/// Error from scanning a malformed import/export statement.
#[derive(Debug, thiserror::Error)]
#[error("malformed {kind} statement at byte {position}")]
pub struct ScanError {
    pub kind: &'static str,
    pub position: usize,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Scan a comment-free token stream for top-level import/export statements.
pub fn scan_module(source: &str, toks: &[PTok]) -> Result<ModuleSyntax, ScanError> {
    let mut syntax = ModuleSyntax::default();
    let mut depth: i32 = 0;
    let mut i = 0;

    while i < toks.len() {
        let t = &toks[i];
        match t.tok {
            Tok::LParen | Tok::LBrace | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBrace | Tok::RBracket => depth -= 1,
            Tok::Ident if depth == 0 => {
                let prev_is_dot = i > 0 && matches!(toks[i - 1].tok, Tok::Dot | Tok::OptChain);
                let word = t.text(source);
                if word == "import" && !prev_is_dot {
                    // `import(` and `import.meta` are expressions, not statements.
                    let next = toks.get(i + 1).map(|n| n.tok);
                    if !matches!(next, Some(Tok::LParen) | Some(Tok::Dot)) {
                        let (stmt, next_i) = parse_import(source, toks, i)?;
                        syntax.imports.push(stmt);
                        i = next_i;
                        continue;
                    }
                } else if word == "export" && !prev_is_dot {
                    let (stmt, next_i) = parse_export(source, toks, i)?;
                    syntax.exports.push(stmt);
                    i = next_i;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(syntax)
}

fn err(kind: &'static str, toks: &[PTok], i: usize) -> ScanError {
    let position = toks
        .get(i)
        .or_else(|| toks.last())
        .map(|t| t.start)
        .unwrap_or(0);
    ScanError { kind, position }
}

/// Strip the surrounding quotes from a string token's text.
fn unquote(text: &str) -> String {
    text[1..text.len() - 1].to_string()
}

fn is_str(tok: Tok) -> bool {
    matches!(tok, Tok::Str | Tok::StrSingle)
}

/// Parse `{ a, b as c, type D }`, cursor on the `{`. Returns items and the
/// index one past the closing `}`.
fn parse_brace_list(
    source: &str,
    toks: &[PTok],
    mut i: usize,
    kind: &'static str,
) -> Result<(Vec<NamedBinding>, usize), ScanError> {
    debug_assert_eq!(toks[i].tok, Tok::LBrace);
    i += 1;
    let mut items = Vec::new();

    loop {
        match toks.get(i).map(|t| t.tok) {
            Some(Tok::RBrace) => return Ok((items, i + 1)),
            Some(Tok::Ident) => {
                // `start` stays on the `type` keyword so deletion takes it too.
                let start = toks[i].start;
                let mut type_only = false;
                let mut name = toks[i].text(source);

                // `type Foo` marks a type-only member, unless `type` is itself
                // the binding (`{ type }` or `{ type as t }`).
                if name == "type"
                    && matches!(toks.get(i + 1).map(|t| t.tok), Some(Tok::Ident))
                    && toks[i + 1].text(source) != "as"
                {
                    type_only = true;
                    i += 1;
                    name = toks[i].text(source);
                }

                let mut end = toks[i].end;
                let mut alias = None;
                if toks.get(i + 1).map(|t| t.text(source)) == Some("as") {
                    match toks.get(i + 2) {
                        Some(a) if a.tok == Tok::Ident => {
                            alias = Some(a.text(source).to_string());
                            end = a.end;
                            i += 2;
                        }
                        _ => return Err(err(kind, toks, i + 2)),
                    }
                }

                items.push(NamedBinding {
                    name: name.to_string(),
                    alias,
                    type_only,
                    start,
                    end,
                });

                i += 1;
                if toks.get(i).map(|t| t.tok) == Some(Tok::Comma) {
                    i += 1;
                }
            }
            _ => return Err(err(kind, toks, i)),
        }
    }
}

/// Extend a statement span over a trailing semicolon, if present.
fn with_semi(toks: &[PTok], i: usize, end: usize) -> (usize, usize) {
    match toks.get(i) {
        Some(t) if t.tok == Tok::Semi => (t.end, i + 1),
        _ => (end, i),
    }
}

fn parse_import(
    source: &str,
    toks: &[PTok],
    start_i: usize,
) -> Result<(ImportStmt, usize), ScanError> {
    const KIND: &str = "import";
    let start = toks[start_i].start;
    let mut i = start_i + 1;

    let mut stmt = ImportStmt {
        start,
        end: toks[start_i].end,
        specifier: String::new(),
        default: None,
        namespace: None,
        named: Vec::new(),
        type_only: false,
    };

    // `import type X ...` — but `import type from "m"` binds a default named `type`.
    if toks.get(i).map(|t| t.text(source)) == Some("type")
        && toks.get(i + 1).map(|t| t.text(source)) != Some("from")
        && !matches!(toks.get(i + 1).map(|t| t.tok), Some(t) if is_str(t))
    {
        stmt.type_only = true;
        i += 1;
    }

    // Bare `import "spec"`.
    if let Some(t) = toks.get(i) {
        if is_str(t.tok) {
            stmt.specifier = unquote(t.text(source));
            let (end, next_i) = with_semi(toks, i + 1, t.end);
            stmt.end = end;
            return Ok((stmt, next_i));
        }
    }

    // Default binding.
    if let Some(t) = toks.get(i) {
        if t.tok == Tok::Ident && t.text(source) != "from" {
            stmt.default = Some(t.text(source).to_string());
            i += 1;
            if toks.get(i).map(|t| t.tok) == Some(Tok::Comma) {
                i += 1;
            }
        }
    }

    // Namespace or named list.
    match toks.get(i).map(|t| t.tok) {
        Some(Tok::Star) => {
            if toks.get(i + 1).map(|t| t.text(source)) != Some("as") {
                return Err(err(KIND, toks, i + 1));
            }
            match toks.get(i + 2) {
                Some(t) if t.tok == Tok::Ident => {
                    stmt.namespace = Some(t.text(source).to_string());
                    i += 3;
                }
                _ => return Err(err(KIND, toks, i + 2)),
            }
        }
        Some(Tok::LBrace) => {
            let (items, next_i) = parse_brace_list(source, toks, i, KIND)?;
            stmt.named = items;
            i = next_i;
        }
        _ => {}
    }

    // `from "spec"`.
    if toks.get(i).map(|t| t.text(source)) != Some("from") {
        return Err(err(KIND, toks, i));
    }
    i += 1;
    let spec = match toks.get(i) {
        Some(t) if is_str(t.tok) => t,
        _ => return Err(err(KIND, toks, i)),
    };
    stmt.specifier = unquote(spec.text(source));
    let (end, next_i) = with_semi(toks, i + 1, spec.end);
    stmt.end = end;
    Ok((stmt, next_i))
}

fn parse_export(
    source: &str,
    toks: &[PTok],
    start_i: usize,
) -> Result<(ExportStmt, usize), ScanError> {
    const KIND: &str = "export";
    let start = toks[start_i].start;
    let kw_end = toks[start_i].end;
    let i = start_i + 1;

    let next = match toks.get(i) {
        Some(t) => t,
        None => return Err(err(KIND, toks, i)),
    };

    match next.tok {
        Tok::Ident => match next.text(source) {
            "default" => Ok((
                ExportStmt {
                    start,
                    end: next.end,
                    kind: ExportKind::Default,
                },
                i + 1,
            )),
            "type" => {
                // `export type { .. } [from ".."]` or `export type X = ..;`
                if toks.get(i + 1).map(|t| t.tok) == Some(Tok::LBrace) {
                    let (_items, mut j) = parse_brace_list(source, toks, i + 1, KIND)?;
                    let mut end = toks[j - 1].end;
                    if toks.get(j).map(|t| t.text(source)) == Some("from") {
                        match toks.get(j + 1) {
                            Some(t) if is_str(t.tok) => {
                                end = t.end;
                                j += 2;
                            }
                            _ => return Err(err(KIND, toks, j + 1)),
                        }
                    }
                    let (end, next_i) = with_semi(toks, j, end);
                    Ok((
                        ExportStmt {
                            start,
                            end,
                            kind: ExportKind::TypeOnly,
                        },
                        next_i,
                    ))
                } else {
                    let (end, next_i) = scan_to_semi(toks, i + 1);
                    Ok((
                        ExportStmt {
                            start,
                            end,
                            kind: ExportKind::TypeOnly,
                        },
                        next_i,
                    ))
                }
            }
            "interface" => {
                let (end, next_i) = scan_to_block_end(toks, i + 1)?;
                Ok((
                    ExportStmt {
                        start,
                        end,
                        kind: ExportKind::TypeOnly,
                    },
                    next_i,
                ))
            }
            "const" | "let" | "var" => {
                let names = collect_declarator_names(source, toks, i + 1);
                Ok((
                    ExportStmt {
                        start,
                        end: kw_end,
                        kind: ExportKind::Decl { names },
                    },
                    i + 1,
                ))
            }
            "function" | "class" | "async" => {
                let mut j = i + 1;
                if next.text(source) == "async" {
                    j += 1; // skip `function`
                }
                let names = match toks.get(j) {
                    Some(t) if t.tok == Tok::Ident => vec![t.text(source).to_string()],
                    _ => Vec::new(),
                };
                Ok((
                    ExportStmt {
                        start,
                        end: kw_end,
                        kind: ExportKind::Decl { names },
                    },
                    i + 1,
                ))
            }
            _ => Err(err(KIND, toks, i)),
        },
        Tok::Star => {
            // `export * [as ns] from "spec"`
            let mut j = i + 1;
            let mut namespace = None;
            if toks.get(j).map(|t| t.text(source)) == Some("as") {
                match toks.get(j + 1) {
                    Some(t) if t.tok == Tok::Ident => {
                        namespace = Some(t.text(source).to_string());
                        j += 2;
                    }
                    _ => return Err(err(KIND, toks, j + 1)),
                }
            }
            if toks.get(j).map(|t| t.text(source)) != Some("from") {
                return Err(err(KIND, toks, j));
            }
            let spec = match toks.get(j + 1) {
                Some(t) if is_str(t.tok) => t,
                _ => return Err(err(KIND, toks, j + 1)),
            };
            let from = unquote(spec.text(source));
            let (end, next_i) = with_semi(toks, j + 2, spec.end);
            Ok((
                ExportStmt {
                    start,
                    end,
                    kind: ExportKind::Star { from, namespace },
                },
                next_i,
            ))
        }
        Tok::LBrace => {
            let (items, mut j) = parse_brace_list(source, toks, i, KIND)?;
            let mut end = toks[j - 1].end;
            let mut from = None;
            if toks.get(j).map(|t| t.text(source)) == Some("from") {
                match toks.get(j + 1) {
                    Some(t) if is_str(t.tok) => {
                        from = Some(unquote(t.text(source)));
                        end = t.end;
                        j += 2;
                    }
                    _ => return Err(err(KIND, toks, j + 1)),
                }
            }
            let (end, next_i) = with_semi(toks, j, end);
            Ok((
                ExportStmt {
                    start,
                    end,
                    kind: ExportKind::Named { items, from },
                },
                next_i,
            ))
        }
        _ => Err(err(KIND, toks, i)),
    }
}

/// Scan forward to a `;` at relative bracket depth zero (or end of input).
/// Returns the end byte and the index one past the terminator.
fn scan_to_semi(toks: &[PTok], mut i: usize) -> (usize, usize) {
    let mut depth: i32 = 0;
    let mut end = toks.get(i.saturating_sub(1)).map(|t| t.end).unwrap_or(0);
    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::LParen | Tok::LBrace | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBrace | Tok::RBracket => {
                if depth == 0 {
                    // Dedent past the statement: stop before it.
                    return (end, i);
                }
                depth -= 1;
            }
            Tok::Semi if depth == 0 => return (t.end, i + 1),
            _ => {}
        }
        end = t.end;
        i += 1;
    }
    (end, i)
}

/// Scan forward past an `interface`-style header to the matching close brace.
fn scan_to_block_end(toks: &[PTok], mut i: usize) -> Result<(usize, usize), ScanError> {
    // Skip to the opening brace.
    while let Some(t) = toks.get(i) {
        if t.tok == Tok::LBrace {
            break;
        }
        i += 1;
    }
    let mut depth: i32 = 0;
    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::LBrace => depth += 1,
            Tok::RBrace => {
                depth -= 1;
                if depth == 0 {
                    return Ok((t.end, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(err("interface", toks, i))
}

/// Collect the bound names of a `const`/`let`/`var` declarator list, including
/// names inside destructuring patterns.
fn collect_declarator_names(source: &str, toks: &[PTok], mut i: usize) -> Vec<String> {
    let mut names = Vec::new();
    let mut expect_binder = true;
    let mut depth: i32 = 0;

    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::Semi if depth == 0 => break,
            Tok::Comma if depth == 0 => expect_binder = true,
            Tok::LParen | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBracket => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::LBrace => {
                if expect_binder && depth == 0 {
                    // Destructuring pattern: a name binds unless it is an
                    // object key followed by `:`.
                    let mut d = 1;
                    let mut j = i + 1;
                    while let Some(u) = toks.get(j) {
                        match u.tok {
                            Tok::LBrace | Tok::LBracket => d += 1,
                            Tok::RBrace | Tok::RBracket => {
                                d -= 1;
                                if d == 0 {
                                    break;
                                }
                            }
                            Tok::Ident => {
                                let is_key =
                                    toks.get(j + 1).map(|n| n.tok) == Some(Tok::Colon);
                                if !is_key {
                                    names.push(u.text(source).to_string());
                                }
                            }
                            _ => {}
                        }
                        j += 1;
                    }
                    expect_binder = false;
                    i = j + 1;
                    continue;
                }
                depth += 1;
            }
            Tok::RBrace => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::Ident if expect_binder && depth == 0 => {
                names.push(t.text(source).to_string());
                expect_binder = false;
            }
            _ => {}
        }
        i += 1;
    }

    names
}

// ===========================================================================
// Tests
// ===========================================================================
