//! Source-to-source transformation: typed and markup variants → plain script.
//!
//! [`transform`] takes one file's text and its [`SourceKind`] and produces
//! executable module source. Typed variants get their static type syntax
//! stripped; markup variants get embedded markup rewritten to factory calls
//! (see [`crate::bundle::markup`]). Statement order and all runtime semantics
//! are preserved; import/export statements pass through verbatim — specifier
//! rewriting belongs to the assembler.
//!
//! The stripper works on the token stream, collecting byte-range edits and
//! applying them in one pass, so everything it does not recognize survives
//! byte-for-byte. Supported type syntax: type aliases, interfaces,
//! annotations on bindings/parameters/returns, `as`/`satisfies` assertions,
//! definite-assignment and non-null `!`, declaration type parameters,
//! `extends`/`implements` clause arguments, and type-only imports/exports.
//! Enums and namespaces have runtime semantics and are rejected rather than
//! silently mistranslated. Call-site type arguments and class member access
//! modifiers are not stripped.

use crate::bundle::lexer::{lex_significant, LexError, PTok, Tok};
use crate::bundle::markup::rewrite_markup;
use crate::bundle::syntax::{scan_module, ExportKind, ScanError};

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The four widget source flavors, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.js` — plain script.
    Script,
    /// `.jsx` — script with embedded markup.
    Markup,
    /// `.ts` — typed script.
    Typed,
    /// `.tsx` — typed script with embedded markup.
    TypedMarkup,
}

impl SourceKind {
    /// Map a file extension to its kind. `None` for anything outside the
    /// closed extension set.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" => Some(SourceKind::Script),
            "jsx" => Some(SourceKind::Markup),
            "ts" => Some(SourceKind::Typed),
            "tsx" => Some(SourceKind::TypedMarkup),
            _ => None,
        }
    }

    pub fn is_typed(self) -> bool {
        matches!(self, SourceKind::Typed | SourceKind::TypedMarkup)
    }

    pub fn is_markup(self) -> bool {
        matches!(self, SourceKind::Markup | SourceKind::TypedMarkup)
    }
}

/// Errors from transforming one source file.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("unsupported syntax at byte {position}: {message}")]
    Unsupported { position: usize, message: String },
}

impl From<LexError> for TransformError {
    fn from(err: LexError) -> Self {
        TransformError::Syntax {
            position: err.position,
            message: "unrecognized token".into(),
        }
    }
}

impl From<ScanError> for TransformError {
    fn from(err: ScanError) -> Self {
        TransformError::Syntax {
            position: err.position,
            message: format!("malformed {} statement", err.kind),
        }
    }
}

/// Transform one file's source into plain executable script.
pub fn transform(source: &str, kind: SourceKind) -> Result<String, TransformError> {
    let mut text = source.to_string();
    // Markup first: element text content is free-form prose the script
    // tokenizer would reject, and the rewrite leaves plain script behind.
    if kind.is_markup() {
        text = rewrite_markup(&text)?;
    }
    if kind.is_typed() {
        text = strip_types(&text)?;
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// A byte-range replacement against the original source.
#[derive(Debug, Clone)]
pub(crate) struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn delete(start: usize, end: usize) -> Self {
        Edit {
            start,
            end,
            text: String::new(),
        }
    }

    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Edit {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Apply edits to the source. Edits are sorted by start; an edit nested
/// inside an earlier one is dropped (the outer deletion already covers it).
pub(crate) fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}

// ---------------------------------------------------------------------------
// Type stripping
// ---------------------------------------------------------------------------

/// Remove static type syntax, leaving runtime code untouched.
pub fn strip_types(source: &str) -> Result<String, TransformError> {
    let toks = lex_significant(source)?;
    let syntax = scan_module(source, &toks)?;

    let mut edits: Vec<Edit> = Vec::new();
    // Byte ranges already consumed by whole-statement deletions; tokens
    // inside them are skipped by the main pass.
    let mut dead: Vec<(usize, usize)> = Vec::new();

    // Type-only imports/exports.
    for imp in &syntax.imports {
        if imp.type_only {
            edits.push(Edit::delete(imp.start, imp.end));
            dead.push((imp.start, imp.end));
        } else {
            let runtime_members = imp.named.iter().filter(|m| !m.type_only).count();
            if runtime_members == 0 && !imp.named.is_empty()
                && imp.default.is_none()
                && imp.namespace.is_none()
            {
                // Every named member was a type: drop the whole statement.
                edits.push(Edit::delete(imp.start, imp.end));
                dead.push((imp.start, imp.end));
            } else {
                for member in imp.named.iter().filter(|m| m.type_only) {
                    let (start, end) = widen_over_comma(source, member.start, member.end);
                    edits.push(Edit::delete(start, end));
                }
            }
        }
    }
    for exp in &syntax.exports {
        if exp.kind == ExportKind::TypeOnly {
            edits.push(Edit::delete(exp.start, exp.end));
            dead.push((exp.start, exp.end));
        }
    }

    let param_lists = find_param_lists(source, &toks);
    let is_dead = |pos: usize| dead.iter().any(|&(s, e)| pos >= s && pos < e);

    let mut i = 0;
    while i < toks.len() {
        let t = &toks[i];
        if is_dead(t.start) {
            i += 1;
            continue;
        }
        let prev_is_dot = i > 0 && matches!(toks[i - 1].tok, Tok::Dot | Tok::OptChain);

        match t.tok {
            Tok::Ident if !prev_is_dot => {
                let word = t.text(source);
                match word {
                    // `type X = ...;` at statement level.
                    "type" if at_statement_start(&toks, i)
                        && matches!(toks.get(i + 1).map(|n| n.tok), Some(Tok::Ident))
                        && matches!(
                            toks.get(i + 2).map(|n| n.tok),
                            Some(Tok::Eq) | Some(Tok::Lt)
                        ) =>
                    {
                        let (end, next_i) = stmt_end_at_semi(&toks, i + 1);
                        edits.push(Edit::delete(t.start, end));
                        i = next_i;
                        continue;
                    }
                    // `interface X ... { ... }` at statement level.
                    "interface" if at_statement_start(&toks, i)
                        && matches!(toks.get(i + 1).map(|n| n.tok), Some(Tok::Ident)) =>
                    {
                        let (end, next_i) = block_end(&toks, i + 1).ok_or_else(|| {
                            TransformError::Syntax {
                                position: t.start,
                                message: "unterminated interface body".into(),
                            }
                        })?;
                        edits.push(Edit::delete(t.start, end));
                        i = next_i;
                        continue;
                    }
                    "enum" if at_statement_start(&toks, i)
                        || (i > 0 && toks[i - 1].text(source) == "const") =>
                    {
                        return Err(TransformError::Unsupported {
                            position: t.start,
                            message: "TypeScript enums are not supported in widget source"
                                .into(),
                        });
                    }
                    "namespace" if at_statement_start(&toks, i)
                        && matches!(toks.get(i + 1).map(|n| n.tok), Some(Tok::Ident)) =>
                    {
                        return Err(TransformError::Unsupported {
                            position: t.start,
                            message: "TypeScript namespaces are not supported in widget source"
                                .into(),
                        });
                    }
                    // `x as T` / `x satisfies T` assertions.
                    "as" | "satisfies"
                        if i > 0
                            && is_expression_end(toks[i - 1].tok)
                            && !inside_module_stmt(&syntax, t.start) =>
                    {
                        let type_end = scan_type(&toks, i + 1, &[]);
                        let end = toks
                            .get(type_end.wrapping_sub(1))
                            .map(|t| t.end)
                            .unwrap_or(t.end);
                        edits.push(Edit::delete(toks[i - 1].end, end));
                        i = type_end;
                        continue;
                    }
                    // Variable declarations: binder annotations.
                    "const" | "let" | "var" => {
                        strip_declarators(&toks, i + 1, &mut edits);
                    }
                    // `function f<T>(` / `class C<T>` declaration type params.
                    "function" | "class" => {
                        let mut j = i + 1;
                        if matches!(toks.get(j).map(|n| n.tok), Some(Tok::Ident)) {
                            j += 1;
                        }
                        if toks.get(j).map(|n| n.tok) == Some(Tok::Lt) {
                            if let Some((end, _)) = angle_group_end(&toks, j) {
                                edits.push(Edit::delete(toks[j].start, end));
                            }
                        }
                    }
                    // `extends Base<T>` — strip only the type arguments.
                    "extends" => {
                        let mut j = i + 1;
                        while matches!(
                            toks.get(j).map(|n| n.tok),
                            Some(Tok::Ident) | Some(Tok::Dot)
                        ) {
                            j += 1;
                        }
                        if toks.get(j).map(|n| n.tok) == Some(Tok::Lt) {
                            if let Some((end, _)) = angle_group_end(&toks, j) {
                                edits.push(Edit::delete(toks[j].start, end));
                            }
                        }
                    }
                    // `implements A, B` — strip the whole clause.
                    "implements" => {
                        let mut j = i + 1;
                        let mut end = t.end;
                        while let Some(n) = toks.get(j) {
                            if n.tok == Tok::LBrace {
                                break;
                            }
                            end = n.end;
                            j += 1;
                        }
                        edits.push(Edit::delete(t.start, end));
                        i = j;
                        continue;
                    }
                    _ => {}
                }
            }
            // Postfix non-null assertion: `x!`, `f()!`, `a[0]!`.
            Tok::Bang => {
                let prev_ok = i > 0 && is_expression_end(toks[i - 1].tok);
                let next_ok = matches!(
                    toks.get(i + 1).map(|n| n.tok),
                    Some(Tok::Dot)
                        | Some(Tok::OptChain)
                        | Some(Tok::LParen)
                        | Some(Tok::LBracket)
                        | Some(Tok::RParen)
                        | Some(Tok::RBracket)
                        | Some(Tok::RBrace)
                        | Some(Tok::Semi)
                        | Some(Tok::Comma)
                        | None
                );
                if prev_ok && next_ok {
                    edits.push(Edit::delete(t.start, t.end));
                }
            }
            // Parameter and return annotations.
            Tok::LParen => {
                if let Some(&close) = param_lists.get(&i) {
                    strip_params(&toks, i, close, &mut edits);
                    // Return annotation after the closing paren.
                    if toks.get(close + 1).map(|n| n.tok) == Some(Tok::Colon) {
                        let type_end = scan_type(&toks, close + 2, &[Tok::Arrow, Tok::LBrace]);
                        if type_end > close + 2 {
                            let end = toks[type_end - 1].end;
                            edits.push(Edit::delete(toks[close + 1].start, end));
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    Ok(apply_edits(source, edits))
}

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

/// Can this token end an expression? Used to tell assertion `as` from other
/// uses and postfix `!` from negation.
fn is_expression_end(tok: Tok) -> bool {
    matches!(
        tok,
        Tok::Ident
            | Tok::Number
            | Tok::Str
            | Tok::StrSingle
            | Tok::Template
            | Tok::RParen
            | Tok::RBracket
            | Tok::RBrace
    )
}

fn at_statement_start(toks: &[PTok], i: usize) -> bool {
    match i.checked_sub(1).and_then(|p| toks.get(p)) {
        None => true,
        Some(p) => matches!(p.tok, Tok::Semi | Tok::LBrace | Tok::RBrace),
    }
}

/// Is this byte position inside any scanned import/export statement?
fn inside_module_stmt(syntax: &crate::bundle::syntax::ModuleSyntax, pos: usize) -> bool {
    syntax
        .imports
        .iter()
        .any(|s| pos >= s.start && pos < s.end)
        || syntax
            .exports
            .iter()
            .any(|s| pos >= s.start && pos < s.end)
}

/// Widen a member span over one adjacent comma (following preferred) so a
/// deleted list member takes its separator with it.
fn widen_over_comma(source: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = source.as_bytes();
    let mut e = end;
    while e < bytes.len() && (bytes[e] as char).is_whitespace() {
        e += 1;
    }
    if e < bytes.len() && bytes[e] == b',' {
        e += 1;
        while e < bytes.len() && bytes[e] == b' ' {
            e += 1;
        }
        return (start, e);
    }
    let mut s = start;
    while s > 0 && (bytes[s - 1] as char).is_whitespace() {
        s -= 1;
    }
    if s > 0 && bytes[s - 1] == b',' {
        return (s - 1, end);
    }
    (start, end)
}

/// Forward to a `;` at relative bracket depth zero. Returns (end byte, next index).
fn stmt_end_at_semi(toks: &[PTok], mut i: usize) -> (usize, usize) {
    let mut depth: i32 = 0;
    let mut end = toks.get(i.saturating_sub(1)).map(|t| t.end).unwrap_or(0);
    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::LParen | Tok::LBrace | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBrace | Tok::RBracket => {
                if depth == 0 {
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

/// Forward past a header to the matching close brace of the first block.
fn block_end(toks: &[PTok], mut i: usize) -> Option<(usize, usize)> {
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
                    return Some((t.end, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// From a `<` token, find the matching `>` tracking angle depth and skipping
/// bracketed groups. Returns (end byte of `>`, index after it).
fn angle_group_end(toks: &[PTok], start: usize) -> Option<(usize, usize)> {
    let mut angle: i32 = 0;
    let mut i = start;
    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::Lt => angle += 1,
            Tok::Gt => {
                angle -= 1;
                if angle == 0 {
                    return Some((t.end, i + 1));
                }
            }
            Tok::LParen | Tok::LBrace | Tok::LBracket => {
                i = skip_group(toks, i)?;
                continue;
            }
            // A statement boundary inside an angle group means this was a
            // comparison after all; bail out.
            Tok::Semi => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Skip a balanced `()`/`{}`/`[]` group. Cursor on the opener; returns the
/// index one past the closer.
fn skip_group(toks: &[PTok], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::LParen | Tok::LBrace | Tok::LBracket => depth += 1,
            Tok::RParen | Tok::RBrace | Tok::RBracket => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Consume a type expression starting at `start`. Stops at a token in
/// `extra_stops`, at a separator at relative depth zero, or at anything that
/// cannot be part of a type. Returns the index one past the last type token.
fn scan_type(toks: &[PTok], start: usize, extra_stops: &[Tok]) -> usize {
    let mut i = start;
    while let Some(t) = toks.get(i) {
        if extra_stops.contains(&t.tok) {
            break;
        }
        match t.tok {
            Tok::Ident | Tok::Dot | Tok::Number | Tok::Str | Tok::StrSingle | Tok::Template
            | Tok::Pipe | Tok::Amp | Tok::Question | Tok::Arrow => {
                i += 1;
            }
            Tok::Lt => match angle_group_end(toks, i) {
                Some((_, next)) => i = next,
                None => break,
            },
            Tok::LParen | Tok::LBrace | Tok::LBracket => match skip_group(toks, i) {
                Some(next) => i = next,
                None => break,
            },
            _ => break,
        }
    }
    i
}

// ---------------------------------------------------------------------------
// Parameter lists
// ---------------------------------------------------------------------------

/// Keywords that take a parenthesized head which is never a parameter list.
const PAREN_KEYWORDS: [&str; 7] = ["if", "for", "while", "switch", "return", "typeof", "do"];

/// Find every `(` that opens a parameter list, mapped to its matching `)`.
///
/// Recognized contexts: `function name(`, anonymous `function(`, `catch(`,
/// arrows (`) =>` possibly with a return annotation), and method definitions
/// (`name() {` at a member boundary).
fn find_param_lists(source: &str, toks: &[PTok]) -> std::collections::HashMap<usize, usize> {
    use std::collections::HashMap;

    let mut matching: HashMap<usize, usize> = HashMap::new();
    let mut stack = Vec::new();
    for (i, t) in toks.iter().enumerate() {
        match t.tok {
            Tok::LParen => stack.push(i),
            Tok::RParen => {
                if let Some(open) = stack.pop() {
                    matching.insert(open, i);
                }
            }
            _ => {}
        }
    }

    let mut params = HashMap::new();
    for (&open, &close) in &matching {
        if is_param_list(source, toks, open, close) {
            params.insert(open, close);
        }
    }
    params
}

fn is_param_list(source: &str, toks: &[PTok], open: usize, close: usize) -> bool {
    // `function f(`, `function (`, `catch (` — also with stripped generics
    // in between, so look back over a possible angle group.
    let mut p = open;
    if p > 0 && toks[p - 1].tok == Tok::Gt {
        // Walk back over `<...>`.
        let mut angle = 0i32;
        let mut j = p - 1;
        loop {
            match toks[j].tok {
                Tok::Gt => angle += 1,
                Tok::Lt => {
                    angle -= 1;
                    if angle == 0 {
                        p = j;
                        break;
                    }
                }
                _ => {}
            }
            if j == 0 {
                break;
            }
            j -= 1;
        }
    }
    if p > 0 {
        let before = &toks[p - 1];
        if before.tok == Tok::Ident {
            let word = before.text(source);
            if word == "function" || word == "catch" {
                return true;
            }
            if p > 1 && toks[p - 2].tok == Tok::Ident {
                let kw = toks[p - 2].text(source);
                if kw == "function" {
                    return true;
                }
            }
        }
    }

    // Arrow: `) =>` or `): T =>`.
    match toks.get(close + 1).map(|t| t.tok) {
        Some(Tok::Arrow) => return true,
        Some(Tok::Colon) => {
            let type_end = scan_type(toks, close + 2, &[Tok::Arrow, Tok::LBrace]);
            if toks.get(type_end).map(|t| t.tok) == Some(Tok::Arrow) {
                return true;
            }
            // `): T {` — method with return annotation, checked below.
            if toks.get(type_end).map(|t| t.tok) != Some(Tok::LBrace) {
                return false;
            }
        }
        Some(Tok::LBrace) => {}
        _ => return false,
    }

    // Method definition: `name() {` where the name sits at a member boundary
    // or follows a member modifier.
    if open > 0 && toks[open - 1].tok == Tok::Ident {
        let name = toks[open - 1].text(source);
        if PAREN_KEYWORDS.contains(&name) {
            return false;
        }
        match open.checked_sub(2).and_then(|j| toks.get(j)) {
            None => return true,
            Some(b) => {
                if matches!(b.tok, Tok::LBrace | Tok::RBrace | Tok::Semi) {
                    return true;
                }
                if b.tok == Tok::Ident
                    && matches!(b.text(source), "get" | "set" | "async" | "static")
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Strip `?` optional markers and `: Type` annotations from one parameter list.
fn strip_params(toks: &[PTok], open: usize, close: usize, edits: &mut Vec<Edit>) {
    let mut i = open + 1;
    let mut at_param_start = true;
    let mut depth: i32 = 0;

    while i < close {
        let t = &toks[i];
        match t.tok {
            Tok::LParen | Tok::LBrace | Tok::LBracket => {
                if at_param_start && depth == 0 && matches!(t.tok, Tok::LBrace | Tok::LBracket) {
                    // Destructured parameter: skip the pattern, then strip its
                    // annotation if present.
                    if let Some(after) = skip_group(toks, i) {
                        if after <= close && toks.get(after).map(|n| n.tok) == Some(Tok::Colon) {
                            let type_end = scan_type(toks, after + 1, &[Tok::Comma, Tok::Eq]);
                            if type_end > after + 1 {
                                edits.push(Edit::delete(
                                    toks[after].start,
                                    toks[type_end - 1].end,
                                ));
                            }
                            i = type_end;
                        } else {
                            i = after;
                        }
                        at_param_start = false;
                        continue;
                    }
                }
                depth += 1;
            }
            Tok::RParen | Tok::RBrace | Tok::RBracket => depth -= 1,
            Tok::Comma if depth == 0 => at_param_start = true,
            Tok::Ellipsis => {}
            Tok::Ident if at_param_start && depth == 0 => {
                at_param_start = false;
                let mut j = i + 1;
                // Optional marker.
                if toks.get(j).map(|n| n.tok) == Some(Tok::Question)
                    && toks.get(j + 1).map(|n| n.tok) != Some(Tok::OptChain)
                {
                    edits.push(Edit::delete(toks[j].start, toks[j].end));
                    j += 1;
                }
                if toks.get(j).map(|n| n.tok) == Some(Tok::Colon) {
                    let type_end = scan_type(toks, j + 1, &[Tok::Comma, Tok::Eq]);
                    if type_end > j + 1 {
                        edits.push(Edit::delete(toks[j].start, toks[type_end - 1].end));
                        i = type_end;
                        continue;
                    }
                }
                i = j;
                continue;
            }
            _ => {
                if depth == 0 {
                    at_param_start = false;
                }
            }
        }
        i += 1;
    }
}

/// Strip annotations from `const`/`let`/`var` declarator lists.
fn strip_declarators(toks: &[PTok], mut i: usize, edits: &mut Vec<Edit>) {
    let mut expect_binder = true;
    let mut depth: i32 = 0;

    while let Some(t) = toks.get(i) {
        match t.tok {
            Tok::Semi if depth == 0 => break,
            Tok::Comma if depth == 0 => expect_binder = true,
            Tok::LParen | Tok::LBracket | Tok::LBrace => {
                if expect_binder && depth == 0 && matches!(t.tok, Tok::LBrace | Tok::LBracket) {
                    // Destructuring binder; annotation may follow the pattern.
                    if let Some(after) = skip_group(toks, i) {
                        expect_binder = false;
                        if toks.get(after).map(|n| n.tok) == Some(Tok::Colon) {
                            let type_end =
                                scan_type(toks, after + 1, &[Tok::Eq, Tok::Comma, Tok::Semi]);
                            if type_end > after + 1 {
                                edits.push(Edit::delete(
                                    toks[after].start,
                                    toks[type_end - 1].end,
                                ));
                            }
                            i = type_end;
                        } else {
                            i = after;
                        }
                        continue;
                    }
                }
                depth += 1;
            }
            Tok::RParen | Tok::RBracket => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::RBrace => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::Ident if expect_binder && depth == 0 => {
                expect_binder = false;
                let mut j = i + 1;
                // Definite assignment: `let ready!: boolean`.
                if toks.get(j).map(|n| n.tok) == Some(Tok::Bang) {
                    edits.push(Edit::delete(toks[j].start, toks[j].end));
                    j += 1;
                }
                if toks.get(j).map(|n| n.tok) == Some(Tok::Colon) {
                    let type_end = scan_type(toks, j + 1, &[Tok::Eq, Tok::Comma, Tok::Semi]);
                    if type_end > j + 1 {
                        edits.push(Edit::delete(toks[j].start, toks[type_end - 1].end));
                        i = type_end;
                        continue;
                    }
                }
                i = j;
                continue;
            }
            _ => {
                if depth == 0 && expect_binder {
                    // Not a declaration after all (e.g. `const` as a word in
                    // some other position). Stop scanning.
                    break;
                }
            }
        }
        i += 1;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stripped(source: &str) -> String {
        strip_types(source).unwrap()
    }

    // ── SourceKind ───────────────────────────────────────────────────

    #[test]
    fn kind_from_extension() {
        assert_eq!(SourceKind::from_extension("js"), Some(SourceKind::Script));
        assert_eq!(SourceKind::from_extension("jsx"), Some(SourceKind::Markup));
        assert_eq!(SourceKind::from_extension("ts"), Some(SourceKind::Typed));
        assert_eq!(
            SourceKind::from_extension("tsx"),
            Some(SourceKind::TypedMarkup)
        );
        assert_eq!(SourceKind::from_extension("css"), None);
    }

    // ── Variable annotations ─────────────────────────────────────────

    #[test]
    fn strips_variable_annotation() {
        assert_eq!(stripped("const x: number = 1;"), "const x = 1;");
    }

    #[test]
    fn strips_annotation_without_initializer() {
        assert_eq!(stripped("let name: string;"), "let name;");
    }

    #[test]
    fn strips_generic_annotation() {
        assert_eq!(
            stripped("const m: Map<string, number> = new Map();"),
            "const m = new Map();"
        );
    }

    #[test]
    fn strips_union_annotation() {
        assert_eq!(
            stripped("let size: number | string = 10;"),
            "let size = 10;"
        );
    }

    #[test]
    fn strips_multiple_declarators() {
        assert_eq!(
            stripped("const a: number = 1, b: string = \"x\";"),
            "const a = 1, b = \"x\";"
        );
    }

    #[test]
    fn strips_destructuring_annotation() {
        assert_eq!(
            stripped("const { x, y }: Point = origin;"),
            "const { x, y } = origin;"
        );
    }

    #[test]
    fn object_literal_colons_are_untouched() {
        let source = "const style = { width: 100, color: \"red\" };";
        assert_eq!(stripped(source), source);
    }

    #[test]
    fn ternary_colon_is_untouched() {
        let source = "const v = big ? 100 : 10;";
        assert_eq!(stripped(source), source);
    }

    // ── Function annotations ─────────────────────────────────────────

    #[test]
    fn strips_function_params_and_return() {
        assert_eq!(
            stripped("function pad(value: string, width: number): string { return value; }"),
            "function pad(value, width) { return value; }"
        );
    }

    #[test]
    fn strips_optional_parameter() {
        assert_eq!(
            stripped("function f(x?: number) { return x; }"),
            "function f(x) { return x; }"
        );
    }

    #[test]
    fn strips_arrow_annotations() {
        assert_eq!(
            stripped("const add = (a: number, b: number): number => a + b;"),
            "const add = (a, b) => a + b;"
        );
    }

    #[test]
    fn strips_rest_parameter_annotation() {
        assert_eq!(
            stripped("function f(...args: string[]) {}"),
            "function f(...args) {}"
        );
    }

    #[test]
    fn strips_destructured_parameter_annotation() {
        assert_eq!(
            stripped("function f({ id, x }: Props) { return id; }"),
            "function f({ id, x }) { return id; }"
        );
    }

    #[test]
    fn strips_default_value_annotation() {
        assert_eq!(
            stripped("function f(n: number = 3) { return n; }"),
            "function f(n = 3) { return n; }"
        );
    }

    #[test]
    fn strips_function_type_params() {
        assert_eq!(
            stripped("function id<T>(x: T): T { return x; }"),
            "function id(x) { return x; }"
        );
    }

    #[test]
    fn call_arguments_are_untouched() {
        let source = "render(cond ? a : b, { x: 1 });";
        assert_eq!(stripped(source), source);
    }

    #[test]
    fn strips_method_annotations() {
        assert_eq!(
            stripped("class C { area(scale: number): number { return scale; } }"),
            "class C { area(scale) { return scale; } }"
        );
    }

    #[test]
    fn strips_catch_annotation() {
        assert_eq!(
            stripped("try { f(); } catch (e: unknown) { log(e); }"),
            "try { f(); } catch (e) { log(e); }"
        );
    }

    // ── Type aliases and interfaces ──────────────────────────────────

    #[test]
    fn deletes_type_alias() {
        assert_eq!(
            stripped("type Props = { id: string };\nconst x = 1;"),
            "\nconst x = 1;"
        );
    }

    #[test]
    fn deletes_generic_type_alias() {
        assert_eq!(
            stripped("type Pair<A, B> = [A, B];\nlet p = [1, 2];"),
            "\nlet p = [1, 2];"
        );
    }

    #[test]
    fn deletes_interface() {
        assert_eq!(
            stripped("interface Widget { id: string; render(): void }\nconst w = 1;"),
            "\nconst w = 1;"
        );
    }

    #[test]
    fn deletes_exported_type_alias() {
        assert_eq!(
            stripped("export type Props = { id: string };\nexport const x = 1;"),
            "\nexport const x = 1;"
        );
    }

    #[test]
    fn type_as_identifier_survives() {
        let source = "const type = \"digital\"; use(type);";
        assert_eq!(stripped(source), source);
    }

    // ── Assertions ───────────────────────────────────────────────────

    #[test]
    fn strips_as_assertion() {
        assert_eq!(
            stripped("const el = node as HTMLElement;"),
            "const el = node;"
        );
    }

    #[test]
    fn strips_as_const() {
        assert_eq!(stripped("const dirs = [1, 2] as const;"), "const dirs = [1, 2];");
    }

    #[test]
    fn strips_satisfies() {
        assert_eq!(
            stripped("const cfg = { x: 1 } satisfies Config;"),
            "const cfg = { x: 1 };"
        );
    }

    #[test]
    fn import_alias_as_survives() {
        let source = "import { trim as t } from \"./utils\";";
        assert_eq!(stripped(source), source);
    }

    #[test]
    fn strips_non_null_assertion() {
        assert_eq!(stripped("const v = lookup(id)!.value;"), "const v = lookup(id).value;");
    }

    #[test]
    fn negation_is_untouched() {
        let source = "const no = !flag;";
        assert_eq!(stripped(source), source);
    }

    #[test]
    fn inequality_is_untouched() {
        let source = "if (a !== b) { go(); }";
        assert_eq!(stripped(source), source);
    }

    // ── Type-only imports/exports ────────────────────────────────────

    #[test]
    fn deletes_type_only_import() {
        assert_eq!(
            stripped("import type { Props } from \"./types\";\nconst x = 1;"),
            "\nconst x = 1;"
        );
    }

    #[test]
    fn deletes_type_member_keeps_runtime_members() {
        assert_eq!(
            stripped("import { type Props, render } from \"./m\";"),
            "import { render } from \"./m\";"
        );
    }

    #[test]
    fn deletes_import_where_all_members_are_types() {
        assert_eq!(
            stripped("import { type A, type B } from \"./m\";\nrun();"),
            "\nrun();"
        );
    }

    #[test]
    fn deletes_export_type_list() {
        assert_eq!(
            stripped("export type { Props } from \"./types\";\nexport const x = 1;"),
            "\nexport const x = 1;"
        );
    }

    // ── Class clauses ────────────────────────────────────────────────

    #[test]
    fn strips_extends_type_arguments() {
        assert_eq!(
            stripped("class List extends Base<Item> { }"),
            "class List extends Base { }"
        );
    }

    #[test]
    fn strips_implements_clause() {
        assert_eq!(
            stripped("class Clock implements Tickable { }"),
            "class Clock  { }"
        );
    }

    #[test]
    fn strips_class_type_params() {
        assert_eq!(stripped("class Box<T> { }"), "class Box { }");
    }

    // ── Rejected syntax ──────────────────────────────────────────────

    #[test]
    fn enum_is_rejected() {
        let err = strip_types("enum Color { Red, Green }").unwrap_err();
        assert!(err.to_string().contains("enums"));
    }

    #[test]
    fn namespace_is_rejected() {
        let err = strip_types("namespace Util { }").unwrap_err();
        assert!(err.to_string().contains("namespaces"));
    }

    // ── Statement order and untouched code ───────────────────────────

    #[test]
    fn preserves_statement_order() {
        let source = "const a: number = 1;\ntype T = number;\nconst b: T = 2;";
        assert_eq!(stripped(source), "const a = 1;\n\nconst b = 2;");
    }

    #[test]
    fn comments_survive() {
        let source = "// keep me\nconst x: number = 1; /* and me */";
        assert_eq!(stripped(source), "// keep me\nconst x = 1; /* and me */");
    }

    #[test]
    fn template_literals_survive() {
        let source = "const s: string = `v ${x} w`;";
        assert_eq!(stripped(source), "const s = `v ${x} w`;");
    }

    #[test]
    fn plain_script_passes_through() {
        let source = "const x = 1;\nfunction f(a, b) { return a + b; }\n";
        assert_eq!(transform(source, SourceKind::Script).unwrap(), source);
    }

    #[test]
    fn lex_error_reports_position() {
        let err = transform("const x = @;", SourceKind::Typed).unwrap_err();
        match err {
            TransformError::Syntax { position, .. } => assert_eq!(position, 10),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
