//! logos-based tokenizer for widget script source.
//!
//! The bundler never builds a full AST: the transformer and the module-syntax
//! scanner both work over this flat token stream, using byte spans back into
//! the original source so untouched text survives verbatim.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `===` beats `==` beats `=`)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Strings, template literals, and comments lex as single opaque tokens so the
//! scanners never look inside them. Template literals and block comments use
//! callback lexers because `${}` interpolation and `*/` terminators are not
//! expressible as a single regex.
//!
//! Regex literals are not recognized; a regex containing an unbalanced quote
//! or brace fails the lex, which fails the bundle for that file instead of
//! silently corrupting output.

use logos::{Lexer, Logos};

/// Script token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Tok {
    // ── Opaque tokens (lexed as a unit) ──────────────────────────────

    /// `// ...` to end of line.
    #[regex(r"//[^\n]*")]
    LineComment,

    /// `/* ... */`, scanned by callback to find the terminator.
    #[token("/*", lex_block_comment)]
    BlockComment,

    /// Double-quoted string literal, escapes allowed.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    /// Single-quoted string literal, escapes allowed.
    #[regex(r"'([^'\\\n]|\\.)*'")]
    StrSingle,

    /// Template literal including nested `${}` interpolations.
    #[token("`", lex_template)]
    Template,

    // ── Words and numbers ────────────────────────────────────────────

    /// Numeric literal: `42`, `1.5`, `0x1f`, `1e3`.
    #[regex(r"[0-9][0-9A-Za-z_$]*(\.[0-9A-Za-z_$]+)?")]
    Number,

    /// Identifier or keyword.
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    // ── Multi-character operators (longer matches, defined first) ────

    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("=>")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token("?.")]
    OptChain,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Coalesce,

    // ── Single-character punctuation ─────────────────────────────────

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
}

impl Tok {
    /// Whether this token is a comment (skipped by the syntax scanners).
    pub fn is_comment(self) -> bool {
        matches!(self, Tok::LineComment | Tok::BlockComment)
    }
}

/// Callback: consume a block comment after the opening `/*`.
fn lex_block_comment(lex: &mut Lexer<Tok>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Callback: consume a template literal after the opening backtick.
///
/// Tracks `${}` interpolations (which may nest further templates and contain
/// plain strings) so an interpolated closing brace or backtick does not end
/// the literal early. Returns `false` on an unterminated literal.
fn lex_template(lex: &mut Lexer<Tok>) -> bool {
    enum Mode {
        Template,
        Expr(u32),
    }

    let bytes = lex.remainder().as_bytes();
    let mut stack = vec![Mode::Template];
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match stack.last_mut() {
            Some(Mode::Template) => match b {
                b'\\' => i += 1,
                b'`' => {
                    stack.pop();
                    if stack.is_empty() {
                        lex.bump(i + 1);
                        return true;
                    }
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(Mode::Expr(0));
                    i += 1;
                }
                _ => {}
            },
            Some(Mode::Expr(depth)) => match b {
                b'{' => *depth += 1,
                b'}' => {
                    if *depth == 0 {
                        stack.pop();
                    } else {
                        *depth -= 1;
                    }
                }
                b'`' => stack.push(Mode::Template),
                b'"' | b'\'' => {
                    // Skip over a plain string inside the interpolation.
                    let quote = b;
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            },
            None => break,
        }
        i += 1;
    }

    false
}

// ---------------------------------------------------------------------------
// Positioned tokens
// ---------------------------------------------------------------------------

/// A token with its byte span in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PTok {
    pub tok: Tok,
    /// Byte offset where this token starts.
    pub start: usize,
    /// Byte offset one past where this token ends.
    pub end: usize,
}

impl PTok {
    /// The source text this token covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Error from lexing: an input position no token matched.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized syntax at byte {position}")]
pub struct LexError {
    pub position: usize,
}

/// Tokenize source into positioned tokens, comments included.
pub fn lex(source: &str) -> Result<Vec<PTok>, LexError> {
    let lexer = Tok::lexer(source);
    let mut tokens = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(tok) => tokens.push(PTok {
                tok,
                start: span.start,
                end: span.end,
            }),
            Err(()) => return Err(LexError {
                position: span.start,
            }),
        }
    }

    Ok(tokens)
}

/// Tokenize source and drop comments, for the syntax scanners.
pub fn lex_significant(source: &str) -> Result<Vec<PTok>, LexError> {
    let mut tokens = lex(source)?;
    tokens.retain(|t| !t.tok.is_comment());
    Ok(tokens)
}

// ===========================================================================
// Tests
// ===========================================================================
