//! Embedded markup → factory-call rewriting.
//!
//! Markup source kinds may embed element syntax directly in expressions:
//!
//! ```text
//! const view = <div class="clock">{time}</div>;
//! ```
//!
//! [`rewrite_markup`] turns every element into a call to the factory the
//! presentation surface injects into the module realm:
//!
//! ```text
//! const view = h("div", { "class": "clock" }, time);
//! ```
//!
//! Lowercase tag names become string literals; capitalized or dotted names
//! stay as expressions (component references). Fragments (`<>...</>`) call
//! `h(Fragment, null, ...)`. Attribute expressions and expression children
//! are rewritten recursively, so elements nest to any depth.
//!
//! Text children collapse interior whitespace to single spaces; an edge
//! space survives when it adjoins another child on the same line, while
//! newline-bounded whitespace (indentation between elements) is dropped.
//!
//! This pass runs on raw characters, before type stripping, because markup
//! text content is free-form prose that the script tokenizer would reject.
//! It tracks strings, templates, and comments itself and leaves everything
//! outside elements byte-for-byte intact. Markup inside template literal
//! interpolations is not rewritten.

use crate::bundle::transform::TransformError;

/// The factory call target. Injected into the module realm by the
/// presentation surface together with [`FRAGMENT_NAME`].
pub const FACTORY_NAME: &str = "h";

/// Expression used as the tag for fragments.
pub const FRAGMENT_NAME: &str = "Fragment";

/// Rewrite every embedded markup element in `source` into factory calls.
pub fn rewrite_markup(source: &str) -> Result<String, TransformError> {
    let mut walker = Walker::new(source);
    let mut out = String::with_capacity(source.len() + 64);
    walker.rewrite_until(&mut out, false)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Character cursor over the source. Tracks just enough context (the last
/// two significant characters and the last word) to tell an element opener
/// from a comparison or generic `<`.
struct Walker<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    last_sig: Option<char>,
    prev_sig: Option<char>,
    last_word: String,
}

/// Words after which a `<` starts an expression.
const EXPR_WORDS: [&str; 7] = ["return", "default", "case", "yield", "await", "do", "else"];

impl<'a> Walker<'a> {
    fn new(src: &'a str) -> Self {
        Walker {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            last_sig: None,
            prev_sig: None,
            last_word: String::new(),
        }
    }

    fn err(&self, position: usize, message: impl Into<String>) -> TransformError {
        TransformError::Syntax {
            position,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn note(&mut self, c: char) {
        if c.is_whitespace() {
            return;
        }
        self.prev_sig = self.last_sig;
        self.last_sig = Some(c);
        if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
            self.last_word.push(c);
        } else {
            self.last_word.clear();
        }
    }

    /// Copy source to `out`, rewriting elements, until end of input or (when
    /// `stop_at_close` is set) an unmatched `}` — the cursor is left on it.
    fn rewrite_until(&mut self, out: &mut String, stop_at_close: bool) -> Result<(), TransformError> {
        let mut depth: i32 = 0;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' => self.copy_string(out, b)?,
                b'`' => self.copy_template(out)?,
                b'/' if self.peek_at(1) == Some(b'/') => self.copy_line_comment(out),
                b'/' if self.peek_at(1) == Some(b'*') => self.copy_block_comment(out)?,
                b'{' => {
                    depth += 1;
                    out.push('{');
                    self.note('{');
                    self.pos += 1;
                }
                b'}' => {
                    if depth == 0 && stop_at_close {
                        return Ok(());
                    }
                    depth -= 1;
                    out.push('}');
                    self.note('}');
                    self.pos += 1;
                }
                b'<' if self.at_element_start() => {
                    let call = self.parse_element()?;
                    out.push_str(&call);
                    // A finished call behaves like a parenthesized expression.
                    self.note(')');
                }
                _ => {
                    let c = self.char_at(self.pos);
                    out.push(c);
                    self.note(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        if stop_at_close {
            return Err(self.err(self.src.len(), "unterminated expression in markup"));
        }
        Ok(())
    }

    fn char_at(&self, pos: usize) -> char {
        self.src[pos..].chars().next().unwrap_or('\u{fffd}')
    }

    /// Does the `<` under the cursor open an element rather than a comparison
    /// or type argument list?
    fn at_element_start(&self) -> bool {
        let next = match self.peek_at(1) {
            Some(n) => n,
            None => return false,
        };
        let opener = next.is_ascii_alphabetic() || next == b'_' || next == b'$' || next == b'>';
        if !opener {
            return false;
        }
        match self.last_sig {
            None => true,
            // `=>` ends in '>' but puts us in expression position.
            Some('>') => self.prev_sig == Some('='),
            Some(c) if "([{,=:?;!&|".contains(c) => true,
            _ => EXPR_WORDS.contains(&self.last_word.as_str()),
        }
    }

    // ── Raw copies ───────────────────────────────────────────────────

    fn copy_string(&mut self, out: &mut String, quote: u8) -> Result<(), TransformError> {
        let start = self.pos;
        out.push(quote as char);
        self.pos += 1;
        while let Some(b) = self.peek() {
            let c = self.char_at(self.pos);
            out.push(c);
            self.pos += c.len_utf8();
            if b == b'\\' {
                if self.pos < self.bytes.len() {
                    let esc = self.char_at(self.pos);
                    out.push(esc);
                    self.pos += esc.len_utf8();
                }
            } else if b == quote {
                self.note('"');
                return Ok(());
            }
        }
        Err(self.err(start, "unterminated string literal"))
    }

    fn copy_template(&mut self, out: &mut String) -> Result<(), TransformError> {
        let start = self.pos;
        out.push('`');
        self.pos += 1;
        // Interpolation nesting; contents pass through unchanged.
        let mut stack: Vec<i32> = Vec::new();
        while let Some(b) = self.peek() {
            let c = self.char_at(self.pos);
            match b {
                b'\\' => {
                    out.push(c);
                    self.pos += 1;
                    if self.peek().is_some() {
                        let esc = self.char_at(self.pos);
                        out.push(esc);
                        self.pos += esc.len_utf8();
                    }
                }
                b'`' if stack.is_empty() => {
                    out.push('`');
                    self.pos += 1;
                    self.note('"');
                    return Ok(());
                }
                b'$' if stack.is_empty() && self.peek_at(1) == Some(b'{') => {
                    out.push_str("${");
                    self.pos += 2;
                    stack.push(0);
                }
                b'{' if !stack.is_empty() => {
                    *stack.last_mut().unwrap() += 1;
                    out.push('{');
                    self.pos += 1;
                }
                b'}' if !stack.is_empty() => {
                    let top = stack.last_mut().unwrap();
                    if *top == 0 {
                        stack.pop();
                    } else {
                        *top -= 1;
                    }
                    out.push('}');
                    self.pos += 1;
                }
                _ => {
                    out.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
        Err(self.err(start, "unterminated template literal"))
    }

    fn copy_line_comment(&mut self, out: &mut String) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            let c = self.char_at(self.pos);
            out.push(c);
            self.pos += c.len_utf8();
        }
    }

    fn copy_block_comment(&mut self, out: &mut String) -> Result<(), TransformError> {
        let start = self.pos;
        out.push_str("/*");
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                out.push_str("*/");
                self.pos += 2;
                return Ok(());
            }
            let c = self.char_at(self.pos);
            out.push(c);
            self.pos += c.len_utf8();
        }
        Err(self.err(start, "unterminated block comment"))
    }

    // ── Element parsing ──────────────────────────────────────────────

    fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if !(b as char).is_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_tag_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let c = b as char;
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    /// Parse one element with the cursor on its `<`; returns the factory call.
    fn parse_element(&mut self) -> Result<String, TransformError> {
        let open_at = self.pos;
        self.pos += 1; // past '<'
        let name = self.read_tag_name();
        let fragment = name.is_empty();
        if fragment && self.peek() != Some(b'>') {
            return Err(self.err(open_at, "expected a tag name after `<`"));
        }

        let tag_expr = if fragment {
            FRAGMENT_NAME.to_string()
        } else if name.starts_with(|c: char| c.is_ascii_lowercase()) && !name.contains('.') {
            serde_json::to_string(&name).unwrap_or_default()
        } else {
            name.clone()
        };

        // Attributes.
        let mut props: Vec<String> = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(self.err(open_at, format!("unclosed element `<{name}`"))),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(render_call(&tag_expr, &props, &[]));
                }
                Some(b'{') => {
                    // Spread attribute: `{...expr}`.
                    self.pos += 1;
                    self.skip_ws();
                    if self.src[self.pos..].starts_with("...") {
                        self.pos += 3;
                    } else {
                        return Err(self.err(self.pos, "expected `...` in spread attribute"));
                    }
                    let expr = self.rewrite_expression()?;
                    props.push(format!("...{}", expr.trim()));
                }
                Some(_) => {
                    let attr_at = self.pos;
                    let attr = self.read_tag_name();
                    if attr.is_empty() {
                        return Err(self.err(attr_at, "expected an attribute name"));
                    }
                    let key = serde_json::to_string(&attr).unwrap_or_default();
                    self.skip_ws();
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.skip_ws();
                        match self.peek() {
                            Some(q @ (b'"' | b'\'')) => {
                                let mut value = String::new();
                                self.copy_string(&mut value, q)?;
                                props.push(format!("{key}: {value}"));
                            }
                            Some(b'{') => {
                                self.pos += 1;
                                let expr = self.rewrite_expression()?;
                                props.push(format!("{key}: {}", expr.trim()));
                            }
                            _ => {
                                return Err(self.err(
                                    self.pos,
                                    format!("expected a value for attribute `{attr}`"),
                                ))
                            }
                        }
                    } else {
                        // Bare attribute is shorthand for `true`.
                        props.push(format!("{key}: true"));
                    }
                }
            }
        }

        // Children, up to the matching close tag.
        let mut children: Vec<String> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.err(open_at, format!("unclosed element `<{name}`"))),
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    self.pos += 2;
                    let close = self.read_tag_name();
                    self.skip_ws();
                    if self.peek() != Some(b'>') {
                        return Err(self.err(self.pos, "expected `>` to end a closing tag"));
                    }
                    self.pos += 1;
                    if close != name {
                        return Err(self.err(
                            open_at,
                            format!("mismatched closing tag: `<{name}>` closed by `</{close}>`"),
                        ));
                    }
                    return Ok(render_call(&tag_expr, &props, &children));
                }
                Some(b'<') => {
                    let nested = self.parse_element()?;
                    children.push(nested);
                }
                Some(b'{') => {
                    self.pos += 1;
                    let expr = self.rewrite_expression()?;
                    let trimmed = expr.trim();
                    // `{/* note */}` and empty braces contribute nothing.
                    if !trimmed.is_empty() && !is_only_comment(trimmed) {
                        children.push(trimmed.to_string());
                    }
                }
                Some(_) => {
                    let text = self.read_text();
                    let abuts_next = match self.peek() {
                        Some(b'{') => true,
                        Some(b'<') => self.peek_at(1) != Some(b'/'),
                        _ => false,
                    };
                    let collapsed = collapse_text(&text, !children.is_empty(), abuts_next);
                    if !collapsed.is_empty() {
                        children.push(serde_json::to_string(&collapsed).unwrap_or_default());
                    }
                }
            }
        }
    }

    /// Rewrite an attribute or child expression; cursor is just past the
    /// opening `{`, and ends just past the matching `}`.
    fn rewrite_expression(&mut self) -> Result<String, TransformError> {
        let mut inner = Walker::new(self.src);
        inner.pos = self.pos;
        let mut out = String::new();
        inner.rewrite_until(&mut out, true)?;
        if inner.peek() != Some(b'}') {
            return Err(self.err(self.pos, "unterminated expression in markup"));
        }
        self.pos = inner.pos + 1;
        Ok(out)
    }

    /// Raw text run until the next `<` or `{`.
    fn read_text(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' || b == b'{' {
                break;
            }
            self.pos += self.char_at(self.pos).len_utf8();
        }
        self.src[start..self.pos].to_string()
    }
}

/// Collapse a text run: interior whitespace becomes one space. An edge
/// space survives as one space only when it contains no newline and another
/// child adjoins that edge; newline-bounded whitespace is layout
/// indentation, not content.
fn collapse_text(raw: &str, after_child: bool, before_child: bool) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let keep_leading = after_child
        && raw.starts_with(|c: char| c.is_whitespace())
        && !raw[..raw.len() - raw.trim_start().len()].contains('\n');
    let keep_trailing = before_child
        && raw.ends_with(|c: char| c.is_whitespace())
        && !raw[raw.trim_end().len()..].contains('\n');
    if words.is_empty() {
        // A plain space between two children is content in its own right.
        return if keep_leading && keep_trailing {
            " ".to_string()
        } else {
            String::new()
        };
    }
    let mut text = String::new();
    if keep_leading {
        text.push(' ');
    }
    text.push_str(&words.join(" "));
    if keep_trailing {
        text.push(' ');
    }
    text
}

fn render_call(tag: &str, props: &[String], children: &[String]) -> String {
    let props_expr = if props.is_empty() {
        "null".to_string()
    } else {
        format!("{{ {} }}", props.join(", "))
    };
    let mut call = format!("{FACTORY_NAME}({tag}, {props_expr}");
    for child in children {
        call.push_str(", ");
        call.push_str(child);
    }
    call.push(')');
    call
}

fn is_only_comment(expr: &str) -> bool {
    let t = expr.trim();
    (t.starts_with("/*") && t.ends_with("*/") && !t[2..t.len() - 2].contains("*/"))
        || (t.starts_with("//") && !t.contains('\n'))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewritten(source: &str) -> String {
        rewrite_markup(source).unwrap()
    }

    // ── Elements ─────────────────────────────────────────────────────

    #[test]
    fn self_closing_element() {
        assert_eq!(rewritten("const v = <br/>;"), "const v = h(\"br\", null);");
    }

    #[test]
    fn element_with_text_child() {
        assert_eq!(
            rewritten("const v = <span>hello</span>;"),
            "const v = h(\"span\", null, \"hello\");"
        );
    }

    #[test]
    fn free_form_text_is_quoted() {
        assert_eq!(
            rewritten("const v = <p>It's 5 o'clock!</p>;"),
            "const v = h(\"p\", null, \"It's 5 o'clock!\");"
        );
    }

    #[test]
    fn component_tag_stays_an_expression() {
        assert_eq!(
            rewritten("const v = <Clock/>;"),
            "const v = h(Clock, null);"
        );
    }

    #[test]
    fn dotted_tag_stays_an_expression() {
        assert_eq!(
            rewritten("const v = <Widgets.Clock/>;"),
            "const v = h(Widgets.Clock, null);"
        );
    }

    #[test]
    fn fragment() {
        assert_eq!(
            rewritten("const v = <><br/><hr/></>;"),
            "const v = h(Fragment, null, h(\"br\", null), h(\"hr\", null));"
        );
    }

    // ── Attributes ───────────────────────────────────────────────────

    #[test]
    fn string_attribute() {
        assert_eq!(
            rewritten("const v = <div class=\"clock\"/>;"),
            "const v = h(\"div\", { \"class\": \"clock\" });"
        );
    }

    #[test]
    fn expression_attribute() {
        assert_eq!(
            rewritten("const v = <div width={size * 2}/>;"),
            "const v = h(\"div\", { \"width\": size * 2 });"
        );
    }

    #[test]
    fn bare_attribute_is_true() {
        assert_eq!(
            rewritten("const v = <input disabled/>;"),
            "const v = h(\"input\", { \"disabled\": true });"
        );
    }

    #[test]
    fn dashed_attribute_is_quoted() {
        assert_eq!(
            rewritten("const v = <div data-id={id}/>;"),
            "const v = h(\"div\", { \"data-id\": id });"
        );
    }

    #[test]
    fn spread_attribute() {
        assert_eq!(
            rewritten("const v = <div {...rest} id=\"x\"/>;"),
            "const v = h(\"div\", { ...rest, \"id\": \"x\" });"
        );
    }

    // ── Children ─────────────────────────────────────────────────────

    #[test]
    fn expression_child() {
        assert_eq!(
            rewritten("const v = <span>{time}</span>;"),
            "const v = h(\"span\", null, time);"
        );
    }

    #[test]
    fn mixed_children() {
        assert_eq!(
            rewritten("const v = <p>at {time} sharp</p>;"),
            "const v = h(\"p\", null, \"at \", time, \" sharp\");"
        );
    }

    #[test]
    fn inline_space_between_elements_survives() {
        assert_eq!(
            rewritten("const v = <p><b>a</b> <b>b</b></p>;"),
            "const v = h(\"p\", null, h(\"b\", null, \"a\"), \" \", h(\"b\", null, \"b\"));"
        );
    }

    #[test]
    fn nested_elements() {
        assert_eq!(
            rewritten("const v = <div><span>{a}</span></div>;"),
            "const v = h(\"div\", null, h(\"span\", null, a));"
        );
    }

    #[test]
    fn element_inside_expression_child() {
        assert_eq!(
            rewritten("const v = <ul>{items.map((i) => <li>{i}</li>)}</ul>;"),
            "const v = h(\"ul\", null, items.map((i) => h(\"li\", null, i)));"
        );
    }

    #[test]
    fn comment_only_expression_is_dropped() {
        assert_eq!(
            rewritten("const v = <div>{/* note */}</div>;"),
            "const v = h(\"div\", null);"
        );
    }

    #[test]
    fn whitespace_between_elements_is_dropped() {
        assert_eq!(
            rewritten("const v = <div>\n  <br/>\n  <hr/>\n</div>;"),
            "const v = h(\"div\", null, h(\"br\", null), h(\"hr\", null));"
        );
    }

    // ── Position detection ───────────────────────────────────────────

    #[test]
    fn comparison_is_untouched() {
        let source = "const small = a < b;";
        assert_eq!(rewritten(source), source);
    }

    #[test]
    fn generic_annotation_is_untouched() {
        let source = "const m: Map<string, number> = new Map();";
        assert_eq!(rewritten(source), source);
    }

    #[test]
    fn return_position_opens_element() {
        assert_eq!(
            rewritten("function f() { return <br/>; }"),
            "function f() { return h(\"br\", null); }"
        );
    }

    #[test]
    fn arrow_body_opens_element() {
        assert_eq!(
            rewritten("const f = () => <br/>;"),
            "const f = () => h(\"br\", null);"
        );
    }

    #[test]
    fn markup_inside_string_is_untouched() {
        let source = "const s = \"<div>not markup</div>\";";
        assert_eq!(rewritten(source), source);
    }

    #[test]
    fn markup_inside_comment_is_untouched() {
        let source = "// <div/> in prose\nconst x = 1;";
        assert_eq!(rewritten(source), source);
    }

    // ── Failures ─────────────────────────────────────────────────────

    #[test]
    fn unclosed_element_is_an_error() {
        let err = rewrite_markup("const v = <div>never closed;").unwrap_err();
        assert!(err.to_string().contains("unclosed element"));
    }

    #[test]
    fn mismatched_close_is_an_error() {
        let err = rewrite_markup("const v = <div></span>;").unwrap_err();
        assert!(err.to_string().contains("mismatched closing tag"));
    }
}
