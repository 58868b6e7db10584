#![forbid(unsafe_code)]

//! JavaScript profile.

use vhl_core::{Engine, Language, LanguageConfig, ParenthClose, TokenFlags, TokenId, TokenKind, Tokenizer};

use crate::support;

pub static JAVASCRIPT: LanguageConfig = LanguageConfig {
    name: "JavaScript",
    extensions: &["js", "mjs", "cjs", "jsx"],
    aliases: &["js", "javascript", "jsx", "node"],
    keywords: &[
        "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "export", "extends", "false", "finally", "for", "from",
        "function", "get", "if", "import", "in", "instanceof", "let", "new", "null", "of",
        "return", "set", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
        "undefined", "var", "void", "while", "with", "yield",
    ],
    type_def_keywords: &["class", "function"],
    type_keywords: &["new", "extends", "instanceof"],
    operators: &[
        "+", "-", "*", "/", "%", "**", "=", "==", "===", "!=", "!==", ">", "<", ">=", "<=", "&&",
        "||", "??", "!", "&", "|", "^", "~", "<<", ">>", ">>>", "?", ":", "=>", "+=", "-=", "*=",
        "/=", "%=", "++", "--", "?.", "...",
    ],
    single_line_comment_start: "//",
    multi_line_comment_start: "/*",
    multi_line_comment_end: "*/",
    allow_template_strings: true,
    allow_slash_regexes: true,
    allow_comment_keyword: true,
    allow_comment_codeblock: true,
    allow_decorators: true,
    ..LanguageConfig::DEFAULT
};

/// Keywords allowed before a method name.
const METHOD_PREFIXES: &[&str] = &["static", "async", "get", "set"];

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScript;

/// Create a tokenizer for JavaScript.
pub fn javascript_tokenizer() -> Tokenizer {
    Tokenizer::new(JavaScript)
}

/// `name(...) {` directly inside a class body.
fn is_method(cx: &Engine, name: TokenId, close: &ParenthClose) -> bool {
    let depth = cx.depth();
    let Some(parent) = cx.parents().last() else {
        return false;
    };
    let in_class = cx
        .token(parent.token)
        .is_some_and(|token| token.is(TokenKind::TypeDef) && token.parameters().is_none());
    if !in_class || depth.parenth > 0 || depth.curly as usize != parent.close_id + 1 {
        return false;
    }
    if cx.next_non_whitespace_char(close.after).map(|(_, ch)| ch) != Some('{') {
        return false;
    }
    if support::starts_statement(cx, name) {
        return true;
    }
    cx.get_prev_token(name, true).is_some_and(|prev| {
        let data = cx.data(prev);
        METHOD_PREFIXES.contains(&data) || data == "*"
    })
}

impl Language for JavaScript {
    fn config(&self) -> &'static LanguageConfig {
        &JAVASCRIPT
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        if ch != '{' {
            return false;
        }
        cx.flush_batch();
        let Some(type_def) = cx.pending_scope_token() else {
            return false;
        };
        let marker = support::solid_between(cx, type_def, None)
            .into_iter()
            .find(|id| cx.data(*id) == "extends" && cx.kind(*id) == Some(TokenKind::Keyword));
        if let Some(marker) = marker {
            let entries = support::split_entries(cx, marker, None);
            support::record_inherited(cx, type_def, entries, &[], "extends");
        }
        false
    }

    fn on_parenth_close(&mut self, cx: &mut Engine, close: &ParenthClose) -> Option<TokenId> {
        let before = close.before?;
        if !close.eligible {
            return None;
        }
        let token = cx.token(before)?;
        if token.is(TokenKind::TypeDef) || token.has(TokenFlags::DECORATOR) {
            return Some(before);
        }
        if token.kind.is_none() && is_method(cx, before, close) {
            cx.mark_type_def(before);
            return Some(before);
        }
        cx.default_parenth_target(close)
    }
}
