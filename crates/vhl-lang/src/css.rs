#![forbid(unsafe_code)]

//! CSS profile (plain CSS plus the SCSS/Less surface that tokenizes alike).
//!
//! Selectors are tagged `type` once their `{` arrives, property names become
//! keywords at their `:`, and dimensions (`12px`, `1.5em`) and hex colors are
//! numeric.

use vhl_core::{Engine, Language, LanguageConfig, TokenFlags, TokenKind, Tokenizer, is_identifier_char};

pub static CSS: LanguageConfig = LanguageConfig {
    name: "CSS",
    extensions: &["css", "scss", "less"],
    aliases: &["css", "scss", "less"],
    keywords: &[
        "important", "inherit", "initial", "unset", "revert", "auto", "none", "and", "not", "only",
    ],
    operators: &[">", "+", "~", "*", "="],
    multi_line_comment_start: "/*",
    multi_line_comment_end: "*/",
    word_chars: &['-'],
    ..LanguageConfig::DEFAULT
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Css;

/// Create a tokenizer for CSS.
pub fn css_tokenizer() -> Tokenizer {
    Tokenizer::new(Css)
}

/// Whether the text after `from` reaches a `{` before a `;` or `}`, that is
/// whether it still belongs to a selector.
fn selector_ahead(code: &[char], from: usize) -> bool {
    code.iter()
        .skip(from)
        .find(|ch| matches!(ch, '{' | '}' | ';'))
        .is_some_and(|ch| *ch == '{')
}

/// `-?\d+(\.\d+)?` followed by a unit.
fn is_dimension(data: &str) -> bool {
    let digits = data.strip_prefix('-').unwrap_or(data);
    let number_end = digits
        .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
        .unwrap_or(digits.len());
    let (number, unit) = digits.split_at(number_end);
    vhl_core::is_numeric(number) && !unit.is_empty() && unit.chars().all(|ch| ch.is_ascii_alphabetic())
}

fn hex_color_len(code: &[char], hash: usize) -> Option<usize> {
    let len = code
        .iter()
        .skip(hash + 1)
        .take_while(|ch| is_identifier_char(**ch))
        .count();
    let hex = code[hash + 1..hash + 1 + len].iter().all(char::is_ascii_hexdigit);
    (hex && matches!(len, 3 | 4 | 6 | 8)).then_some(len)
}

impl Css {
    /// Retag the plain words of the selector that ends at the current `{`.
    fn tag_selector(cx: &mut Engine) {
        let mut cursor = cx.next_id();
        let mut words = Vec::new();
        while let Some(prev) = cx.get_prev_token(cursor, true) {
            let Some(token) = cx.token(prev) else {
                break;
            };
            match token.data.as_str() {
                "{" | "}" | ";" => break,
                data if data.starts_with('@') => return,
                _ => {}
            }
            if token.is_word() && token.kind.is_none() {
                words.push(prev);
            }
            cursor = prev;
        }
        for id in words {
            cx.retag(id, Some(TokenKind::Type));
        }
    }
}

impl Language for Css {
    fn config(&self) -> &'static LanguageConfig {
        &CSS
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        if cx.is_word_boundary(ch) && is_dimension(cx.batch())
            && let Some(id) = cx.flush_batch()
        {
            cx.retag(id, Some(TokenKind::Numeric));
        }
        let index = cx.index();
        match ch {
            '{' => {
                cx.flush_batch();
                Self::tag_selector(cx);
                false
            }
            ':' if cx.depth().curly > 0 && cx.depth().parenth == 0 => {
                cx.flush_batch();
                if !selector_ahead(cx.code(), index + 1)
                    && let Some(property) = cx.last_non_blank()
                    && cx.token(property).is_some_and(|token| token.is_word() && token.kind.is_none())
                {
                    cx.retag(property, Some(TokenKind::Keyword));
                }
                false
            }
            '@' => {
                let len = cx
                    .code()
                    .iter()
                    .skip(index + 1)
                    .take_while(|ch| is_identifier_char(**ch) || **ch == '-')
                    .count();
                if len == 0 {
                    return false;
                }
                cx.append_forward_lookup_batch(index..index + 1 + len, Some(TokenKind::Keyword), TokenFlags::empty());
                true
            }
            '#' if !selector_ahead(cx.code(), index + 1) => {
                let Some(len) = hex_color_len(cx.code(), index) else {
                    return false;
                };
                cx.append_forward_lookup_batch(index..index + 1 + len, Some(TokenKind::Numeric), TokenFlags::empty());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vhl_core::{Token, TokenStream};

    fn tokenize(code: &str) -> TokenStream {
        css_tokenizer().tokenize(code).unwrap()
    }

    fn find<'a>(stream: &'a TokenStream, data: &str) -> &'a Token {
        stream
            .tokens()
            .iter()
            .find(|token| token.data == data)
            .unwrap_or_else(|| panic!("no token {data:?}"))
    }

    #[test]
    fn dimensions_are_numeric() {
        assert!(is_dimension("12px"));
        assert!(is_dimension("-1.5em"));
        assert!(!is_dimension("12"));
        assert!(!is_dimension("px"));
        assert!(!is_dimension("1px2"));
    }

    #[test]
    fn selectors_properties_and_values() {
        let code = "@media screen {\n  .card > h1, #main:hover {\n    font-size: 12px !important;\n    color: #fff;\n    margin: rgba(0, 0, 0, 0.5);\n  }\n}\n";
        let stream = tokenize(code);
        assert_eq!(stream.text(), code);
        assert!(find(&stream, "@media").is(TokenKind::Keyword));
        assert_eq!(find(&stream, "screen").kind, None);
        for selector in ["card", "h1", "main", "hover"] {
            assert!(find(&stream, selector).is(TokenKind::Type), "{selector}");
        }
        assert!(find(&stream, "font-size").is(TokenKind::Keyword));
        assert!(find(&stream, "color").is(TokenKind::Keyword));
        assert!(find(&stream, "12px").is(TokenKind::Numeric));
        assert!(find(&stream, "#fff").is(TokenKind::Numeric));
        assert!(find(&stream, "important").is(TokenKind::Keyword));
        assert!(find(&stream, "rgba").is(TokenKind::Type));
        assert!(find(&stream, "0.5").is(TokenKind::Numeric));
        assert_eq!(find(&stream, ">").kind, Some(TokenKind::Operator));
    }

    #[test]
    fn comments_and_urls() {
        let stream = tokenize("a { background: url(http://x.org/a.png); } /* note */\n");
        assert!(find(&stream, "/* note */").is(TokenKind::Comment));
        assert!(stream.tokens().iter().filter(|token| token.is_comment()).count() == 1);
        assert!(find(&stream, "a").is(TokenKind::Type));
    }
}
