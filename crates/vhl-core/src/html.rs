#![forbid(unsafe_code)]

//! Token stream to tagged markup.

use std::fmt::Write as _;

use crate::stream::TokenStream;
use crate::token::Token;

/// Rendering options for [`build_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Prepended to the kind name in every class attribute.
    pub token_prefix: String,
    /// Escape `<` and `>` in token text.
    pub reformat: bool,
    /// Drop leading and trailing whitespace and line-break tokens.
    pub trim: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            token_prefix: "token_".to_string(),
            reformat: true,
            trim: false,
        }
    }
}

fn push_text(out: &mut String, data: &str, reformat: bool) {
    if !reformat {
        out.push_str(data);
        return;
    }
    for ch in data.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Serialize `stream`, wrapping every tagged token in
/// `<span class="{prefix}{kind}">`.
pub fn build_html(stream: &TokenStream, options: &HtmlOptions) -> String {
    let mut tokens: &[Token] = stream.tokens();
    if options.trim {
        let start = tokens
            .iter()
            .position(|token| !token.is_blank())
            .unwrap_or(tokens.len());
        let end = tokens
            .iter()
            .rposition(|token| !token.is_blank())
            .map_or(start, |last| last + 1);
        tokens = &tokens[start..end.max(start)];
    }

    let mut out = String::with_capacity(tokens.iter().map(|token| token.data.len()).sum::<usize>() * 2);
    for token in tokens {
        match token.kind {
            Some(kind) => {
                let _ = write!(out, "<span class=\"{}{}\">", options.token_prefix, kind);
                push_text(&mut out, &token.data, options.reformat);
                out.push_str("</span>");
            }
            None => push_text(&mut out, &token.data, options.reformat),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenFlags, TokenKind};

    fn stream() -> TokenStream {
        TokenStream::from_tokens(vec![
            Token::new("\n", None).with_flags(TokenFlags::LINE_BREAK | TokenFlags::WORD_BOUNDARY),
            Token::new("if", Some(TokenKind::Keyword)),
            Token::new(" ", None).with_flags(TokenFlags::WHITESPACE | TokenFlags::WORD_BOUNDARY),
            Token::new("a", None),
            Token::new("<", Some(TokenKind::Operator)).with_flags(TokenFlags::WORD_BOUNDARY),
            Token::new("b", None),
            Token::new("  ", None).with_flags(TokenFlags::WHITESPACE | TokenFlags::WORD_BOUNDARY),
        ])
    }

    #[test]
    fn wraps_tagged_tokens_and_escapes() {
        let html = build_html(&stream(), &HtmlOptions::default());
        assert_eq!(
            html,
            "\n<span class=\"token_keyword\">if</span> a<span class=\"token_operator\">&lt;</span>b  "
        );
    }

    #[test]
    fn raw_output_and_trim() {
        let options = HtmlOptions {
            token_prefix: "hl-".into(),
            reformat: false,
            trim: true,
        };
        let html = build_html(&stream(), &options);
        assert_eq!(
            html,
            "<span class=\"hl-keyword\">if</span> a<span class=\"hl-operator\"><</span>b"
        );
    }

    #[test]
    fn empty_stream_renders_nothing() {
        let options = HtmlOptions {
            trim: true,
            ..HtmlOptions::default()
        };
        assert_eq!(build_html(&TokenStream::new(), &options), "");
    }
}
