#![forbid(unsafe_code)]

//! HTML profile.
//!
//! Tags are claimed whole by a lookahead at every `<`: the tag name becomes a
//! keyword, attribute names parameters and attribute values strings. The
//! bodies of `<script>` and `<style>` are tokenized by the JavaScript and CSS
//! profiles and spliced in; verbatim elements keep their body as plain text.

use std::ops::Range;

use tracing::debug;
use vhl_core::{Engine, Language, LanguageConfig, Token, TokenFlags, TokenKind, Tokenizer, is_identifier_char};

use crate::css::css_tokenizer;
use crate::js::javascript_tokenizer;

pub static HTML: LanguageConfig = LanguageConfig {
    name: "HTML",
    extensions: &["html", "htm", "xhtml", "xml", "svg"],
    aliases: &["html", "xhtml", "xml", "svg"],
    multi_line_comment_start: "<!--",
    multi_line_comment_end: "-->",
    allow_strings: false,
    allow_numerics: false,
    allow_parameters: false,
    ..LanguageConfig::DEFAULT
};

/// Elements whose body is never parsed as markup.
const VERBATIM: &[&str] = &["pre", "textarea", "xmp", "listing", "plaintext"];

/// Holds the embedded tokenizers, created on first use.
#[derive(Debug, Default)]
pub struct Html {
    script: Option<Tokenizer>,
    style: Option<Tokenizer>,
}

/// Create a tokenizer for HTML and XML-like markup.
pub fn html_tokenizer() -> Tokenizer {
    Tokenizer::new(Html::default())
}

// ---------------------------------------------------------------------------
// Tag lookahead
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    range: Range<usize>,
    kind: Option<TokenKind>,
    flags: TokenFlags,
}

impl Piece {
    fn new(range: Range<usize>, kind: Option<TokenKind>, flags: TokenFlags) -> Self {
        Self { range, kind, flags }
    }

    fn boundary(range: Range<usize>) -> Self {
        Self::new(range, None, TokenFlags::WORD_BOUNDARY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    pieces: Vec<Piece>,
    /// Index right after the closing `>`.
    end: usize,
    name: String,
    /// Whether a body follows: an opening tag that is not self-closing.
    opens_body: bool,
}

fn is_name_char(ch: char) -> bool {
    is_identifier_char(ch) || matches!(ch, '-' | ':' | '.')
}

/// Scan the tag whose `<` sits at `start`. Returns `None` when the text is
/// not a complete tag.
fn scan_tag(code: &[char], start: usize) -> Option<Tag> {
    if matches!(code.get(start + 1), Some('!' | '?')) {
        let end = start + code[start..].iter().position(|ch| *ch == '>')? + 1;
        return Some(Tag {
            pieces: vec![Piece::new(start..end, Some(TokenKind::Preprocessor), TokenFlags::PREPROCESSOR)],
            end,
            name: String::new(),
            opens_body: false,
        });
    }

    let closing = code.get(start + 1) == Some(&'/');
    let name_start = (start + 1 + usize::from(closing)).min(code.len());
    let name_end = name_start + code[name_start..].iter().take_while(|ch| is_name_char(**ch)).count();
    if name_end == name_start || !code[name_start].is_alphabetic() {
        return None;
    }
    let mut pieces = vec![
        Piece::boundary(start..name_start),
        Piece::new(name_start..name_end, Some(TokenKind::Keyword), TokenFlags::empty()),
    ];
    let name: String = code[name_start..name_end].iter().collect();

    let mut i = name_end;
    let mut after_eq = false;
    loop {
        let ch = *code.get(i)?;
        let from = i;
        match ch {
            '>' => {
                pieces.push(Piece::boundary(i..i + 1));
                return Some(Tag {
                    pieces,
                    end: i + 1,
                    name,
                    opens_body: !closing,
                });
            }
            '/' if code.get(i + 1) == Some(&'>') => {
                pieces.push(Piece::boundary(i..i + 2));
                return Some(Tag {
                    pieces,
                    end: i + 2,
                    name,
                    opens_body: false,
                });
            }
            '<' => return None,
            ch if ch.is_whitespace() => {
                i += code[i..].iter().take_while(|ch| ch.is_whitespace()).count();
                pieces.push(Piece::new(
                    from..i,
                    None,
                    TokenFlags::WHITESPACE | TokenFlags::WORD_BOUNDARY,
                ));
                continue;
            }
            '=' => {
                i += 1;
                pieces.push(Piece::new(from..i, Some(TokenKind::Operator), TokenFlags::WORD_BOUNDARY));
                after_eq = true;
                continue;
            }
            '"' | '\'' => {
                i = i + 1 + code[i + 1..].iter().position(|quote| *quote == ch)? + 1;
                pieces.push(Piece::new(from..i, Some(TokenKind::String), TokenFlags::STR));
            }
            _ => {
                while let Some(&ch) = code.get(i)
                    && !ch.is_whitespace()
                    && !matches!(ch, '>' | '=' | '"' | '\'' | '<')
                    && !(ch == '/' && code.get(i + 1) == Some(&'>'))
                {
                    i += 1;
                }
                let piece = if after_eq {
                    Piece::new(from..i, Some(TokenKind::String), TokenFlags::STR)
                } else {
                    Piece::new(from..i, Some(TokenKind::Parameter), TokenFlags::empty())
                };
                pieces.push(piece);
            }
        }
        after_eq = false;
    }
}

/// Index of the `</name` closing an element body that starts at `from`, or
/// the end of the text.
fn closing_tag(code: &[char], from: usize, name: &str) -> usize {
    let name: Vec<char> = name.chars().collect();
    (from..code.len())
        .find(|&i| {
            code[i] == '<'
                && code.get(i + 1) == Some(&'/')
                && code
                    .get(i + 2..i + 2 + name.len())
                    .is_some_and(|tag| tag.iter().zip(&name).all(|(a, b)| a.eq_ignore_ascii_case(b)))
                && code.get(i + 2 + name.len()).is_none_or(|ch| !is_name_char(*ch))
        })
        .unwrap_or(code.len())
}

impl Html {
    /// Emit the body of an element opened by `tag`, if its content is not
    /// markup.
    fn embed_body(&mut self, cx: &mut Engine, tag: &Tag) {
        let name = tag.name.to_ascii_lowercase();
        let tokenizer = match name.as_str() {
            "script" => Some(self.script.get_or_insert_with(javascript_tokenizer)),
            "style" => Some(self.style.get_or_insert_with(css_tokenizer)),
            name if VERBATIM.contains(&name) => None,
            _ => return,
        };
        let end = closing_tag(cx.code(), tag.end, &name);
        if end == tag.end {
            return;
        }
        if let Some(tokenizer) = tokenizer {
            let body: String = cx.code()[tag.end..end].iter().collect();
            match tokenizer.tokenize(&body) {
                Ok(stream) => {
                    cx.append_stream(stream);
                    cx.resume_on_index(end);
                    return;
                }
                Err(err) => debug!(element = %name, error = %err, "embedded body kept as text"),
            }
        }
        cx.append_forward_lookup_batch(tag.end..end, None, TokenFlags::empty());
    }
}

impl Language for Html {
    fn config(&self) -> &'static LanguageConfig {
        &HTML
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        if ch != '<' {
            return false;
        }
        let Some(tag) = scan_tag(cx.code(), cx.index()) else {
            return false;
        };
        for piece in &tag.pieces {
            cx.append_forward_lookup_batch(piece.range.clone(), piece.kind, piece.flags);
        }
        if tag.opens_body {
            self.embed_body(cx, &tag);
        }
        true
    }

    fn ends_statement(&self, token: &Token) -> bool {
        token.kind.is_none() && token.data.ends_with('>')
    }

    fn is_scope_separator(&self, token: &Token, line: &[Token]) -> bool {
        token.data == "<"
            && token.kind.is_none()
            && token.nesting == 0
            && line
                .iter()
                .find(|next| next.index > token.index && !next.is_blank())
                .is_some_and(|next| next.is(TokenKind::Keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vhl_core::{Edit, TokenStream};

    fn tokenize(code: &str) -> TokenStream {
        html_tokenizer().tokenize(code).unwrap()
    }

    fn tagged(stream: &TokenStream) -> Vec<(&str, Option<TokenKind>)> {
        stream
            .tokens()
            .iter()
            .filter(|token| !token.is_blank())
            .map(|token| (token.data.as_str(), token.kind))
            .collect()
    }

    fn find<'a>(stream: &'a TokenStream, data: &str) -> &'a Token {
        stream
            .tokens()
            .iter()
            .find(|token| token.data == data)
            .unwrap_or_else(|| panic!("no token {data:?}"))
    }

    #[test]
    fn tags_attributes_and_text() {
        let code = "<!DOCTYPE html>\n<div class=\"a b\" id=main hidden>Hi &amp; bye</div>\n";
        let stream = tokenize(code);
        assert_eq!(stream.text(), code);
        assert_eq!(
            tagged(&stream),
            vec![
                ("<!DOCTYPE html>", Some(TokenKind::Preprocessor)),
                ("<", None),
                ("div", Some(TokenKind::Keyword)),
                ("class", Some(TokenKind::Parameter)),
                ("=", Some(TokenKind::Operator)),
                ("\"a b\"", Some(TokenKind::String)),
                ("id", Some(TokenKind::Parameter)),
                ("=", Some(TokenKind::Operator)),
                ("main", Some(TokenKind::String)),
                ("hidden", Some(TokenKind::Parameter)),
                (">", None),
                ("Hi", None),
                ("&", None),
                ("amp", None),
                (";", None),
                ("bye", None),
                ("</", None),
                ("div", Some(TokenKind::Keyword)),
                (">", None),
            ]
        );
    }

    #[test]
    fn text_angles_are_not_tags() {
        let stream = tokenize("a < b <!-- note --> and <div");
        assert!(stream.tokens().iter().all(|token| !token.is(TokenKind::Keyword)));
        assert!(find(&stream, "<!-- note -->").is(TokenKind::Comment));
        assert_eq!(find(&stream, "div").kind, None);
    }

    #[test]
    fn multi_line_tags_keep_lines() {
        let code = "<img\n  src=\"x.png\"\n/>\n";
        let stream = tokenize(code);
        assert_eq!(stream.line_count(), 4);
        assert_eq!(find(&stream, "src").line, 1);
        assert!(find(&stream, "src").is(TokenKind::Parameter));
        assert_eq!(find(&stream, "/>").line, 2);
        assert!(stream.validate());
    }

    #[test]
    fn script_and_style_bodies_are_embedded() {
        let code = "<script>\nfunction f(a) { return a < 2; }\n</script>\n<style>p { color: red; }</style>\n";
        let stream = tokenize(code);
        assert_eq!(stream.text(), code);
        assert_eq!(stream.line_count(), 5);
        assert!(stream.validate());

        let f = find(&stream, "f");
        assert!(f.is(TokenKind::TypeDef));
        assert_eq!(f.line, 1);
        assert_eq!(f.parameters().unwrap()[0].name.as_deref(), Some("a"));
        assert!(find(&stream, "return").is(TokenKind::Keyword));
        assert!(find(&stream, "p").is(TokenKind::Type));
        assert!(find(&stream, "color").is(TokenKind::Keyword));
        let closes = stream
            .tokens()
            .iter()
            .filter(|token| token.data == "script" && token.is(TokenKind::Keyword))
            .count();
        assert_eq!(closes, 2);
    }

    #[test]
    fn verbatim_bodies_stay_plain() {
        let stream = tokenize("<textarea><b>raw</b></textarea>");
        assert_eq!(find(&stream, "<b>raw</b>").kind, None);
        assert!(stream.tokens().iter().all(|token| token.data != "b"));
    }

    #[test]
    fn partial_pass_restarts_at_tag_lines() {
        let old_code = "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n";
        let new_code = "<ul>\n<li>one</li>\n<li class=x>two</li>\n</ul>\n";
        let mut tokenizer = html_tokenizer();
        let old = tokenizer.tokenize(old_code).unwrap();
        let partial = tokenizer.partial_tokenize(new_code, Edit::line(2), &old).unwrap();
        let full = tokenizer.tokenize(new_code).unwrap();
        assert_eq!(partial, full);
        assert!(find(&partial, "class").is(TokenKind::Parameter));
    }
}
