#![forbid(unsafe_code)]

//! Markdown profile.
//!
//! Block constructs (headings, fences, rules, list markers, quotes) are
//! recognized at the start of a line; inline spans (code, emphasis, links,
//! escapes) anywhere. Fenced code blocks naming a known language are
//! tokenized by that language's profile and spliced in.

use rustc_hash::FxHashMap;
use tracing::debug;
use vhl_core::{Engine, Language, LanguageConfig, Token, TokenFlags, TokenKind, Tokenizer, is_blank};

use crate::registry::{self, LanguageId};
use crate::support::line_end;

pub static MARKDOWN: LanguageConfig = LanguageConfig {
    name: "Markdown",
    extensions: &["md", "markdown", "mdown", "mkd"],
    aliases: &["markdown", "md"],
    multi_line_comment_start: "<!--",
    multi_line_comment_end: "-->",
    allow_strings: false,
    allow_numerics: false,
    allow_parameters: false,
    ..LanguageConfig::DEFAULT
};

#[derive(Debug)]
pub struct Markdown {
    /// Tokenize fenced code with the named language.
    embed: bool,
    cache: FxHashMap<LanguageId, Tokenizer>,
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Markdown {
    pub fn new(embed: bool) -> Self {
        Self {
            embed,
            cache: FxHashMap::default(),
        }
    }
}

/// Create a Markdown tokenizer that embeds fenced code.
pub fn markdown_tokenizer() -> Tokenizer {
    markdown_tokenizer_with(true)
}

/// Create a Markdown tokenizer; with `embed` off, fenced code stays one
/// `codeblock` run.
pub fn markdown_tokenizer_with(embed: bool) -> Tokenizer {
    Tokenizer::new(Markdown::new(embed))
}

// ---------------------------------------------------------------------------
// Lookahead helpers
// ---------------------------------------------------------------------------

fn run_len(code: &[char], from: usize, ch: char) -> usize {
    code[from.min(code.len())..].iter().take_while(|c| **c == ch).count()
}

/// A fence found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fence {
    /// Start of the body (after the opening line's `\n`).
    body: usize,
    /// First word of the info string.
    info: Option<String>,
    /// Closing fence line, without its line break.
    close: Option<(usize, usize)>,
}

fn scan_fence(code: &[char], start: usize, ch: char) -> Option<Fence> {
    let width = run_len(code, start, ch);
    if width < 3 {
        return None;
    }
    let open_end = line_end(code, start);
    let info: String = code[start + width..open_end].iter().collect();
    if ch == '`' && info.contains('`') {
        return None;
    }
    let body = (open_end + 1).min(code.len());
    let mut close = None;
    let mut line = body;
    while line < code.len() {
        let end = line_end(code, line);
        let indent = code[line..end].iter().take_while(|c| **c == ' ').count();
        let run = run_len(code, line + indent, ch);
        if indent <= 3 && run >= width && code[line + indent + run..end].iter().all(|c| c.is_whitespace()) {
            close = Some((line, end));
            break;
        }
        line = end + 1;
    }
    Some(Fence {
        body,
        info: info.split_whitespace().next().map(str::to_owned),
        close,
    })
}

/// `---`, `***` or `___`, optionally spaced, alone on the line.
fn is_rule(code: &[char], start: usize, ch: char) -> bool {
    let line = &code[start..line_end(code, start)];
    line.iter().all(|c| *c == ch || is_blank(*c)) && line.iter().filter(|c| **c == ch).count() >= 3
}

/// End of an ordered list marker (`12.` or `3)`) starting at `start`.
fn ordered_marker(code: &[char], start: usize) -> Option<usize> {
    let digits = code[start..].iter().take_while(|c| c.is_ascii_digit()).count();
    let end = start + digits;
    (digits > 0
        && digits < 10
        && matches!(code.get(end), Some('.' | ')'))
        && code.get(end + 1).is_none_or(|c| c.is_whitespace()))
    .then_some(end + 1)
}

/// End of an inline code span opened by the backtick run at `start`.
fn code_span(code: &[char], start: usize) -> Option<usize> {
    let width = run_len(code, start, '`');
    let end = line_end(code, start);
    let mut i = start + width;
    while i < end {
        if code[i] == '`' {
            let run = run_len(code, i, '`');
            if run == width {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

/// End and kind of an emphasis span opened at `start`.
fn emphasis(code: &[char], start: usize, ch: char) -> Option<(usize, TokenKind)> {
    let intraword = |i: Option<&char>| i.is_some_and(|c| c.is_alphanumeric());
    if ch == '_' && intraword(start.checked_sub(1).and_then(|prev| code.get(prev))) {
        return None;
    }
    let strong = code.get(start + 1) == Some(&ch);
    let width = if strong { 2 } else { 1 };
    let first = *code.get(start + width)?;
    if first.is_whitespace() || first == ch {
        return None;
    }
    let end = line_end(code, start);
    let mut i = start + width + 1;
    while i + width <= end {
        let closes = code[i] == ch
            && (!strong || code[i + 1] == ch)
            && (strong || code.get(i + 1) != Some(&ch))
            && !code[i - 1].is_whitespace()
            && (ch != '_' || !intraword(code.get(i + width)));
        if closes {
            let kind = if strong { TokenKind::Bold } else { TokenKind::Italic };
            return Some((i + width, kind));
        }
        i += 1;
    }
    None
}

/// End of `[text](target)` or `![alt](target)` starting at `start`.
fn link(code: &[char], start: usize) -> Option<usize> {
    let open = if code[start] == '!' {
        (code.get(start + 1) == Some(&'[')).then_some(start + 1)?
    } else {
        start
    };
    let end = line_end(code, start);
    let close = open + 1 + code.get(open + 1..end)?.iter().position(|c| *c == ']')?;
    if code.get(close + 1) != Some(&'(') {
        return None;
    }
    let target = close + 2 + code[close + 2..end].iter().position(|c| *c == ')')?;
    Some(target + 1)
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

impl Markdown {
    /// Line-start constructs. Returns whether `ch` was consumed.
    fn block(&mut self, cx: &mut Engine, ch: char) -> bool {
        let code = cx.code();
        let start = cx.index();
        let lookup = match ch {
            '#' => {
                let level = run_len(code, start, '#');
                let spaced = code.get(start + level).is_none_or(|c| c.is_whitespace());
                (level <= 6 && spaced).then(|| (line_end(code, start), TokenKind::Heading))
            }
            '`' | '~' => {
                return match scan_fence(code, start, ch) {
                    Some(fence) => {
                        self.fence(cx, fence);
                        true
                    }
                    None => false,
                };
            }
            '-' | '*' | '_' if is_rule(code, start, ch) => Some((line_end(code, start), TokenKind::Line)),
            '-' | '*' | '+' if code.get(start + 1).is_some_and(|c| *c == ' ' || *c == '\t') => {
                Some((start + 1, TokenKind::Keyword))
            }
            '>' => Some((start + 1, TokenKind::Keyword)),
            ch if ch.is_ascii_digit() => ordered_marker(code, start).map(|end| (end, TokenKind::Keyword)),
            _ => None,
        };
        let Some((end, kind)) = lookup else {
            return false;
        };
        cx.append_forward_lookup_batch(start..end, Some(kind), TokenFlags::empty());
        true
    }

    fn fence(&mut self, cx: &mut Engine, fence: Fence) {
        let start = cx.index();
        let len = cx.code().len();
        let body_end = fence.close.map_or(len, |(line, _)| line);
        cx.append_forward_lookup_batch(start..fence.body, Some(TokenKind::Codeblock), TokenFlags::empty());

        if body_end > fence.body {
            let language = fence
                .info
                .as_deref()
                .filter(|_| self.embed)
                .and_then(registry::resolve);
            let stream = language.map(|id| {
                let body: String = cx.code()[fence.body..body_end].iter().collect();
                self.cache
                    .entry(id)
                    .or_insert_with(|| id.tokenizer())
                    .tokenize(&body)
            });
            match stream {
                Some(Ok(stream)) => cx.append_stream(stream),
                other => {
                    if let Some(Err(err)) = other {
                        debug!(error = %err, "fenced block kept as codeblock");
                    }
                    cx.append_forward_lookup_batch(
                        fence.body..body_end,
                        Some(TokenKind::Codeblock),
                        TokenFlags::empty(),
                    );
                }
            }
        }

        match fence.close {
            Some((line, end)) => {
                cx.append_forward_lookup_batch(line..end, Some(TokenKind::Codeblock), TokenFlags::empty());
                cx.resume_on_index(end);
            }
            None => cx.resume_on_index(len),
        }
    }
}

impl Language for Markdown {
    fn config(&self) -> &'static LanguageConfig {
        &MARKDOWN
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        let block_start = matches!(ch, '#' | '`' | '~' | '-' | '*' | '_' | '+' | '>' | '0'..='9');
        if block_start && cx.at_line_start() && self.block(cx, ch) {
            return true;
        }
        let code = cx.code();
        let start = cx.index();
        let span = match ch {
            '`' => code_span(code, start).map(|end| (end, Some(TokenKind::Codeblock))),
            '*' | '_' => emphasis(code, start, ch).map(|(end, kind)| (end, Some(kind))),
            '[' | '!' => link(code, start).map(|end| (end, Some(TokenKind::Link))),
            '\\' if code.get(start + 1).is_some_and(char::is_ascii_punctuation) => Some((start + 2, None)),
            _ => None,
        };
        let Some((end, kind)) = span else {
            return false;
        };
        cx.append_forward_lookup_batch(start..end, kind, TokenFlags::empty());
        true
    }

    fn ends_statement(&self, _token: &Token) -> bool {
        true
    }

    fn is_scope_separator(&self, token: &Token, _line: &[Token]) -> bool {
        token.is(TokenKind::Heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vhl_core::{Edit, TokenStream};

    fn tagged(stream: &TokenStream) -> Vec<(&str, Option<TokenKind>)> {
        stream
            .tokens()
            .iter()
            .filter(|token| !token.is_blank())
            .map(|token| (token.data.as_str(), token.kind))
            .collect()
    }

    fn kind_of(stream: &TokenStream, data: &str) -> Option<TokenKind> {
        stream
            .tokens()
            .iter()
            .find(|token| token.data == data)
            .unwrap_or_else(|| panic!("no token {data:?}"))
            .kind
    }

    #[test]
    fn fenced_javascript_is_embedded() {
        let code = "```js\nconst x = 1;\n```";
        let stream = markdown_tokenizer().tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        assert!(stream.validate());
        assert_eq!(
            tagged(&stream),
            vec![
                ("```js", Some(TokenKind::Codeblock)),
                ("const", Some(TokenKind::Keyword)),
                ("x", None),
                ("=", Some(TokenKind::Operator)),
                ("1", Some(TokenKind::Numeric)),
                (";", None),
                ("```", Some(TokenKind::Codeblock)),
            ]
        );
        assert_eq!(stream.tokens().iter().find(|token| token.data == "const").unwrap().line, 1);
    }

    #[test]
    fn fences_stay_opaque_without_embedding() {
        let code = "```js\nconst x = 1;\n```\n~~~cobol\nDISPLAY 'HI'.\n~~~\n";
        let stream = markdown_tokenizer_with(false).tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        assert_eq!(kind_of(&stream, "const x = 1;"), Some(TokenKind::Codeblock));
        assert_eq!(kind_of(&stream, "DISPLAY 'HI'."), Some(TokenKind::Codeblock));

        let embedded = markdown_tokenizer().tokenize(code).unwrap();
        assert_eq!(kind_of(&embedded, "const"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&embedded, "DISPLAY 'HI'."), Some(TokenKind::Codeblock));
    }

    #[test]
    fn unclosed_fence_runs_to_the_end() {
        let code = "text\n```py\ndef f():\n    pass\n";
        let stream = markdown_tokenizer().tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        assert_eq!(kind_of(&stream, "f"), Some(TokenKind::TypeDef));
        assert_eq!(stream.line_count(), 5);
    }

    #[test]
    fn blocks_and_inline_spans() {
        let code = "# Title\n\n- item with **bold** and *it* and `code`\n1. [link](http://x) ![img](a.png)\n---\n> quote \\*not\\*\n";
        let stream = markdown_tokenizer().tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        assert_eq!(kind_of(&stream, "# Title"), Some(TokenKind::Heading));
        assert_eq!(kind_of(&stream, "-"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&stream, "**bold**"), Some(TokenKind::Bold));
        assert_eq!(kind_of(&stream, "*it*"), Some(TokenKind::Italic));
        assert_eq!(kind_of(&stream, "`code`"), Some(TokenKind::Codeblock));
        assert_eq!(kind_of(&stream, "1."), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&stream, "[link](http://x)"), Some(TokenKind::Link));
        assert_eq!(kind_of(&stream, "![img](a.png)"), Some(TokenKind::Link));
        assert_eq!(kind_of(&stream, "---"), Some(TokenKind::Line));
        assert_eq!(kind_of(&stream, ">"), Some(TokenKind::Keyword));
        assert_eq!(kind_of(&stream, "\\*"), None);
        assert!(stream.tokens().iter().all(|token| !token.is(TokenKind::Italic) || token.data == "*it*"));
    }

    #[test]
    fn underscores_inside_words_are_text() {
        let stream = markdown_tokenizer().tokenize("call snake_case_name or _this_\n").unwrap();
        assert_eq!(kind_of(&stream, "snake_case_name"), None);
        assert_eq!(kind_of(&stream, "_this_"), Some(TokenKind::Italic));
    }

    #[test]
    fn partial_pass_restarts_at_headings() {
        let old_code = "# A\ntext\n# B\nmore\n";
        let new_code = "# A\ntext\n# B\nmore *words*\n";
        let mut tokenizer = markdown_tokenizer();
        let old = tokenizer.tokenize(old_code).unwrap();
        let partial = tokenizer.partial_tokenize(new_code, Edit::line(3), &old).unwrap();
        let full = tokenizer.tokenize(new_code).unwrap();
        assert_eq!(partial, full);
    }
}
