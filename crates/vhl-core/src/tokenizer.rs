#![forbid(unsafe_code)]

//! Per-character driver, full passes and incremental re-tokenization.
//!
//! # Pass loop
//!
//! For every character the driver asks the [`Scanner`](crate::Scanner) for a
//! classification, switches the engine mode (flushing the batch on every
//! region boundary), offers plain-code characters to
//! [`Language::on_char`], and otherwise applies the default batching:
//! word-boundary characters flush the batch and are emitted as their own
//! (possibly joined) token, every other character extends the batch.
//!
//! Hook events are queued by the engine and dispatched here after each
//! character, so hooks never run inside other hooks.
//!
//! # Partial passes
//!
//! [`Tokenizer::partial_tokenize`] restarts at the nearest safe line before
//! the edit, re-tokenizes until a completed line after the edit matches the
//! corresponding old line in a settled state, and splices the fresh lines
//! between the untouched prefix and suffix of the old stream.

use std::ops::ControlFlow;

use tracing::{debug, debug_span, warn};

use crate::engine::{Engine, Mode, Origin, PostModifier, is_identifier_char};
use crate::error::TokenizeError;
use crate::language::{Language, LanguageConfig, ModifierRegion, ParenthClose, is_blank};
use crate::scanner::CharClass;
use crate::stream::TokenStream;
use crate::token::{Token, TokenFlags, TokenId, TokenKind};

/// Dispatch rounds after which queued type definitions are dropped.
const MAX_EVENT_ROUNDS: usize = 64;

/// Lines touched by an edit.
///
/// `start..=end` are line numbers in the *new* text; `line_additions` is the
/// new line count minus the old line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub line_additions: isize,
}

impl Edit {
    /// Edit of a single line that keeps the line count.
    pub fn line(line: usize) -> Self {
        Self {
            start: line,
            end: line,
            line_additions: 0,
        }
    }
}

/// A language profile bound to engine state.
pub struct Tokenizer {
    engine: Engine,
    lang: Box<dyn Language>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("language", &self.language_name())
            .finish_non_exhaustive()
    }
}

fn mode_of(class: &CharClass) -> Mode {
    if class.in_preprocessor {
        Mode::Preprocessor
    } else if class.in_string {
        Mode::Str
    } else if class.in_comment() {
        Mode::Comment
    } else if class.in_regex {
        Mode::Regex
    } else {
        Mode::Code
    }
}

fn lines_match(fresh: &[Token], old: &[Token]) -> bool {
    fresh.len() == old.len()
        && fresh
            .iter()
            .zip(old)
            .all(|(a, b)| a.kind == b.kind && a.flags == b.flags && a.data == b.data)
}

fn on_line_boundary(engine: &Engine) -> bool {
    engine.index == 0 || engine.code.get(engine.index - 1) == Some(&'\n')
}

fn is_settled(engine: &Engine) -> bool {
    engine.depth.is_zero()
        && engine.mode == Mode::Code
        && engine.batch.is_empty()
        && engine.post_modifier.is_none()
        && engine.pending_scope.is_none()
        && engine.next_token.is_none()
        && engine.events.is_empty()
        && engine.scanner.is_idle()
        && (engine.config.indent_language || engine.parents.is_empty())
}

impl Tokenizer {
    pub fn new(lang: impl Language + 'static) -> Self {
        Self::from_boxed(Box::new(lang))
    }

    pub fn from_boxed(lang: Box<dyn Language>) -> Self {
        Self {
            engine: Engine::new(lang.config()),
            lang,
        }
    }

    pub fn config(&self) -> &'static LanguageConfig {
        self.engine.config
    }

    pub fn language_name(&self) -> &'static str {
        self.engine.config.name
    }

    /// Tokenize a whole text.
    pub fn tokenize(&mut self, code: &str) -> Result<TokenStream, TokenizeError> {
        self.tokenize_until(code, |_, _| ControlFlow::Continue(()))
    }

    /// Tokenize a whole text, offering every completed line to `stop`.
    /// Breaking returns the lines completed so far.
    pub fn tokenize_until(
        &mut self,
        code: &str,
        mut stop: impl FnMut(usize, &[Token]) -> ControlFlow<()>,
    ) -> Result<TokenStream, TokenizeError> {
        let chars: Vec<char> = code.chars().collect();
        let _span = debug_span!("tokenize", language = self.language_name(), chars = chars.len()).entered();
        self.begin(chars, Origin::default());
        let stopped = self.run(|engine, line| stop(line, engine.line_tokens(line)))?;
        let stream = self.finish(stopped);
        debug!(tokens = stream.len(), lines = stream.line_count(), "tokenized");
        Ok(stream)
    }

    /// Re-tokenize the region of `code` touched by `edit`, reusing `old`
    /// (the stream of the text before the edit) outside of it.
    pub fn partial_tokenize(
        &mut self,
        code: &str,
        edit: Edit,
        old: &TokenStream,
    ) -> Result<TokenStream, TokenizeError> {
        let chars: Vec<char> = code.chars().collect();
        let _span = debug_span!(
            "partial_tokenize",
            language = self.language_name(),
            start = edit.start,
            end = edit.end,
            additions = edit.line_additions
        )
        .entered();

        let new_lines = chars.iter().filter(|ch| **ch == '\n').count() + 1;
        let old_lines = old.line_count();
        if new_lines as isize - old_lines as isize != edit.line_additions {
            return Err(TokenizeError::InvalidEdit {
                reason: "line additions do not match the line count change",
            });
        }
        if edit.start > edit.end || edit.end >= new_lines || edit.start >= old_lines {
            return Err(TokenizeError::InvalidEdit {
                reason: "edited lines lie outside the text",
            });
        }

        let scope = self.scope_start(old, edit.start);
        let prefix_len = old.line_start(scope).unwrap_or(0);
        let offset = old.tokens()[..prefix_len]
            .last()
            .map_or(0, |token| token.offset + token.char_len());
        if offset > chars.len() || (offset > 0 && chars[offset - 1] != '\n') {
            return Err(TokenizeError::InvalidEdit {
                reason: "old tokens do not match the new text before the edit",
            });
        }
        debug!(scope_line = scope, prefix_len, "restarting at scope line");

        self.begin(
            chars,
            Origin {
                index: prefix_len,
                line: scope,
                offset,
            },
        );
        let edit_end = edit.end;
        let additions = edit.line_additions;
        let converged = self.run(|engine, line| {
            // A step that swallows several lines (a fenced block, a verbatim
            // element) only leaves a meaningful state after its last line.
            if line <= edit_end
                || line + 1 < engine.line
                || !on_line_boundary(engine)
                || !is_settled(engine)
            {
                return ControlFlow::Continue(());
            }
            let Some(old_line) = line.checked_add_signed(-additions) else {
                return ControlFlow::Continue(());
            };
            match old.line(old_line) {
                Some(old_tokens) if lines_match(engine.line_tokens(line), old_tokens) => {
                    ControlFlow::Break(())
                }
                _ => ControlFlow::Continue(()),
            }
        })?;

        let fresh = self.finish(converged).into_tokens();
        let suffix_start = match converged {
            Some(line) => line
                .checked_add_signed(1 - additions)
                .and_then(|old_line| old.line_start(old_line))
                .unwrap_or(old.len()),
            None => old.len(),
        };
        debug!(
            converged_line = ?converged,
            fresh = fresh.len(),
            reused = old.len() - suffix_start,
            "partial pass done"
        );

        let suffix_base = prefix_len + fresh.len();
        let mut remap = |id: TokenId| {
            if id.0 < prefix_len {
                Some(id)
            } else if id.0 >= suffix_start {
                Some(TokenId(id.0 - suffix_start + suffix_base))
            } else {
                None
            }
        };
        let mut tokens = Vec::with_capacity(suffix_base + old.len() - suffix_start);
        tokens.extend(old.tokens()[..prefix_len].iter().cloned());
        tokens.extend(fresh);
        tokens.extend(old.tokens()[suffix_start..].iter().cloned());
        for (pos, token) in tokens.iter_mut().enumerate() {
            if (pos < prefix_len || pos >= suffix_base)
                && let Some(meta) = token.meta.as_mut()
            {
                meta.remap(&mut remap);
            }
        }
        Ok(TokenStream::from_tokens(tokens))
    }

    // -----------------------------------------------------------------------
    // Scope discovery
    // -----------------------------------------------------------------------

    /// Nearest line before `edit_start` at which a fresh pass produces the
    /// same tokens a full pass would.
    fn scope_start(&self, old: &TokenStream, edit_start: usize) -> usize {
        let mut line = edit_start;
        while line > 0 {
            line -= 1;
            let Some(tokens) = old.line(line) else {
                continue;
            };
            let clean = tokens.first().is_none_or(|first| {
                first.nesting == 0
                    && !first.flags.intersects(
                        TokenFlags::COMMENT
                            | TokenFlags::STR
                            | TokenFlags::REGEX
                            | TokenFlags::PREPROCESSOR
                            | TokenFlags::TEMPLATE,
                    )
            });
            if clean
                && tokens.iter().any(|token| self.lang.is_scope_separator(token, tokens))
                && self.previous_line_terminated(line.checked_sub(1).and_then(|prev| old.line(prev)))
            {
                return line;
            }
        }
        0
    }

    fn previous_line_terminated(&self, prev: Option<&[Token]>) -> bool {
        let Some(prev) = prev else {
            return true;
        };
        let Some(last) = prev.iter().rev().find(|token| !token.is_blank() && !token.is_comment()) else {
            return true;
        };
        if last.has(TokenFlags::PREPROCESSOR) {
            return !last.data.ends_with('\\');
        }
        if last.flags.intersects(TokenFlags::STR | TokenFlags::REGEX | TokenFlags::TEMPLATE)
            || last.is(TokenKind::Operator)
        {
            return false;
        }
        match last.data.as_str() {
            "," | "(" | "[" | "\\" => false,
            _ => self.lang.ends_statement(last),
        }
    }

    // -----------------------------------------------------------------------
    // Pass loop
    // -----------------------------------------------------------------------

    fn begin(&mut self, code: Vec<char>, origin: Origin) {
        self.engine.reset(code, origin);
        self.lang.reset();
    }

    /// Run to the end of the text or until `stop` breaks on a completed line.
    fn run(
        &mut self,
        mut stop: impl FnMut(&Engine, usize) -> ControlFlow<()>,
    ) -> Result<Option<usize>, TokenizeError> {
        while self.engine.index < self.engine.code.len() {
            let line = self.engine.line;
            self.step()?;
            for done in line..self.engine.line {
                if stop(&self.engine, done).is_break() {
                    return Ok(Some(done));
                }
            }
        }
        self.engine.flush_batch();
        self.dispatch();
        Ok(None)
    }

    /// Take the emitted tokens, cut after `stopped` when the pass broke early.
    fn finish(&mut self, stopped: Option<usize>) -> TokenStream {
        let engine = &mut self.engine;
        if let Some(line) = stopped {
            let rel = line - engine.base_line + 1;
            if let Some(&end) = engine.line_starts.get(rel) {
                engine.tokens.truncate(end);
                engine.line_starts.truncate(rel + 1);
            }
        }
        engine.take_stream()
    }

    fn step(&mut self) -> Result<(), TokenizeError> {
        let i = self.engine.index;
        let class = {
            let engine = &mut self.engine;
            engine.scanner.step(engine.config, &engine.code, i)
        };
        self.engine.resume = None;

        let mode = mode_of(&class);
        self.switch_mode(mode, &class);
        self.track_line_start(mode, &class);

        match mode {
            Mode::Code => {
                if !self.lang.on_char(&mut self.engine, class.ch, class.is_escaped, false) {
                    self.code_char(class.ch)?;
                }
            }
            Mode::Preprocessor => {
                if !self.lang.on_char(&mut self.engine, class.ch, class.is_escaped, true) {
                    self.region_char(class.ch);
                }
            }
            Mode::Str | Mode::Regex => self.region_char(class.ch),
            Mode::Comment => self.comment_char(class.ch),
        }
        self.dispatch();

        let engine = &mut self.engine;
        match engine.resume.take() {
            Some(next) if next > i => {
                engine.index = next;
                engine.scanner.reset_at(&engine.code, next);
            }
            _ => engine.index = i + 1,
        }
        Ok(())
    }

    fn switch_mode(&mut self, mode: Mode, class: &CharClass) {
        let engine = &mut self.engine;
        if mode == engine.mode && !class.starts_region {
            return;
        }
        let prefixed = mode == Mode::Str
            && engine.mode == Mode::Code
            && class.starts_region
            && engine.lexicon.is_string_prefix(&engine.batch);
        if !prefixed {
            engine.flush_batch();
        }
        engine.comment_span = Default::default();
        engine.mode = mode;
        self.dispatch();
    }

    fn track_line_start(&mut self, mode: Mode, class: &CharClass) {
        let engine = &mut self.engine;
        if !engine.start_of_line || class.ch == '\n' {
            return;
        }
        if is_blank(class.ch) {
            engine.line_indent += if class.ch == '\t' { 4 } else { 1 };
            return;
        }
        engine.start_of_line = false;
        if mode != Mode::Comment && (mode == Mode::Code || class.starts_region) {
            engine.on_line_start();
        }
    }

    /// String, regex and preprocessor characters.
    fn region_char(&mut self, ch: char) {
        let engine = &mut self.engine;
        if ch == '\n' {
            engine.flush_batch();
            engine.append_line_break();
        } else {
            engine.batch.push(ch);
        }
    }

    fn comment_char(&mut self, ch: char) {
        use crate::engine::CommentSpan;

        let engine = &mut self.engine;
        if ch == '\n' {
            engine.flush_batch();
            engine.comment_span = CommentSpan::Plain;
            engine.append_line_break();
            return;
        }
        match engine.comment_span {
            CommentSpan::Keyword => {
                if is_identifier_char(ch) {
                    engine.batch.push(ch);
                    return;
                }
                engine.flush_batch();
                engine.comment_span = CommentSpan::Plain;
            }
            CommentSpan::Codeblock => {
                engine.batch.push(ch);
                if ch == '`' {
                    engine.flush_batch();
                    engine.comment_span = CommentSpan::Plain;
                }
                return;
            }
            CommentSpan::Plain => {}
        }

        let config = engine.config;
        let after_gap = engine
            .index
            .checked_sub(1)
            .and_then(|prev| engine.code.get(prev))
            .is_none_or(|prev| prev.is_whitespace() || matches!(*prev, '*' | '/' | '#'));
        if config.allow_comment_keyword
            && ch == '@'
            && after_gap
            && engine.peek(1).is_some_and(char::is_alphabetic)
        {
            engine.flush_batch();
            engine.comment_span = CommentSpan::Keyword;
        } else if config.allow_comment_codeblock && ch == '`' {
            engine.flush_batch();
            engine.comment_span = CommentSpan::Codeblock;
        }
        engine.batch.push(ch);
    }

    fn code_char(&mut self, ch: char) -> Result<(), TokenizeError> {
        let engine = &mut self.engine;
        if ch == '\n' {
            engine.flush_batch();
            self.dispatch();
            self.engine.append_line_break();
            return Ok(());
        }
        if engine.continues_numeric(ch) || !engine.is_word_boundary(ch) {
            engine.batch.push(ch);
            return Ok(());
        }
        engine.flush_batch();
        self.dispatch();
        if is_blank(ch) {
            self.engine.append_boundary(ch);
            return Ok(());
        }
        if self.engine.config.post_modifier_end.contains(&ch) {
            self.end_post_modifier()?;
        }

        let engine = &mut self.engine;
        match ch {
            '(' => {
                engine.append_boundary(ch);
                engine.depth.parenth += 1;
            }
            ')' => {
                engine.depth.parenth = engine.depth.parenth.saturating_sub(1);
                let close = engine.append_boundary(ch);
                self.parenth_close(close)?;
            }
            '[' => {
                engine.append_boundary(ch);
                engine.depth.bracket += 1;
            }
            ']' => {
                engine.depth.bracket = engine.depth.bracket.saturating_sub(1);
                engine.append_boundary(ch);
            }
            '{' => {
                engine.open_scope();
                engine.append_boundary(ch);
                engine.depth.curly += 1;
            }
            '}' => {
                engine.depth.curly = engine.depth.curly.saturating_sub(1);
                engine.append_boundary(ch);
                engine.close_scope();
            }
            ';' => {
                engine.end_statement();
                engine.append_boundary(ch);
            }
            '<' if engine.config.allow_templates && engine.template_ahead() => {
                engine.next_token = None;
                engine.open_template();
            }
            '>' if engine.depth.template > 0 => {
                engine.close_template();
            }
            '@' if engine.config.allow_decorators && engine.parse_decorator() => {}
            _ => {
                engine.append_boundary(ch);
            }
        }
        Ok(())
    }

    fn parenth_close(&mut self, close: TokenId) -> Result<(), TokenizeError> {
        let engine = &self.engine;
        if !engine.config.allow_parameters {
            return Ok(());
        }
        let Some(open) = engine.get_opening_parenth(close) else {
            return Ok(());
        };
        let before = engine.get_prev_token(open, true);
        let event = ParenthClose {
            open,
            close,
            before,
            eligible: before.is_some_and(|id| engine.eligible_before_parenth(id)),
            after: engine.index + 1,
        };
        let target = self.lang.on_parenth_close(&mut self.engine, &event);
        self.dispatch();
        let Some(target) = target else {
            return Ok(());
        };

        let engine = &mut self.engine;
        engine.attach_parameters(target, open, close);
        let definition = engine
            .token(target)
            .is_some_and(|token| token.is(TokenKind::TypeDef) && !token.has(TokenFlags::DECORATOR));
        if definition {
            engine.mark_type_def(target);
            engine.post_modifier = Some(PostModifier {
                type_def: target,
                close,
                parenth: engine.depth.parenth,
                bracket: engine.depth.bracket,
                template: engine.depth.template,
            });
        }
        self.dispatch();
        Ok(())
    }

    fn end_post_modifier(&mut self) -> Result<(), TokenizeError> {
        let engine = &self.engine;
        let Some(region) = engine.post_modifier else {
            return Ok(());
        };
        if engine.depth.parenth != region.parenth
            || engine.depth.bracket != region.bracket
            || engine.depth.template != region.template
        {
            return Ok(());
        }
        let region = ModifierRegion {
            type_def: region.type_def,
            close: region.close,
            last: engine.last_non_blank().unwrap_or(region.close),
        };
        self.engine.post_modifier = None;
        self.lang.on_post_type_def_modifier_end(&mut self.engine, &region)?;
        self.dispatch();
        Ok(())
    }

    /// Run `on_type_def_keyword` for every queued definition.
    fn dispatch(&mut self) {
        for _ in 0..MAX_EVENT_ROUNDS {
            if self.engine.events.is_empty() {
                return;
            }
            let events = std::mem::take(&mut self.engine.events);
            for id in events {
                self.lang.on_type_def_keyword(&mut self.engine, id);
                self.engine.collect_decorators(id);
                if self.engine.config.indent_language {
                    let indent = self.engine.line_indent;
                    self.engine.push_parent(id, indent);
                }
            }
        }
        if !self.engine.events.is_empty() {
            warn!(
                dropped = self.engine.events.len(),
                line = self.engine.line,
                "definition hooks kept queueing, dropping events"
            );
            self.engine.events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static MINI: LanguageConfig = LanguageConfig {
        name: "mini",
        keywords: &["class", "return", "def"],
        type_def_keywords: &["class", "def"],
        operators: &["=", "+", "-", "*", "/"],
        single_line_comment_start: "//",
        multi_line_comment_start: "/*",
        multi_line_comment_end: "*/",
        allow_comment_keyword: true,
        allow_comment_codeblock: true,
        ..LanguageConfig::DEFAULT
    };

    struct Mini;

    impl Language for Mini {
        fn config(&self) -> &'static LanguageConfig {
            &MINI
        }
    }

    fn tokenize(code: &str) -> TokenStream {
        Tokenizer::new(Mini).tokenize(code).unwrap()
    }

    fn kinds(stream: &TokenStream) -> Vec<(String, Option<TokenKind>)> {
        stream
            .tokens()
            .iter()
            .filter(|token| !token.is_blank())
            .map(|token| (token.data.clone(), token.kind))
            .collect()
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let stream = tokenize("");
        assert_eq!(stream.line_count(), 1);
        assert!(stream.is_empty());
    }

    #[test]
    fn lossless_and_line_partitioned() {
        let code = "x = 1 + 2.5 // done\n\"str\" /* a\nb */ y\n";
        let stream = tokenize(code);
        assert_eq!(stream.text(), code);
        assert_eq!(stream.line_count(), 4);
        assert!(stream.validate());
    }

    #[test]
    fn classifies_words_and_literals() {
        let stream = tokenize("return x = 2.5;");
        assert_eq!(
            kinds(&stream),
            vec![
                ("return".into(), Some(TokenKind::Keyword)),
                ("x".into(), None),
                ("=".into(), Some(TokenKind::Operator)),
                ("2.5".into(), Some(TokenKind::Numeric)),
                (";".into(), None),
            ]
        );
    }

    #[test]
    fn type_def_keyword_tags_next_word() {
        let stream = tokenize("class Foo {}");
        let foo = &stream.tokens()[2];
        assert_eq!(foo.data, "Foo");
        assert!(foo.is(TokenKind::TypeDef));
        assert_eq!(foo.parents(), &[] as &[TokenId]);
    }

    #[test]
    fn nested_definitions_record_parents() {
        let stream = tokenize("class A {\n class B {}\n}");
        let b = stream
            .tokens()
            .iter()
            .find(|token| token.data == "B")
            .unwrap();
        assert!(b.is(TokenKind::TypeDef));
        assert_eq!(b.parents(), &[TokenId(2)]);
    }

    #[test]
    fn calls_become_types_with_parameters() {
        let stream = tokenize("foo(a, b)");
        let foo = &stream.tokens()[0];
        assert!(foo.is(TokenKind::Type));
        let names: Vec<_> = foo
            .parameters()
            .unwrap()
            .iter()
            .map(|param| param.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn definition_parameters_are_tagged() {
        let stream = tokenize("def f(a, b) {}");
        let a = stream.tokens().iter().find(|token| token.data == "a").unwrap();
        assert!(a.is(TokenKind::Parameter));
    }

    #[test]
    fn comment_keywords_and_codeblocks() {
        let stream = tokenize("// see @param and `x + 1` here");
        let kinds: Vec<_> = stream.tokens().iter().map(|token| token.kind).collect();
        assert!(kinds.contains(&Some(TokenKind::CommentKeyword)));
        assert!(kinds.contains(&Some(TokenKind::CommentCodeblock)));
        let keyword = stream
            .tokens()
            .iter()
            .find(|token| token.is(TokenKind::CommentKeyword))
            .unwrap();
        assert_eq!(keyword.data, "@param");
        assert!(stream.tokens().iter().all(|token| token.is_comment()));
    }

    #[test]
    fn email_in_comment_is_not_a_keyword() {
        let stream = tokenize("// mail a@b.c");
        assert!(stream.tokens().iter().all(|token| token.is(TokenKind::Comment)));
    }

    #[test]
    fn stop_callback_ends_early() {
        let mut tokenizer = Tokenizer::new(Mini);
        let stream = tokenizer
            .tokenize_until("a\nb\nc\n", |line, _| {
                if line == 1 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(stream.text(), "a\nb\n");
        assert_eq!(stream.line_count(), 3);
    }

    #[test]
    fn partial_matches_full_for_single_line_edit() {
        let old_code = "class A {\n x = 1\n}\nclass B {\n y = 2\n}\n";
        let new_code = "class A {\n x = 1\n}\nclass B {\n y = 3 + z\n}\n";
        let mut tokenizer = Tokenizer::new(Mini);
        let old = tokenizer.tokenize(old_code).unwrap();
        let partial = tokenizer.partial_tokenize(new_code, Edit::line(4), &old).unwrap();
        let full = tokenizer.tokenize(new_code).unwrap();
        assert_eq!(kinds(&partial), kinds(&full));
        assert_eq!(partial.text(), new_code);
        assert!(partial.validate());
    }

    #[test]
    fn partial_handles_added_lines() {
        let old_code = "a\nb\nc\n";
        let new_code = "a\nb\nx = 1\ny\nc\n";
        let mut tokenizer = Tokenizer::new(Mini);
        let old = tokenizer.tokenize(old_code).unwrap();
        let edit = Edit {
            start: 2,
            end: 3,
            line_additions: 2,
        };
        let partial = tokenizer.partial_tokenize(new_code, edit, &old).unwrap();
        let full = tokenizer.tokenize(new_code).unwrap();
        assert_eq!(partial, full);
    }

    #[tracing_test::traced_test]
    #[test]
    fn partial_pass_logs_scope_decision() {
        let old_code = "class A {\n}\nclass B {\n x\n}\n";
        let new_code = "class A {\n}\nclass B {\n xy\n}\n";
        let mut tokenizer = Tokenizer::new(Mini);
        let old = tokenizer.tokenize(old_code).unwrap();
        tokenizer.partial_tokenize(new_code, Edit::line(3), &old).unwrap();
        assert!(logs_contain("restarting at scope line"));
        assert!(logs_contain("scope_line=2"));
        assert!(logs_contain("partial pass done"));
    }

    /// Re-queues every definition it sees.
    struct Requeue;

    impl Language for Requeue {
        fn config(&self) -> &'static LanguageConfig {
            &MINI
        }

        fn on_type_def_keyword(&mut self, cx: &mut Engine, token: TokenId) {
            cx.mark_type_def(token);
        }
    }

    #[tracing_test::traced_test]
    #[test]
    fn runaway_definition_events_are_dropped_and_logged() {
        let code = "class Foo {}\nx\n";
        let stream = Tokenizer::new(Requeue).tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        assert!(stream.tokens()[2].is(TokenKind::TypeDef));
        assert!(logs_contain("dropping events"));
        assert!(logs_contain("dropped=1"));
    }

    #[test]
    fn partial_rejects_inconsistent_edit() {
        let mut tokenizer = Tokenizer::new(Mini);
        let old = tokenizer.tokenize("a\nb").unwrap();
        let err = tokenizer
            .partial_tokenize("a\nb\nc", Edit::line(1), &old)
            .unwrap_err();
        assert!(matches!(err, TokenizeError::InvalidEdit { .. }));
    }
}
