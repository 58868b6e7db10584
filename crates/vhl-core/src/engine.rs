#![forbid(unsafe_code)]

//! Tokenizer state and the primitives language hooks work with.
//!
//! [`Engine`] owns everything a pass mutates: the character buffer, the
//! pending batch, the token arena, nesting depths and the parent stack.
//! Hooks receive `&mut Engine` and use its accessors; the per-character
//! dispatch that drives it lives in [`crate::tokenizer`].

use std::ops::Range;

use tracing::trace;

use crate::language::{
    DEFAULT_EXCLUDED_JOININGS, LanguageConfig, Lexicon, ParenthClose, WORD_BOUNDARIES, is_blank,
};
use crate::scanner::Scanner;
use crate::stream::TokenStream;
use crate::token::{Param, Token, TokenFlags, TokenId, TokenKind, TokenMeta};

/// Lexical mode of the batch being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Code,
    Str,
    Comment,
    Regex,
    Preprocessor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CommentSpan {
    #[default]
    Plain,
    Keyword,
    Codeblock,
}

/// Bracket nesting depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Depths {
    pub parenth: u32,
    pub bracket: u32,
    pub curly: u32,
    pub template: u32,
}

impl Depths {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// An open scope on the parent stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    pub token: TokenId,
    /// Curly depth (brace languages) or indentation width (indent languages)
    /// at or below which the scope is closed.
    pub close_id: usize,
}

/// Region between a definition's closing `)` and its body or `;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PostModifier {
    pub type_def: TokenId,
    pub close: TokenId,
    pub parenth: u32,
    pub bracket: u32,
    pub template: u32,
}

/// A definition waiting for the `{` that opens its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingScope {
    pub token: TokenId,
    pub parenth: u32,
    pub bracket: u32,
}

/// Where a pass starts inside a larger text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Origin {
    pub index: usize,
    pub line: usize,
    pub offset: usize,
}

/// Parsed parameter with the token holding its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedParam {
    pub param: Param,
    pub name_token: Option<TokenId>,
    pub has_value: bool,
}

/// Mutable tokenizer state shared with language hooks.
#[derive(Debug)]
pub struct Engine {
    pub(crate) config: &'static LanguageConfig,
    pub(crate) lexicon: Lexicon,
    pub(crate) code: Vec<char>,
    pub(crate) index: usize,
    pub(crate) resume: Option<usize>,
    pub(crate) scanner: Scanner,

    pub(crate) tokens: Vec<Token>,
    pub(crate) line_starts: Vec<usize>,
    pub(crate) base_index: usize,
    pub(crate) base_line: usize,
    pub(crate) line: usize,
    pub(crate) offset: usize,

    pub(crate) batch: String,
    pub(crate) mode: Mode,
    pub(crate) comment_span: CommentSpan,

    pub(crate) depth: Depths,
    pub(crate) parents: Vec<Parent>,
    pub(crate) start_of_line: bool,
    pub(crate) line_indent: usize,
    pub(crate) next_token: Option<TokenKind>,
    pub(crate) post_modifier: Option<PostModifier>,
    pub(crate) pending_scope: Option<PendingScope>,
    /// Fresh type definitions awaiting the `on_type_def_keyword` hook.
    pub(crate) events: Vec<TokenId>,
}

impl Engine {
    pub(crate) fn new(config: &'static LanguageConfig) -> Self {
        Self {
            config,
            lexicon: Lexicon::new(config),
            code: Vec::new(),
            index: 0,
            resume: None,
            scanner: Scanner::new(),
            tokens: Vec::new(),
            line_starts: vec![0],
            base_index: 0,
            base_line: 0,
            line: 0,
            offset: 0,
            batch: String::new(),
            mode: Mode::Code,
            comment_span: CommentSpan::Plain,
            depth: Depths::default(),
            parents: Vec::new(),
            start_of_line: true,
            line_indent: 0,
            next_token: None,
            post_modifier: None,
            pending_scope: None,
            events: Vec::new(),
        }
    }

    /// Clear all pass state and load `code`, starting at `origin`.
    pub(crate) fn reset(&mut self, code: Vec<char>, origin: Origin) {
        self.code = code;
        self.index = origin.offset;
        self.resume = None;
        self.scanner.reset_at(&self.code, origin.offset);
        self.tokens.clear();
        self.line_starts.clear();
        self.line_starts.push(0);
        self.base_index = origin.index;
        self.base_line = origin.line;
        self.line = origin.line;
        self.offset = origin.offset;
        self.batch.clear();
        self.mode = Mode::Code;
        self.comment_span = CommentSpan::Plain;
        self.depth = Depths::default();
        self.parents.clear();
        self.start_of_line = true;
        self.line_indent = 0;
        self.next_token = None;
        self.post_modifier = None;
        self.pending_scope = None;
        self.events.clear();
    }

    /// Hand the arena over as a stream.
    pub(crate) fn take_stream(&mut self) -> TokenStream {
        let tokens = std::mem::take(&mut self.tokens);
        let line_starts = std::mem::replace(&mut self.line_starts, vec![0]);
        TokenStream::from_parts(tokens, line_starts)
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &'static LanguageConfig {
        self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// The whole text of the pass.
    pub fn code(&self) -> &[char] {
        &self.code
    }

    /// Index of the character being processed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Character `ahead` positions after the current one.
    pub fn peek(&self, ahead: usize) -> Option<char> {
        self.code.get(self.index + ahead).copied()
    }

    /// First non-whitespace character at or after `from`, line breaks
    /// included in the skipped set.
    pub fn next_non_whitespace_char(&self, from: usize) -> Option<(usize, char)> {
        self.code
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, ch)| !ch.is_whitespace())
            .map(|(i, ch)| (i, *ch))
    }

    /// Continue scanning at `index` once the current hook returns.
    pub fn resume_on_index(&mut self, index: usize) {
        self.resume = Some(index);
    }

    /// Text accumulated for the next token.
    pub fn batch(&self) -> &str {
        &self.batch
    }

    pub fn depth(&self) -> Depths {
        self.depth
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn parents(&self) -> &[Parent] {
        &self.parents
    }

    /// Source line of the character being processed.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn line_indent(&self) -> usize {
        self.line_indent
    }

    /// Only whitespace precedes the current character on its line.
    pub fn at_line_start(&self) -> bool {
        self.code[..self.index.min(self.code.len())]
            .iter()
            .rev()
            .take_while(|ch| **ch != '\n')
            .all(|ch| is_blank(*ch))
    }

    /// Definition whose scope opens at the next `{`, if any.
    pub fn pending_scope_token(&self) -> Option<TokenId> {
        self.pending_scope.map(|pending| pending.token)
    }

    /// Whether a definition's post-modifier region is open.
    pub fn in_post_modifier_region(&self) -> bool {
        self.post_modifier.is_some()
    }

    /// Tokens emitted so far in this pass.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn pos(&self, id: TokenId) -> Option<usize> {
        id.0
            .checked_sub(self.base_index)
            .filter(|pos| *pos < self.tokens.len())
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.pos(id).map(|pos| &self.tokens[pos])
    }

    pub fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        let pos = self.pos(id)?;
        self.tokens.get_mut(pos)
    }

    /// Data of a token, or `""` for unknown ids.
    pub fn data(&self, id: TokenId) -> &str {
        self.token(id).map_or("", |token| token.data.as_str())
    }

    pub fn kind(&self, id: TokenId) -> Option<TokenKind> {
        self.token(id).and_then(|token| token.kind)
    }

    /// Id the next emitted token will receive.
    pub fn next_id(&self) -> TokenId {
        TokenId(self.base_index + self.tokens.len())
    }

    pub fn last_token(&self) -> Option<TokenId> {
        self.tokens.last().map(Token::id)
    }

    /// Tokens of an absolute source line, if it was emitted in this pass.
    pub fn line_tokens(&self, line: usize) -> &[Token] {
        let Some(rel) = line.checked_sub(self.base_line) else {
            return &[];
        };
        let Some(&start) = self.line_starts.get(rel) else {
            return &[];
        };
        let end = self
            .line_starts
            .get(rel + 1)
            .copied()
            .unwrap_or(self.tokens.len());
        &self.tokens[start..end]
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Nearest token before `before` that is not whitespace or a line break,
    /// also skipping comments when `skip_comments` is set.
    pub fn get_prev_token(&self, before: TokenId, skip_comments: bool) -> Option<TokenId> {
        let end = before
            .0
            .checked_sub(self.base_index)?
            .min(self.tokens.len());
        self.tokens[..end]
            .iter()
            .rev()
            .find(|token| !token.is_blank() && !(skip_comments && token.is_comment()))
            .map(Token::id)
    }

    /// Nearest non-blank, non-comment token after `after`.
    pub fn get_next_token(&self, after: TokenId) -> Option<TokenId> {
        let start = self.pos(after)? + 1;
        self.tokens[start..]
            .iter()
            .find(|token| !token.is_blank() && !token.is_comment())
            .map(Token::id)
    }

    /// Last non-blank, non-comment token emitted so far.
    pub fn last_non_blank(&self) -> Option<TokenId> {
        self.get_prev_token(self.next_id(), true)
    }

    fn get_opening(&self, close: TokenId, open: &str, close_data: &str, template: bool) -> Option<TokenId> {
        let end = self.pos(close)?;
        let mut depth = 0usize;
        for token in self.tokens[..end].iter().rev() {
            if token.flags.intersects(
                TokenFlags::STR | TokenFlags::COMMENT | TokenFlags::REGEX | TokenFlags::PREPROCESSOR,
            ) || (template && !token.has(TokenFlags::TEMPLATE))
            {
                continue;
            }
            if token.data == close_data {
                depth += 1;
            } else if token.data == open {
                if depth == 0 {
                    return Some(token.id());
                }
                depth -= 1;
            }
        }
        None
    }

    /// The `(` matching the `)` at `close`.
    pub fn get_opening_parenth(&self, close: TokenId) -> Option<TokenId> {
        self.get_opening(close, "(", ")", false)
    }

    pub fn get_opening_bracket(&self, close: TokenId) -> Option<TokenId> {
        self.get_opening(close, "[", "]", false)
    }

    pub fn get_opening_curly(&self, close: TokenId) -> Option<TokenId> {
        self.get_opening(close, "{", "}", false)
    }

    /// The template `<` matching the template `>` at `close`.
    pub fn get_opening_template(&self, close: TokenId) -> Option<TokenId> {
        self.get_opening(close, "<", ">", true)
    }

    /// Whether any enclosing scope has a parameter list.
    pub fn inside_func(&self) -> bool {
        self.parents.iter().any(|parent| {
            self.token(parent.token)
                .is_some_and(|token| token.parameters().is_some() && !token.has(TokenFlags::DECORATOR))
        })
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn retag(&mut self, id: TokenId, kind: Option<TokenKind>) {
        if let Some(token) = self.token_mut(id) {
            token.kind = kind;
        }
    }

    pub fn set_flag(&mut self, id: TokenId, flags: TokenFlags) {
        if let Some(token) = self.token_mut(id) {
            token.flags |= flags;
        }
    }

    /// Attachments of a token, created on first access.
    pub fn meta_mut(&mut self, id: TokenId) -> Option<&mut TokenMeta> {
        self.token_mut(id).map(Token::meta_mut)
    }

    /// Force the kind of the next flushed word.
    pub fn set_next_token(&mut self, kind: Option<TokenKind>) {
        self.next_token = kind;
    }

    /// Tag `id` as a definition. Its scope opens at the next `{` at the
    /// current depth, and `on_type_def_keyword` runs once the current
    /// character is handled.
    pub fn mark_type_def(&mut self, id: TokenId) {
        let Some(token) = self.token_mut(id) else {
            return;
        };
        token.kind = Some(TokenKind::TypeDef);
        let assigned = token.meta().is_some_and(|meta| meta.parents.is_some());
        if !assigned && !self.events.contains(&id) {
            self.events.push(id);
        }
        if !self.config.indent_language {
            self.pending_scope = Some(PendingScope {
                token: id,
                parenth: self.depth.parenth,
                bracket: self.depth.bracket,
            });
        }
    }

    /// Record the open scopes as the parent chain of `id`.
    pub fn assign_parents(&mut self, id: TokenId) {
        let parents: Vec<TokenId> = self.parents.iter().map(|parent| parent.token).collect();
        if let Some(meta) = self.meta_mut(id) {
            meta.parents = Some(parents);
        }
    }

    /// Open a scope explicitly.
    pub fn push_parent(&mut self, token: TokenId, close_id: usize) {
        self.parents.push(Parent { token, close_id });
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    /// Position `token` at the end of the arena and append it.
    pub(crate) fn push(&mut self, mut token: Token) -> TokenId {
        token.index = self.base_index + self.tokens.len();
        token.line = self.line;
        token.offset = self.offset;
        token.nesting = self.depth.curly;
        if self.depth.template > 0 && self.mode == Mode::Code {
            token.flags |= TokenFlags::TEMPLATE;
        }
        self.offset += token.char_len();
        let id = token.id();
        let line_break = token.is_line_break();
        self.tokens.push(token);
        if line_break {
            self.line += 1;
            self.line_starts.push(self.tokens.len());
            self.start_of_line = true;
            self.line_indent = 0;
        }
        id
    }

    /// Append a fully formed token after flushing the batch.
    pub fn append_token(&mut self, token: Token) -> TokenId {
        self.flush_batch();
        self.push(token)
    }

    /// Emit a `\n` token.
    pub fn append_line_break(&mut self) -> TokenId {
        self.push(Token::new("\n", None).with_flags(TokenFlags::LINE_BREAK | TokenFlags::WORD_BOUNDARY))
    }

    /// Emit `code[range]` as tokens of `kind`, split at line breaks, and
    /// resume scanning after it. The range should start at the current
    /// character or right after a previous lookup.
    pub fn append_forward_lookup_batch(
        &mut self,
        range: Range<usize>,
        kind: Option<TokenKind>,
        flags: TokenFlags,
    ) -> Option<TokenId> {
        self.flush_batch();
        let end = range.end.min(self.code.len());
        let start = range.start.min(end);
        let text: String = self.code[start..end].iter().collect();
        let mut last = None;
        for (n, part) in text.split('\n').enumerate() {
            if n > 0 {
                last = Some(self.append_line_break());
            }
            if !part.is_empty() {
                last = Some(self.push(Token::new(part, kind).with_flags(flags)));
            }
        }
        self.resume_on_index(end);
        last
    }

    /// Splice the tokens of a separately tokenized sub-stream (an embedded
    /// language) at the current position. Attachments are rebased.
    pub fn append_stream(&mut self, stream: TokenStream) {
        self.flush_batch();
        let tokens = stream.into_tokens();
        let Some(first) = tokens.first().map(|token| token.index) else {
            return;
        };
        let base = self.next_id().0;
        let count = tokens.len();
        for mut token in tokens {
            if let Some(meta) = token.meta.as_mut() {
                meta.remap(&mut |id| {
                    id.0.checked_sub(first)
                        .filter(|rel| *rel < count)
                        .map(|rel| TokenId(base + rel))
                });
            }
            let nesting = token.nesting;
            let id = self.push(token);
            if let Some(token) = self.token_mut(id) {
                token.nesting += nesting;
            }
        }
    }

    /// Emit the batch as one token classified by the current mode.
    pub fn flush_batch(&mut self) -> Option<TokenId> {
        if self.batch.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.batch);
        let (kind, flags) = match self.mode {
            Mode::Code => return Some(self.flush_code(data)),
            Mode::Str => (TokenKind::String, TokenFlags::STR),
            Mode::Regex => (TokenKind::String, TokenFlags::REGEX),
            Mode::Preprocessor => (TokenKind::Preprocessor, TokenFlags::PREPROCESSOR),
            Mode::Comment => {
                let kind = match self.comment_span {
                    CommentSpan::Plain => TokenKind::Comment,
                    CommentSpan::Keyword => TokenKind::CommentKeyword,
                    CommentSpan::Codeblock => TokenKind::CommentCodeblock,
                };
                (kind, TokenFlags::COMMENT)
            }
        };
        Some(self.push(Token::new(data, Some(kind)).with_flags(flags)))
    }

    fn flush_code(&mut self, data: String) -> TokenId {
        let lexicon = &self.lexicon;
        let keyword = lexicon.is_keyword(&data);
        let forced = if keyword { None } else { self.next_token.take() };
        let kind = if keyword {
            Some(TokenKind::Keyword)
        } else if forced.is_some() {
            forced
        } else if lexicon.is_builtin_type(&data) {
            Some(TokenKind::Type)
        } else if lexicon.is_operator(&data) {
            Some(TokenKind::Operator)
        } else if self.config.allow_numerics && is_numeric(&data) {
            Some(TokenKind::Numeric)
        } else {
            None
        };

        let type_def_keyword = keyword && lexicon.is_type_def_keyword(&data);
        let type_keyword = keyword && lexicon.is_type_keyword(&data);
        let lookahead = type_def_keyword && lexicon.looks_ahead_for_variable(&data);
        let id = self.push(Token::new(data, kind));

        if type_def_keyword {
            let excluded = self
                .get_prev_token(id, true)
                .is_some_and(|prev| self.lexicon.excludes_type_def_after(self.data(prev)));
            if !excluded {
                let next = if lookahead && self.lookahead_is_variable() {
                    TokenKind::Type
                } else {
                    TokenKind::TypeDef
                };
                self.next_token = Some(next);
            }
        } else if type_keyword {
            self.next_token = Some(TokenKind::Type);
        }
        if forced == Some(TokenKind::TypeDef) {
            self.mark_type_def(id);
        }
        id
    }

    /// `keyword Name variable`: a type name followed by another identifier
    /// (or a pointer/reference declarator) on the same statement.
    fn lookahead_is_variable(&self) -> bool {
        let code = &self.code;
        let skip_blank = |mut i: usize| {
            while code.get(i).is_some_and(|ch| ch.is_whitespace()) {
                i += 1;
            }
            i
        };
        let mut i = skip_blank(self.index);
        let name_start = i;
        while code.get(i).is_some_and(|ch| is_identifier_char(*ch)) {
            i += 1;
        }
        if i == name_start {
            return false;
        }
        i = skip_blank(i);
        let second_start = i;
        match code.get(i) {
            Some('*' | '&') => true,
            Some(ch) if is_identifier_char(*ch) => {
                while code.get(i).is_some_and(|ch| is_identifier_char(*ch)) {
                    i += 1;
                }
                let second: String = code[second_start..i].iter().collect();
                !self.lexicon.is_keyword(&second)
            }
            _ => false,
        }
    }

    /// Emit a boundary character, joining it onto the previous token when
    /// both form one run of operators or whitespace.
    pub(crate) fn append_boundary(&mut self, ch: char) -> TokenId {
        let whitespace = is_blank(ch);
        if !whitespace {
            self.next_token = None;
        }
        if let Some(last) = self.tokens.last()
            && self.joinable(last, ch, whitespace)
        {
            let mut data = last.data.clone();
            data.push(ch);
            let kind = if whitespace {
                None
            } else if self.lexicon.is_operator_run(&data) {
                Some(TokenKind::Operator)
            } else {
                None
            };
            self.offset += 1;
            if let Some(last) = self.tokens.last_mut() {
                last.data = data;
                last.kind = kind;
                return last.id();
            }
        }
        let mut flags = TokenFlags::WORD_BOUNDARY;
        let kind = if whitespace {
            flags |= TokenFlags::WHITESPACE;
            None
        } else if self.lexicon.is_operator_run(ch.encode_utf8(&mut [0; 4])) {
            Some(TokenKind::Operator)
        } else {
            None
        };
        self.push(Token::new(ch, kind).with_flags(flags))
    }

    fn joinable(&self, last: &Token, ch: char, whitespace: bool) -> bool {
        let excluded = |c: char| {
            DEFAULT_EXCLUDED_JOININGS.contains(&c) || self.config.excluded_word_boundary_joinings.contains(&c)
        };
        last.is_word_boundary()
            && last.is_whitespace() == whitespace
            && !last.flags.intersects(
                TokenFlags::LINE_BREAK
                    | TokenFlags::STR
                    | TokenFlags::COMMENT
                    | TokenFlags::REGEX
                    | TokenFlags::PREPROCESSOR
                    | TokenFlags::TEMPLATE
                    | TokenFlags::DECORATOR,
            )
            && last.meta.is_none()
            && matches!(last.kind, None | Some(TokenKind::Operator))
            && !excluded(ch)
            && !last.data.chars().any(excluded)
            && self.depth.template == 0
    }

    /// Whether `ch` ends the current batch.
    pub fn is_word_boundary(&self, ch: char) -> bool {
        (WORD_BOUNDARIES.contains(&ch) || ch.is_whitespace()) && !self.config.word_chars.contains(&ch)
    }

    /// A `.` continuing an all-digit batch into a decimal literal.
    pub(crate) fn continues_numeric(&self, ch: char) -> bool {
        ch == '.'
            && self.config.allow_numerics
            && !self.batch.is_empty()
            && self.batch.chars().all(|c| c.is_ascii_digit())
            && self.peek(1).is_some_and(|c| c.is_ascii_digit())
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Handle a `{`: open the pending definition scope, if any.
    pub(crate) fn open_scope(&mut self) {
        if let Some(pending) = self.pending_scope
            && pending.parenth == self.depth.parenth
            && pending.bracket == self.depth.bracket
        {
            self.pending_scope = None;
            self.parents.push(Parent {
                token: pending.token,
                close_id: self.depth.curly as usize,
            });
        }
    }

    /// Handle a `}` after the depth was decremented.
    pub(crate) fn close_scope(&mut self) {
        if self.config.indent_language {
            return;
        }
        let curly = self.depth.curly as usize;
        while self.parents.last().is_some_and(|parent| parent.close_id >= curly) {
            self.parents.pop();
        }
    }

    /// Handle a `;`: a pending definition had no body.
    pub(crate) fn end_statement(&mut self) {
        if self
            .pending_scope
            .is_some_and(|pending| pending.parenth == self.depth.parenth && pending.bracket == self.depth.bracket)
        {
            self.pending_scope = None;
        }
    }

    /// First non-blank character of a line in an indent language closes the
    /// scopes indented at least as far.
    pub(crate) fn on_line_start(&mut self) {
        if !self.config.indent_language {
            return;
        }
        let indent = self.line_indent;
        while self.parents.last().is_some_and(|parent| parent.close_id >= indent) {
            self.parents.pop();
        }
    }

    /// Speculatively check whether the `<` at the current index opens a
    /// template argument list.
    pub(crate) fn template_ahead(&self) -> bool {
        let code = &self.code;
        let start = self.index;
        if matches!(code.get(start + 1), Some('<' | '=')) {
            return false;
        }
        let after_word = self
            .last_non_blank()
            .and_then(|id| self.token(id))
            .is_some_and(|token| token.is_word() && !token.is(TokenKind::Numeric));
        if !after_word {
            return false;
        }
        let mut angle = 1usize;
        let mut brackets = 0usize;
        let mut i = start + 1;
        while let Some(&ch) = code.get(i) {
            match ch {
                '<' => angle += 1,
                '>' if brackets == 0 => {
                    angle -= 1;
                    if angle == 0 {
                        return true;
                    }
                }
                '>' => {}
                '(' | '[' | '{' => brackets += 1,
                ')' | ']' | '}' => {
                    if brackets == 0 {
                        break;
                    }
                    brackets -= 1;
                }
                '&' | '|' if brackets == 0 && code.get(i + 1) == Some(&ch) => break,
                ch if is_identifier_char(ch) || ch.is_whitespace() => {}
                ch if self.config.template_chars.contains(&ch) => {}
                _ => break,
            }
            i += 1;
        }
        trace!(line = self.line, index = start, "template lookahead aborted");
        false
    }

    /// Emit a template-opening `<`.
    pub(crate) fn open_template(&mut self) -> TokenId {
        if let Some(prev) = self.last_non_blank()
            && self.token(prev).is_some_and(|token| token.kind.is_none())
        {
            self.retag(prev, Some(TokenKind::Type));
        }
        let id = self.push(Token::new('<', None).with_flags(TokenFlags::WORD_BOUNDARY | TokenFlags::TEMPLATE));
        self.depth.template += 1;
        id
    }

    /// Emit a template-closing `>`.
    pub(crate) fn close_template(&mut self) -> TokenId {
        let id = self.push(Token::new('>', None).with_flags(TokenFlags::WORD_BOUNDARY | TokenFlags::TEMPLATE));
        self.depth.template -= 1;
        id
    }

    /// Consume `@name` or `@dotted.name` at the current index as a
    /// decorator token.
    pub(crate) fn parse_decorator(&mut self) -> bool {
        let start = self.index;
        let mut end = start + 1;
        loop {
            match self.code.get(end) {
                Some(ch) if is_identifier_char(*ch) => end += 1,
                Some('.')
                    if end > start + 1
                        && self.code.get(end + 1).is_some_and(|ch| is_identifier_char(*ch)) =>
                {
                    end += 1
                }
                _ => break,
            }
        }
        if end == start + 1 {
            return false;
        }
        let data: String = self.code[start..end].iter().collect();
        let id = self.push(Token::new(data, Some(TokenKind::Type)).with_flags(TokenFlags::DECORATOR));
        if let Some(meta) = self.meta_mut(id) {
            meta.parameters = Some(Vec::new());
        }
        self.resume_on_index(end);
        true
    }

    /// Attach the names of decorators written before the definition `id`.
    pub(crate) fn collect_decorators(&mut self, id: TokenId) {
        let mut names = Vec::new();
        let mut cursor = id;
        while let Some(prev) = self.get_prev_token(cursor, true) {
            let Some(token) = self.token(prev) else {
                break;
            };
            if token.has(TokenFlags::DECORATOR) {
                names.push(token.data.trim_start_matches('@').to_string());
                cursor = prev;
            } else if token.data == ")" {
                let Some(open) = self.get_opening_parenth(prev) else {
                    break;
                };
                let decorated = self
                    .get_prev_token(open, true)
                    .and_then(|owner| self.token(owner))
                    .is_some_and(|owner| owner.has(TokenFlags::DECORATOR));
                if !decorated {
                    break;
                }
                cursor = open;
            } else if token.is(TokenKind::Keyword) {
                cursor = prev;
            } else {
                break;
            }
        }
        if !names.is_empty() {
            names.reverse();
            if let Some(meta) = self.meta_mut(id) {
                meta.custom_decorators = names;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Whether the token before a `(` may own its parameter list.
    pub(crate) fn eligible_before_parenth(&self, id: TokenId) -> bool {
        let Some(token) = self.token(id) else {
            return false;
        };
        if token.has(TokenFlags::DECORATOR) {
            return true;
        }
        if !token.is_word() {
            return false;
        }
        match token.kind {
            Some(TokenKind::Keyword) => self.lexicon.allows_parenth_after(&token.data),
            Some(TokenKind::Numeric | TokenKind::Operator | TokenKind::String) => false,
            _ => true,
        }
    }

    /// Generic owner resolution: definitions and decorators keep their list,
    /// plain words become called types.
    pub fn default_parenth_target(&mut self, close: &ParenthClose) -> Option<TokenId> {
        if !close.eligible {
            return None;
        }
        let before = close.before?;
        let token = self.token(before)?;
        if token.is(TokenKind::TypeDef) || token.has(TokenFlags::DECORATOR) {
            return Some(before);
        }
        let kind = token.kind;
        match kind {
            None | Some(TokenKind::Type) => {
                self.retag(before, Some(TokenKind::Type));
                Some(before)
            }
            _ => None,
        }
    }

    /// Split the tokens strictly between `open` and `close` into entries.
    pub(crate) fn split_params(&self, open: TokenId, close: TokenId) -> Vec<ParsedParam> {
        let (Some(start), Some(end)) = (self.pos(open), self.pos(close)) else {
            return Vec::new();
        };
        let mut entries: Vec<Vec<&Token>> = vec![Vec::new()];
        let mut depth = 0i32;
        for token in &self.tokens[start + 1..end.max(start + 1)] {
            if token.is_comment() {
                continue;
            }
            let structural = !token.flags.intersects(TokenFlags::STR | TokenFlags::REGEX);
            if structural {
                match token.data.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    "<" if token.has(TokenFlags::TEMPLATE) => depth += 1,
                    ">" if token.has(TokenFlags::TEMPLATE) => depth -= 1,
                    "," if depth == 0 => {
                        entries.push(Vec::new());
                        continue;
                    }
                    _ => {}
                }
            }
            if let Some(entry) = entries.last_mut() {
                entry.push(token);
            }
        }

        entries
            .into_iter()
            .filter(|entry| entry.iter().any(|token| !token.is_blank()))
            .enumerate()
            .map(|(index, entry)| parse_entry(index, &entry))
            .collect()
    }

    /// Parameters between `open` and `close` plus every non-blank token in
    /// between.
    pub fn parse_params(&self, open: TokenId, close: TokenId) -> (Vec<Param>, Vec<TokenId>) {
        let params = self
            .split_params(open, close)
            .into_iter()
            .map(|parsed| parsed.param)
            .collect();
        let tokens = match (self.pos(open), self.pos(close)) {
            (Some(start), Some(end)) if end > start => self.tokens[start + 1..end]
                .iter()
                .filter(|token| !token.is_blank())
                .map(Token::id)
                .collect(),
            _ => Vec::new(),
        };
        (params, tokens)
    }

    /// Store the parameter list of `owner` and tag parameter names.
    pub(crate) fn attach_parameters(&mut self, owner: TokenId, open: TokenId, close: TokenId) {
        let parsed = self.split_params(open, close);
        let (_, tokens) = self.parse_params(open, close);
        let definition = self.kind(owner) == Some(TokenKind::TypeDef);
        let mut assignments = false;
        for entry in &parsed {
            let Some(name) = entry.name_token else {
                continue;
            };
            if definition {
                self.retag(name, Some(TokenKind::Parameter));
            } else if self.config.allow_assignment_parameters && entry.has_value {
                self.retag(name, Some(TokenKind::Parameter));
                assignments = true;
            }
        }
        if assignments {
            self.set_flag(owner, TokenFlags::ASSIGNMENT_PARAMETERS);
        }
        if let Some(meta) = self.meta_mut(owner) {
            meta.parameters = Some(parsed.into_iter().map(|entry| entry.param).collect());
            meta.parameter_tokens = tokens;
        }
    }
}

fn parse_entry(index: usize, entry: &[&Token]) -> ParsedParam {
    let solid: Vec<&Token> = entry.iter().copied().filter(|token| !token.is_blank()).collect();
    let top_level = |data: &str| -> Option<usize> {
        let mut depth = 0i32;
        solid.iter().position(|token| {
            match token.data.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                "<" if token.has(TokenFlags::TEMPLATE) => depth += 1,
                ">" if token.has(TokenFlags::TEMPLATE) => depth -= 1,
                _ => {}
            }
            depth == 0 && token.data == data && !token.is_str()
        })
    };

    let eq = top_level("=");
    let (head, value) = match eq {
        Some(eq) => (&solid[..eq], &solid[eq + 1..]),
        None => (&solid[..], &[][..]),
    };
    let annotation = head.iter().position(|token| token.data == ":" && !token.is_str());
    let (name_token, ty): (Option<&Token>, Vec<TokenId>) = match annotation {
        Some(colon) => (
            head[..colon].iter().rev().find(|token| token.is_word()).copied(),
            head[colon + 1..].iter().map(|token| token.id()).collect(),
        ),
        None => match head.iter().rposition(|token| token.is_word()) {
            Some(last) => (
                Some(head[last]),
                head[..last].iter().map(|token| token.id()).collect(),
            ),
            None => (None, Vec::new()),
        },
    };

    ParsedParam {
        param: Param {
            name: name_token.map(|token| token.data.clone()),
            index,
            ty,
            value: value.iter().map(|token| token.id()).collect(),
        },
        name_token: name_token.map(Token::id),
        has_value: eq.is_some(),
    }
}

/// Identifier character: alphanumeric, `_` or `$`.
#[inline]
pub fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// `-?\d+(\.\d+)?`
pub fn is_numeric(data: &str) -> bool {
    let digits = data.strip_prefix('-').unwrap_or(data);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let valid = |part: &str| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit());
    valid(whole) && parts.next().is_none_or(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    static PLAIN: LanguageConfig = LanguageConfig {
        name: "plain",
        keywords: &["class", "struct", "final"],
        type_def_keywords: &["class", "struct"],
        variable_lookahead_keywords: &["struct"],
        operators: &["=", "+", "-", "*", "&"],
        ..LanguageConfig::DEFAULT
    };

    fn engine(code: &str) -> Engine {
        let mut engine = Engine::new(&PLAIN);
        engine.reset(code.chars().collect(), Origin::default());
        engine
    }

    #[test]
    fn numeric_literals() {
        assert!(is_numeric("42"));
        assert!(is_numeric("-3.14"));
        assert!(!is_numeric("1."));
        assert!(!is_numeric(".5"));
        assert!(!is_numeric("0x1F"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn boundaries_join_into_operator_runs() {
        let mut engine = engine("a += b");
        engine.append_boundary('+');
        engine.append_boundary('=');
        assert_eq!(engine.tokens().len(), 2);
        engine.append_boundary('-');
        engine.append_boundary('-');
        assert_eq!(engine.tokens()[2].data, "--");
        assert!(engine.tokens()[2].is(TokenKind::Operator));
    }

    #[test]
    fn whitespace_joins_only_with_whitespace() {
        let mut engine = engine("");
        engine.append_boundary(' ');
        engine.append_boundary('\t');
        engine.append_boundary('-');
        assert_eq!(engine.tokens().len(), 2);
        assert_eq!(engine.tokens()[0].data, " \t");
        assert!(engine.tokens()[0].is_whitespace());
        assert_eq!(engine.offset, 3);
    }

    #[test]
    fn line_break_advances_line_and_partition() {
        let mut engine = engine("");
        engine.batch.push_str("x");
        engine.flush_batch();
        engine.append_line_break();
        engine.batch.push_str("y");
        engine.flush_batch();
        assert_eq!(engine.line, 1);
        assert_eq!(engine.line_tokens(1)[0].data, "y");
        assert_eq!(engine.line_tokens(0).len(), 2);
    }

    #[test]
    fn struct_variable_lookahead() {
        let mut engine = engine("struct passwd pass;");
        engine.batch.push_str("struct");
        engine.index = 6;
        engine.flush_batch();
        assert_eq!(engine.next_token, Some(TokenKind::Type));

        let mut engine = self::engine("struct Point {");
        engine.batch.push_str("struct");
        engine.index = 6;
        engine.flush_batch();
        assert_eq!(engine.next_token, Some(TokenKind::TypeDef));

        let mut engine = self::engine("class A final {");
        engine.batch.push_str("class");
        engine.index = 5;
        engine.flush_batch();
        assert_eq!(engine.next_token, Some(TokenKind::TypeDef));
    }

    #[test]
    fn forced_type_def_is_queued() {
        let mut engine = engine("class A");
        engine.next_token = Some(TokenKind::TypeDef);
        engine.batch.push_str("A");
        let id = engine.flush_batch().unwrap();
        assert!(engine.token(id).unwrap().is(TokenKind::TypeDef));
        assert_eq!(engine.events, vec![id]);
        assert!(engine.pending_scope.is_some());
    }

    #[test]
    fn opening_parenth_skips_nested_pairs() {
        let mut engine = engine("");
        let open = engine.append_boundary('(');
        engine.append_boundary('(');
        engine.append_boundary(')');
        let close = engine.append_boundary(')');
        assert_eq!(engine.get_opening_parenth(close), Some(open));
    }

    #[test]
    fn parameters_split_on_top_level_commas() {
        let mut engine = engine("");
        let open = engine.append_boundary('(');
        for (data, boundary) in [("int", false), (" ", true), ("a", false), (",", true), (" ", true), ("b", false), ("=", true), ("1", false)] {
            if boundary {
                engine.append_boundary(data.chars().next().unwrap());
            } else {
                engine.batch.push_str(data);
                engine.flush_batch();
            }
        }
        let close = engine.append_boundary(')');
        let parsed = engine.split_params(open, close);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].param.name.as_deref(), Some("a"));
        assert_eq!(parsed[0].param.ty.len(), 1);
        assert_eq!(parsed[1].param.name.as_deref(), Some("b"));
        assert!(parsed[1].has_value);
        assert_eq!(parsed[1].param.index, 1);
    }
}
