#![forbid(unsafe_code)]

//! C and C++ profile.
//!
//! Besides the tables this profile recovers the shape of definitions from
//! the surrounding tokens:
//! - function definitions versus calls, constructors and destructors
//! - `template<...>` clauses, leading `requires` clauses and pre-modifiers
//! - post-modifiers, trailing return types and trailing `requires` clauses
//! - operator overloads (`operator==`, `operator[]`, `operator()`)
//! - qualified names (`A::B::f`), whose qualifiers become duplicate parents
//! - base class lists (`class X : public Y, private Z`)

use vhl_core::{
    Engine, Language, LanguageConfig, ModifierRegion, ParenthClose, Token, TokenFlags, TokenId,
    TokenKind, TokenizeError, Tokenizer,
};

use crate::support;

pub static CPP: LanguageConfig = LanguageConfig {
    name: "C++",
    extensions: &["c", "h", "cpp", "hpp", "cc", "cxx", "hxx", "hh", "ino", "ipp", "tpp"],
    aliases: &["c", "cpp", "c++", "cxx", "cc", "h", "hpp", "objc"],
    keywords: &[
        "alignas", "alignof", "and", "asm", "break", "case", "catch", "class", "co_await",
        "co_return", "co_yield", "concept", "const", "const_cast", "consteval", "constexpr",
        "constinit", "continue", "decltype", "default", "delete", "do", "dynamic_cast", "else",
        "enum", "explicit", "export", "extern", "false", "final", "for", "friend", "goto", "if",
        "inline", "mutable", "namespace", "new", "noexcept", "not", "nullptr", "operator", "or",
        "override", "private", "protected", "public", "register", "reinterpret_cast", "requires",
        "return", "sizeof", "static", "static_assert", "static_cast", "struct", "switch",
        "template", "this", "thread_local", "throw", "true", "try", "typedef", "typeid",
        "typename", "union", "using", "virtual", "volatile", "while", "xor",
    ],
    type_def_keywords: &["namespace", "struct", "class", "enum", "union", "concept"],
    type_keywords: &["new"],
    builtin_types: &[
        "void", "bool", "char", "short", "int", "long", "float", "double", "unsigned", "signed",
        "auto", "size_t", "ssize_t", "ptrdiff_t", "wchar_t", "char8_t", "char16_t", "char32_t",
        "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t", "uint64_t",
        "uintptr_t", "intptr_t",
    ],
    exclude_type_def_keywords_on_prev: &["enum", "friend", "<", ","],
    variable_lookahead_keywords: &["struct", "class", "union", "enum"],
    operators: &[
        "&&", "||", "!", "==", "!=", ">=", "<=", ">", "<", "=", "+", "-", "*", "/", "%", "&",
        "|", "^", "~", "<<", ">>", "?", ":", "::", "++", "--", "+=", "-=", "*=", "/=", "%=",
        "&=", "|=", "^=", "<<=", ">>=", "<=>",
    ],
    single_line_comment_start: "//",
    multi_line_comment_start: "/*",
    multi_line_comment_end: "*/",
    allow_preprocessors: true,
    allow_comment_keyword: true,
    allow_comment_codeblock: true,
    allow_templates: true,
    template_chars: &[':', ',', '*', '&', '.', '=', '+', '-', '!', '~', '^', '|', '%', '?'],
    ..LanguageConfig::DEFAULT
};

/// Keywords recorded as pre-modifiers of a definition.
const PRE_MODIFIERS: &[&str] = &[
    "static", "inline", "virtual", "constexpr", "consteval", "constinit", "explicit", "friend",
    "extern", "thread_local", "mutable", "volatile", "const", "register",
];

/// Words that may precede a base class.
const ACCESS: &[&str] = &["public", "protected", "private", "virtual"];

/// Upper bound of the backward walk over a definition's leading clauses.
const MAX_LEADING_TOKENS: usize = 64;

/// The C-family profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct CFamily;

/// Create a tokenizer for C and C++.
pub fn cpp_tokenizer() -> Tokenizer {
    Tokenizer::new(CFamily)
}

// ---------------------------------------------------------------------------
// Walks
// ---------------------------------------------------------------------------

/// A piece of a definition's leading clauses.
#[derive(Debug, Clone, Copy)]
enum Segment {
    Token(TokenId),
    /// A balanced `<...>` or `(...)` group.
    Group { open: TokenId, close: TokenId },
}

/// Qualifiers of `name` (`A`, `B` of `A::B::name`), outermost first, and
/// the token the qualified name starts at (a leading `~` included).
fn qualifiers(cx: &Engine, name: TokenId) -> (Vec<TokenId>, TokenId) {
    let mut start = name;
    if let Some(prev) = cx.get_prev_token(name, true)
        && cx.data(prev) == "~"
    {
        start = prev;
    }
    let mut quals = Vec::new();
    while let Some(sep) = cx.get_prev_token(start, true)
        && cx.data(sep) == "::"
    {
        let Some(mut qual) = cx.get_prev_token(sep, true) else {
            break;
        };
        if let Some(token) = cx.token(qual)
            && token.data == ">"
            && token.has(TokenFlags::TEMPLATE)
        {
            let Some(owner) = cx
                .get_opening_template(qual)
                .and_then(|open| cx.get_prev_token(open, true))
            else {
                break;
            };
            qual = owner;
        }
        if !cx.token(qual).is_some_and(Token::is_word) {
            break;
        }
        quals.push(qual);
        start = qual;
    }
    quals.reverse();
    (quals, start)
}

/// The `operator` keyword owning the parameter list opened at `open`, and
/// the operator tokens between them.
fn overload(cx: &Engine, open: TokenId) -> Option<(TokenId, Vec<TokenId>)> {
    let mut operators = Vec::new();
    let mut cursor = open;
    for _ in 0..4 {
        let prev = cx.get_prev_token(cursor, true)?;
        let token = cx.token(prev)?;
        if token.data == "operator" && token.is(TokenKind::Keyword) {
            if operators.is_empty() {
                return None;
            }
            operators.reverse();
            return Some((prev, operators));
        }
        let conversion = token.is_word()
            && operators.is_empty()
            && cx
                .get_prev_token(prev, true)
                .is_some_and(|before| cx.data(before) == "operator");
        if !(token.is_word_boundary() || conversion) || token.has(TokenFlags::STR) {
            return None;
        }
        operators.push(prev);
        cursor = prev;
    }
    None
}

/// Walk backward from `start` over the leading clauses of a definition and
/// return them in source order.
fn leading_segments(cx: &Engine, start: TokenId) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = start;
    while segments.len() < MAX_LEADING_TOKENS {
        let Some(prev) = cx.get_prev_token(cursor, true) else {
            break;
        };
        let Some(token) = cx.token(prev) else {
            break;
        };
        if token.flags.intersects(TokenFlags::PREPROCESSOR | TokenFlags::STR | TokenFlags::REGEX) {
            break;
        }
        if token.data == ">" && token.has(TokenFlags::TEMPLATE) {
            let Some(open) = cx.get_opening_template(prev) else {
                break;
            };
            segments.push(Segment::Group { open, close: prev });
            cursor = open;
            continue;
        }
        if token.data == ")" {
            let Some(open) = cx.get_opening_parenth(prev) else {
                break;
            };
            segments.push(Segment::Group { open, close: prev });
            cursor = open;
            continue;
        }
        if token.has(TokenFlags::TEMPLATE)
            || matches!(token.data.as_str(), ";" | "{" | "}" | "(" | "," | "=" | ":")
        {
            break;
        }
        if !cx.lexicon().is_type_def_keyword(&token.data) {
            segments.push(Segment::Token(prev));
        }
        cursor = prev;
    }
    segments.reverse();
    segments
}

/// Non-blank tokens from `open` to `close`, both included.
fn group_tokens(cx: &Engine, open: TokenId, close: TokenId) -> Vec<TokenId> {
    cx.tokens()
        .iter()
        .filter(|token| token.index >= open.0 && token.index <= close.0 && !token.is_blank())
        .map(Token::id)
        .collect()
}

fn segment_tokens(cx: &Engine, segment: Segment) -> Vec<TokenId> {
    match segment {
        Segment::Token(id) => vec![id],
        Segment::Group { open, close } => group_tokens(cx, open, close),
    }
}

fn segment_line(cx: &Engine, segment: Segment) -> Option<usize> {
    let first = match segment {
        Segment::Token(id) => id,
        Segment::Group { open, .. } => open,
    };
    cx.token(first).map(|token| token.line)
}

/// Sort the leading clauses of `id` into templates, requires tokens,
/// pre-modifiers and the declared type.
fn attach_leading(cx: &mut Engine, id: TokenId, start: TokenId) {
    let segments = leading_segments(cx, start);
    if segments.is_empty() {
        return;
    }

    let mut templates = Vec::new();
    let mut template_tokens = Vec::new();
    let mut requires_tokens = Vec::new();
    let mut pre_modifiers = Vec::new();
    let mut ty = Vec::new();
    let mut after_template = false;
    let mut requires_line = None;

    for segment in segments {
        if after_template {
            after_template = false;
            if let Segment::Group { open, close } = segment
                && cx.data(open) == "<"
            {
                let (params, tokens) = cx.parse_params(open, close);
                templates = params;
                template_tokens = tokens;
                continue;
            }
        }
        let line = segment_line(cx, segment);
        if requires_line.is_some() && requires_line == line {
            requires_tokens.extend(segment_tokens(cx, segment));
            continue;
        }
        requires_line = None;

        let Segment::Token(token) = segment else {
            ty.extend(segment_tokens(cx, segment));
            continue;
        };
        match cx.data(token) {
            "template" => after_template = true,
            "requires" => {
                requires_line = line;
                requires_tokens.push(token);
            }
            data if cx.kind(token) == Some(TokenKind::Keyword) && PRE_MODIFIERS.contains(&data) => {
                pre_modifiers.push(token);
            }
            _ => ty.push(token),
        }
    }

    if let Some(meta) = cx.meta_mut(id) {
        meta.templates = templates;
        meta.template_tokens = template_tokens;
        meta.requires_tokens = requires_tokens;
        meta.pre_modifiers = pre_modifiers;
        meta.ty = ty;
    }
}

/// Whether the parenthesised list after `name` defines a function.
fn is_definition(cx: &Engine, name: TokenId) -> bool {
    let depth = cx.depth();
    if cx.inside_func() || cx.in_post_modifier_region() || depth.parenth > 0 || depth.template > 0 {
        return false;
    }
    let (quals, start) = qualifiers(cx, name);
    if cx.data(start) == "~" {
        return true;
    }
    let constructor = || {
        let data = cx.data(name);
        quals.last().is_some_and(|qual| cx.data(*qual) == data)
            || cx
                .parents()
                .last()
                .is_some_and(|parent| cx.data(parent.token) == data)
    };
    let Some(prev) = cx.get_prev_token(start, true) else {
        return constructor();
    };
    let Some(token) = cx.token(prev) else {
        return false;
    };
    if token.has(TokenFlags::PREPROCESSOR) {
        return constructor();
    }
    match token.data.as_str() {
        ";" | "{" | "}" | ":" => constructor(),
        ">" => token.has(TokenFlags::TEMPLATE),
        "*" | "&" | "&&" | "**" => cx
            .get_prev_token(prev, true)
            .and_then(|before| cx.token(before))
            .is_some_and(|before| {
                (before.is_word() && !matches!(before.kind, Some(TokenKind::Keyword | TokenKind::Numeric)))
                    || (before.data == ">" && before.has(TokenFlags::TEMPLATE))
                    || (before.is(TokenKind::Keyword) && before.data == "const")
            }),
        data if token.is(TokenKind::Keyword) => PRE_MODIFIERS.contains(&data),
        _ => {
            token.is_word()
                && matches!(token.kind, None | Some(TokenKind::Type | TokenKind::TypeDef))
        }
    }
}

fn unclosed(cx: &Engine, type_def: TokenId) -> TokenizeError {
    TokenizeError::UnclosedModifierRegion {
        type_def: cx.data(type_def).to_string(),
        line: cx.token(type_def).map_or(cx.line(), |token| token.line),
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

impl Language for CFamily {
    fn config(&self) -> &'static LanguageConfig {
        &CPP
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, is_preprocessor: bool) -> bool {
        if ch != '{' || is_preprocessor {
            return false;
        }
        cx.flush_batch();
        let Some(type_def) = cx.pending_scope_token() else {
            return false;
        };
        let class_like = cx
            .get_prev_token(type_def, true)
            .is_some_and(|prev| matches!(cx.data(prev), "class" | "struct" | "union"));
        if !class_like {
            return false;
        }
        let marker = support::solid_between(cx, type_def, None)
            .into_iter()
            .find(|id| cx.data(*id) == ":" && cx.token(*id).is_some_and(|token| !token.has(TokenFlags::TEMPLATE)));
        if let Some(marker) = marker {
            let entries = support::split_entries(cx, marker, None);
            support::record_inherited(cx, type_def, entries, ACCESS, "");
        }
        false
    }

    fn on_parenth_close(&mut self, cx: &mut Engine, close: &ParenthClose) -> Option<TokenId> {
        if let Some((keyword, operators)) = overload(cx, close.open) {
            if !is_definition(cx, keyword) {
                return None;
            }
            if let Some(meta) = cx.meta_mut(keyword) {
                meta.overloaded_operators = operators;
            }
            cx.mark_type_def(keyword);
            return Some(keyword);
        }

        let before = close.before?;
        if !close.eligible {
            return None;
        }
        match cx.kind(before) {
            Some(TokenKind::TypeDef) => Some(before),
            None | Some(TokenKind::Type) if is_definition(cx, before) => {
                cx.mark_type_def(before);
                Some(before)
            }
            _ => cx.default_parenth_target(close),
        }
    }

    fn on_type_def_keyword(&mut self, cx: &mut Engine, token: TokenId) {
        cx.assign_parents(token);
        let (quals, start) = qualifiers(cx, token);
        if !quals.is_empty() {
            for qual in &quals {
                cx.retag(*qual, Some(TokenKind::TypeDef));
                cx.set_flag(*qual, TokenFlags::DUPLICATE);
            }
            if let Some(meta) = cx.meta_mut(token) {
                meta.parents.get_or_insert_with(Vec::new).extend(quals.iter().copied());
            }
        }
        let namespace = cx
            .get_prev_token(quals.first().copied().unwrap_or(token), true)
            .is_some_and(|prev| cx.data(prev) == "namespace");
        if namespace {
            cx.set_flag(token, TokenFlags::NAMESPACE);
            return;
        }
        attach_leading(cx, token, start);
    }

    fn on_post_type_def_modifier_end(
        &mut self,
        cx: &mut Engine,
        region: &ModifierRegion,
    ) -> Result<(), TokenizeError> {
        let type_def = region.type_def;
        if cx.token(region.close).is_none() || cx.token(type_def).is_none() {
            return Err(unclosed(cx, type_def));
        }
        let region = support::solid_between(cx, region.close, Some(TokenId(region.last.0 + 1)));

        let mut post_modifiers = Vec::new();
        let mut trailing = Vec::new();
        let mut requires_tokens = Vec::new();
        let mut target = &mut post_modifiers;
        let mut i = 0;
        while let Some(&id) = region.get(i) {
            i += 1;
            match cx.data(id) {
                // Constructor initializer list.
                ":" => break,
                "-" if region.get(i).is_some_and(|next| cx.data(*next) == ">") => {
                    i += 1;
                    target = &mut trailing;
                }
                "requires" if cx.kind(id) == Some(TokenKind::Keyword) => {
                    target = &mut requires_tokens;
                    target.push(id);
                }
                _ => target.push(id),
            }
        }

        if let Some(meta) = cx.meta_mut(type_def) {
            meta.post_modifiers = post_modifiers;
            if !trailing.is_empty() {
                meta.ty = trailing;
            }
            meta.requires_tokens.extend(requires_tokens);
        }
        Ok(())
    }

    fn is_scope_separator(&self, token: &Token, _line: &[Token]) -> bool {
        let plain = !token.flags.intersects(
            TokenFlags::STR | TokenFlags::COMMENT | TokenFlags::REGEX | TokenFlags::PREPROCESSOR,
        );
        plain
            && token.nesting == 0
            && ((token.is(TokenKind::TypeDef) && !token.has(TokenFlags::DUPLICATE))
                || token.data == "{"
                || token.data == "}")
    }
}
