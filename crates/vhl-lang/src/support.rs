#![forbid(unsafe_code)]

//! Token walks shared by several profiles.

use vhl_core::{Engine, Inherited, TokenFlags, TokenId, TokenKind};

/// Non-blank, non-comment tokens of the current pass.
pub(crate) fn solid_between(cx: &Engine, after: TokenId, until: Option<TokenId>) -> Vec<TokenId> {
    cx.tokens()
        .iter()
        .filter(|token| token.index > after.0 && until.is_none_or(|until| token.index < until.0))
        .filter(|token| !token.is_blank() && !token.is_comment())
        .map(|token| token.id())
        .collect()
}

/// Tokens strictly between `after` and `until` (the end of the pass when
/// `None`), split at top-level commas.
pub(crate) fn split_entries(cx: &Engine, after: TokenId, until: Option<TokenId>) -> Vec<Vec<TokenId>> {
    let mut entries = vec![Vec::new()];
    let mut depth = 0i32;
    for id in solid_between(cx, after, until) {
        let Some(token) = cx.token(id) else {
            continue;
        };
        if !token.flags.intersects(TokenFlags::STR | TokenFlags::REGEX) {
            match token.data.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                "," if depth == 0 && !token.has(TokenFlags::TEMPLATE) => {
                    entries.push(Vec::new());
                    continue;
                }
                _ => {}
            }
        }
        if let Some(entry) = entries.last_mut() {
            entry.push(id);
        }
    }
    entries.retain(|entry| !entry.is_empty());
    entries
}

/// Store one inheritance record per entry on `type_def`. The base is the
/// last top-level word of an entry that is neither a template argument nor
/// listed in `accesses`; the listed words become the access string.
pub(crate) fn record_inherited(
    cx: &mut Engine,
    type_def: TokenId,
    entries: Vec<Vec<TokenId>>,
    accesses: &[&str],
    fallback_access: &str,
) {
    let mut inherited = Vec::new();
    for entry in entries {
        let mut access: Vec<&str> = Vec::new();
        let mut base = None;
        let mut depth = 0i32;
        for id in entry {
            let Some(token) = cx.token(id) else {
                continue;
            };
            match token.data.as_str() {
                "(" | "[" => depth += 1,
                ")" | "]" => depth -= 1,
                _ => {}
            }
            if depth != 0 || !token.is_word() || token.has(TokenFlags::TEMPLATE) {
                continue;
            }
            if let Some(word) = accesses.iter().find(|word| **word == token.data) {
                access.push(*word);
            } else if !token.is(TokenKind::Keyword) {
                base = Some(id);
            }
        }
        let Some(token) = base else {
            continue;
        };
        cx.retag(token, Some(TokenKind::Type));
        let access = if access.is_empty() {
            fallback_access.to_string()
        } else {
            access.join(" ")
        };
        inherited.push(Inherited { access, token });
    }
    if !inherited.is_empty()
        && let Some(meta) = cx.meta_mut(type_def)
    {
        meta.inherited = inherited;
    }
}

/// Whether the token before `id` is absent, ends a statement, or sits on an
/// earlier line.
pub(crate) fn starts_statement(cx: &Engine, id: TokenId) -> bool {
    let Some(prev) = cx.get_prev_token(id, true).and_then(|prev| cx.token(prev)) else {
        return true;
    };
    let line = cx.token(id).map_or(prev.line, |token| token.line);
    prev.line < line || matches!(prev.data.as_str(), ";" | "{" | "}")
}

/// End of the line containing `from` (index of its `\n`, or the text length).
pub(crate) fn line_end(code: &[char], from: usize) -> usize {
    code[from.min(code.len())..]
        .iter()
        .position(|ch| *ch == '\n')
        .map_or(code.len(), |pos| from + pos)
}
