#![forbid(unsafe_code)]

//! Bash profile.
//!
//! Variable expansions are claimed as whole tokens before the scanner can
//! mistake `$#` for a comment, and `name() {` defines a function.

use vhl_core::{
    Engine, Language, LanguageConfig, ParenthClose, TokenFlags, TokenId, TokenKind, Tokenizer,
    is_identifier_char,
};

pub static BASH: LanguageConfig = LanguageConfig {
    name: "Bash",
    extensions: &["sh", "bash", "zsh", "ksh"],
    aliases: &["bash", "sh", "shell", "zsh", "shellscript"],
    keywords: &[
        "if", "then", "else", "elif", "fi", "case", "esac", "for", "select", "while", "until",
        "do", "done", "in", "function", "time", "return", "exit", "local", "export", "readonly",
        "declare", "typeset", "break", "continue", "shift", "source", "alias", "unset", "eval",
        "exec", "trap", "set",
    ],
    type_def_keywords: &["function"],
    operators: &["=", "==", "!=", "&&", "||", "|", "&", ">", "<", ">>", "<<", "!", "+", "-", "*"],
    single_line_comment_start: "#",
    ..LanguageConfig::DEFAULT
};

/// Single-character special parameters (`$?`, `$#`, `$1`).
const SPECIAL_PARAMETERS: &[char] = &['?', '#', '@', '*', '$', '!', '-', '_'];

#[derive(Debug, Default, Clone, Copy)]
pub struct Bash;

/// Create a tokenizer for Bash and POSIX shell scripts.
pub fn bash_tokenizer() -> Tokenizer {
    Tokenizer::new(Bash)
}

/// End of the expansion starting with the `$` at `dollar`, or `None` when
/// the `$` is literal or opens a command substitution.
fn expansion_end(code: &[char], dollar: usize) -> Option<usize> {
    match code.get(dollar + 1)? {
        '{' => {
            let mut depth = 0usize;
            for (i, ch) in code.iter().enumerate().skip(dollar + 1) {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i + 1);
                        }
                    }
                    '\n' => return None,
                    _ => {}
                }
            }
            None
        }
        ch if ch.is_ascii_digit() || SPECIAL_PARAMETERS.contains(ch) => Some(dollar + 2),
        ch if is_identifier_char(*ch) => Some(
            dollar
                + 1
                + code[dollar + 1..]
                    .iter()
                    .take_while(|ch| is_identifier_char(**ch) && **ch != '$')
                    .count(),
        ),
        _ => None,
    }
}

impl Language for Bash {
    fn config(&self) -> &'static LanguageConfig {
        &BASH
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, is_escaped: bool, _is_preprocessor: bool) -> bool {
        match ch {
            '$' if !is_escaped => {
                let start = cx.index();
                let Some(end) = expansion_end(cx.code(), start) else {
                    return false;
                };
                cx.append_forward_lookup_batch(start..end, Some(TokenKind::Type), TokenFlags::empty());
                true
            }
            '\n' if cx.line() == 0 => {
                // A shebang is read as a comment first.
                if let Some(first) = cx.tokens().first().map(|token| token.id())
                    && cx
                        .token(first)
                        .is_some_and(|token| token.is_comment() && token.data.starts_with("#!"))
                {
                    cx.retag(first, Some(TokenKind::Preprocessor));
                }
                false
            }
            _ => false,
        }
    }

    fn on_parenth_close(&mut self, cx: &mut Engine, close: &ParenthClose) -> Option<TokenId> {
        let before = close.before?;
        let token = cx.token(before)?;
        if token.is(TokenKind::TypeDef) {
            return Some(before);
        }
        let empty = cx.get_next_token(close.open) == Some(close.close);
        let named = token.is_word() && token.kind.is_none();
        if empty && named && cx.next_non_whitespace_char(close.after).map(|(_, ch)| ch) == Some('{') {
            cx.mark_type_def(before);
            return Some(before);
        }
        None
    }
}
