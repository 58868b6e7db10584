#![forbid(unsafe_code)]

//! Language profiles: declarative tables plus hook points.
//!
//! A profile is a `static` [`LanguageConfig`] (keyword lists, operators,
//! comment delimiters, feature switches) together with a type implementing
//! [`Language`]. The engine consults the tables on every flush and calls the
//! hooks at four transitions; every hook has a default, so the thin profiles
//! implement nothing but [`Language::config`].

use rustc_hash::FxHashSet;

use crate::engine::Engine;
use crate::error::TokenizeError;
use crate::token::{Token, TokenFlags, TokenId};

// ---------------------------------------------------------------------------
// Declarative configuration
// ---------------------------------------------------------------------------

/// Declarative description of a language.
///
/// Empty strings and empty slices disable the corresponding feature. Build
/// profiles with struct update syntax from [`LanguageConfig::DEFAULT`].
#[derive(Debug, Clone, Copy)]
pub struct LanguageConfig {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    /// Additional lookup names (`"c++"`, `"js"`).
    pub aliases: &'static [&'static str],

    pub keywords: &'static [&'static str],
    /// Keywords whose following token introduces a definition (`class`, `def`).
    pub type_def_keywords: &'static [&'static str],
    /// Keywords whose following token is a type reference (`new`, `extends`).
    pub type_keywords: &'static [&'static str],
    /// Words always tagged `type` (`int`, `void`).
    pub builtin_types: &'static [&'static str],
    /// A type-def keyword preceded by one of these does not define anything.
    pub exclude_type_def_keywords_on_prev: &'static [&'static str],
    /// Type-def keywords that look ahead for `keyword Name variable`, in which
    /// case `Name` is a plain `type` (C `struct passwd pass;`).
    pub variable_lookahead_keywords: &'static [&'static str],
    /// Keywords that may still own a parameter list (`operator (`).
    pub allowed_keywords_before_parenth: &'static [&'static str],
    pub operators: &'static [&'static str],
    /// Identifier prefixes absorbed into a following string (`f"..."`).
    pub string_prefixes: &'static [&'static str],

    pub single_line_comment_start: &'static str,
    pub multi_line_comment_start: &'static str,
    pub multi_line_comment_end: &'static str,

    pub allow_strings: bool,
    /// `${...}` interpolation inside backtick strings.
    pub allow_template_strings: bool,
    pub allow_triple_quotes: bool,
    pub allow_numerics: bool,
    pub allow_preprocessors: bool,
    pub allow_slash_regexes: bool,
    pub allow_comment_keyword: bool,
    pub allow_comment_codeblock: bool,
    pub allow_parameters: bool,
    /// Tag `name=` inside call argument lists as `parameter`.
    pub allow_assignment_parameters: bool,
    pub allow_decorators: bool,
    /// Speculative `<...>` template parsing.
    pub allow_templates: bool,
    /// Characters besides identifiers and whitespace allowed inside a template.
    pub template_chars: &'static [char],

    /// Boundary characters that are part of words in this language.
    pub word_chars: &'static [char],
    /// Boundary characters never joined with their neighbours, on top of
    /// [`DEFAULT_EXCLUDED_JOININGS`].
    pub excluded_word_boundary_joinings: &'static [char],
    /// Characters that close a post-type-def-modifier region.
    pub post_modifier_end: &'static [char],
    /// Scopes close by indentation instead of curly braces.
    pub indent_language: bool,
}

impl LanguageConfig {
    pub const DEFAULT: Self = Self {
        name: "",
        extensions: &[],
        aliases: &[],
        keywords: &[],
        type_def_keywords: &[],
        type_keywords: &[],
        builtin_types: &[],
        exclude_type_def_keywords_on_prev: &[],
        variable_lookahead_keywords: &[],
        allowed_keywords_before_parenth: &[],
        operators: &[],
        string_prefixes: &[],
        single_line_comment_start: "",
        multi_line_comment_start: "",
        multi_line_comment_end: "",
        allow_strings: true,
        allow_template_strings: false,
        allow_triple_quotes: false,
        allow_numerics: true,
        allow_preprocessors: false,
        allow_slash_regexes: false,
        allow_comment_keyword: false,
        allow_comment_codeblock: false,
        allow_parameters: true,
        allow_assignment_parameters: false,
        allow_decorators: false,
        allow_templates: false,
        template_chars: &[],
        word_chars: &[],
        excluded_word_boundary_joinings: &[],
        post_modifier_end: &['{', ';'],
        indent_language: false,
    };
}

/// Characters that force a batch flush.
pub const WORD_BOUNDARIES: &[char] = &[
    ' ', '\t', '\n', '\r', '\u{a0}', '.', ',', '!', '?', ';', ':', '-', '+', '/', '\\', '|', '(',
    ')', '[', ']', '{', '}', '<', '>', '=', '*', '&', '%', '#', '@', '`', '~', '"', '\'', '^',
];

/// Scope delimiters are never joined so every one stays its own token.
pub const DEFAULT_EXCLUDED_JOININGS: &[char] = &['{', '}', '[', ']', '(', ')', '<', '>', ',', '='];

/// Whitespace other than a line break.
#[inline]
pub fn is_blank(ch: char) -> bool {
    ch != '\n' && ch.is_whitespace()
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Hash-set view of a [`LanguageConfig`], built once per tokenizer.
#[derive(Debug, Clone)]
pub struct Lexicon {
    keywords: FxHashSet<&'static str>,
    type_def_keywords: FxHashSet<&'static str>,
    type_keywords: FxHashSet<&'static str>,
    builtin_types: FxHashSet<&'static str>,
    exclude_type_def_on_prev: FxHashSet<&'static str>,
    variable_lookahead: FxHashSet<&'static str>,
    allowed_before_parenth: FxHashSet<&'static str>,
    operators: FxHashSet<&'static str>,
    operator_chars: FxHashSet<char>,
    string_prefixes: FxHashSet<&'static str>,
}

fn set(words: &'static [&'static str]) -> FxHashSet<&'static str> {
    words.iter().copied().collect()
}

impl Lexicon {
    pub fn new(config: &LanguageConfig) -> Self {
        let operator_chars = config
            .operators
            .iter()
            .filter_map(|op| {
                let mut chars = op.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(ch),
                    _ => None,
                }
            })
            .collect();
        Self {
            keywords: set(config.keywords),
            type_def_keywords: set(config.type_def_keywords),
            type_keywords: set(config.type_keywords),
            builtin_types: set(config.builtin_types),
            exclude_type_def_on_prev: set(config.exclude_type_def_keywords_on_prev),
            variable_lookahead: set(config.variable_lookahead_keywords),
            allowed_before_parenth: set(config.allowed_keywords_before_parenth),
            operators: set(config.operators),
            operator_chars,
            string_prefixes: set(config.string_prefixes),
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    pub fn is_type_def_keyword(&self, word: &str) -> bool {
        self.type_def_keywords.contains(word)
    }

    pub fn is_type_keyword(&self, word: &str) -> bool {
        self.type_keywords.contains(word)
    }

    pub fn is_builtin_type(&self, word: &str) -> bool {
        self.builtin_types.contains(word)
    }

    pub fn excludes_type_def_after(&self, word: &str) -> bool {
        self.exclude_type_def_on_prev.contains(word)
    }

    pub fn looks_ahead_for_variable(&self, word: &str) -> bool {
        self.variable_lookahead.contains(word)
    }

    pub fn allows_parenth_after(&self, word: &str) -> bool {
        self.allowed_before_parenth.contains(word)
    }

    pub fn is_operator(&self, data: &str) -> bool {
        self.operators.contains(data)
    }

    pub fn is_operator_char(&self, ch: char) -> bool {
        self.operator_chars.contains(&ch)
    }

    pub fn is_string_prefix(&self, word: &str) -> bool {
        self.string_prefixes.contains(word)
    }

    /// Whether a run of boundary characters reads as an operator.
    pub fn is_operator_run(&self, data: &str) -> bool {
        !data.is_empty()
            && (self.is_operator(data) || data.chars().all(|ch| self.is_operator_char(ch)))
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Context of a closing parenthesis, handed to [`Language::on_parenth_close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParenthClose {
    pub open: TokenId,
    pub close: TokenId,
    /// Nearest non-blank token before the opening parenthesis.
    pub before: Option<TokenId>,
    /// Whether `before` may own a parameter list by the generic rules.
    pub eligible: bool,
    /// Character index right after the `)`.
    pub after: usize,
}

/// Post-modifier region of a definition, handed to
/// [`Language::on_post_type_def_modifier_end`].
///
/// The region holds the tokens after `close` up to and including `last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierRegion {
    pub type_def: TokenId,
    /// The `)` closing the definition's parameter list.
    pub close: TokenId,
    /// Last non-blank token before the `{` or `;` ending the region.
    pub last: TokenId,
}

/// Language-specific specialization of the engine.
pub trait Language: Send {
    fn config(&self) -> &'static LanguageConfig;

    /// Clear profile state at the start of a pass.
    fn reset(&mut self) {}

    /// Called for every plain-code (and preprocessor) character before the
    /// default handling. Returning `true` means the character was fully
    /// handled; the hook then either emitted it or called
    /// [`Engine::resume_on_index`].
    fn on_char(&mut self, _cx: &mut Engine, _ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        false
    }

    /// Decide which token owns the parameter list that just closed, or
    /// `None` when it is not a call or definition.
    fn on_parenth_close(&mut self, cx: &mut Engine, close: &ParenthClose) -> Option<TokenId> {
        cx.default_parenth_target(close)
    }

    /// Called once for every token that becomes a `type_def`. Overrides are
    /// responsible for assigning parents.
    fn on_type_def_keyword(&mut self, cx: &mut Engine, token: TokenId) {
        cx.assign_parents(token);
    }

    /// Called when the region between a definition's `)` and its `{` or `;`
    /// ends.
    fn on_post_type_def_modifier_end(
        &mut self,
        _cx: &mut Engine,
        _region: &ModifierRegion,
    ) -> Result<(), TokenizeError> {
        Ok(())
    }

    /// Whether `token`, the last significant token of a line, ends a
    /// statement so the next line can be tokenized on its own.
    fn ends_statement(&self, token: &Token) -> bool {
        self.config().indent_language || matches!(token.data.as_str(), ";" | "{" | "}")
    }

    /// Whether partial re-tokenization may restart at the line holding
    /// `token`. Defaults to top-level curly braces.
    fn is_scope_separator(&self, token: &Token, _line: &[Token]) -> bool {
        token.nesting == 0
            && (token.data == "{" || token.data == "}")
            && !token.flags.intersects(
                TokenFlags::STR | TokenFlags::COMMENT | TokenFlags::REGEX | TokenFlags::PREPROCESSOR,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: LanguageConfig = LanguageConfig {
        name: "sample",
        keywords: &["if", "class"],
        type_def_keywords: &["class"],
        operators: &["=", "+", "==", "&&", "&"],
        string_prefixes: &["f"],
        ..LanguageConfig::DEFAULT
    };

    #[test]
    fn lexicon_lookups() {
        let lexicon = Lexicon::new(&SAMPLE);
        assert!(lexicon.is_keyword("if"));
        assert!(lexicon.is_type_def_keyword("class"));
        assert!(!lexicon.is_type_def_keyword("if"));
        assert!(lexicon.is_string_prefix("f"));
        assert!(lexicon.is_operator("=="));
    }

    #[test]
    fn operator_runs_use_single_char_operators() {
        let lexicon = Lexicon::new(&SAMPLE);
        assert!(lexicon.is_operator_run("&&"));
        assert!(lexicon.is_operator_run("=+"));
        assert!(!lexicon.is_operator_run(";"));
        assert!(!lexicon.is_operator_run(""));
    }

    #[test]
    fn blank_excludes_line_break() {
        assert!(is_blank(' '));
        assert!(is_blank('\t'));
        assert!(!is_blank('\n'));
        assert!(!is_blank('x'));
    }
}
