//! Property-based invariant tests for the character classifier.
//!
//! 1. Every character in the range is visited once, in order.
//! 2. String, comment, regex and preprocessor regions never overlap.
//! 3. A character is escaped iff an odd run of backslashes precedes it.
//! 4. The first `Some` returned by the visitor stops the walk.

use proptest::prelude::*;
use vhl_core::{CharClass, LanguageConfig, iterate_code};

// ── Helpers ─────────────────────────────────────────────────────────────

static C_LIKE: LanguageConfig = LanguageConfig {
    name: "c-like",
    operators: &["=", "+", "-", "/", "*"],
    single_line_comment_start: "//",
    multi_line_comment_start: "/*",
    multi_line_comment_end: "*/",
    allow_preprocessors: true,
    allow_slash_regexes: true,
    allow_template_strings: true,
    ..LanguageConfig::DEFAULT
};

static PY_LIKE: LanguageConfig = LanguageConfig {
    name: "py-like",
    single_line_comment_start: "#",
    allow_triple_quotes: true,
    ..LanguageConfig::DEFAULT
};

const ALPHABET: &[char] = &[
    'a', 'b', '1', ' ', '\n', '\\', '\\', '"', '\'', '`', '/', '*', '#', '$', '{', '}', '(', '=',
];

fn chars_strategy() -> impl Strategy<Value = Vec<char>> {
    prop::collection::vec(prop::sample::select(ALPHABET.to_vec()), 0..120)
}

fn config_strategy() -> impl Strategy<Value = &'static LanguageConfig> {
    prop_oneof![Just(&C_LIKE), Just(&PY_LIKE)]
}

fn classes(chars: &[char], config: &LanguageConfig) -> Vec<CharClass> {
    let mut out = Vec::with_capacity(chars.len());
    iterate_code(chars, 0..chars.len(), config, |class| {
        out.push(*class);
        None::<()>
    });
    out
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Complete, ordered walk
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_char_is_visited_in_order(chars in chars_strategy(), config in config_strategy()) {
        let visited: Vec<char> = classes(&chars, config).iter().map(|class| class.ch).collect();
        prop_assert_eq!(visited, chars);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Exclusive regions
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn regions_are_exclusive(chars in chars_strategy(), config in config_strategy()) {
        for (i, class) in classes(&chars, config).iter().enumerate() {
            let active = [
                class.in_string,
                class.in_single_line_comment,
                class.in_multi_line_comment,
                class.in_regex,
                class.in_preprocessor,
            ]
            .iter()
            .filter(|flag| **flag)
            .count();
            prop_assert!(active <= 1, "char {} {:?} is in {} regions", i, class.ch, active);
            prop_assert_eq!(class.is_code(), active == 0);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Escapes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn escapes_follow_backslash_parity(chars in chars_strategy()) {
        for (i, class) in classes(&chars, &C_LIKE).iter().enumerate() {
            let run = chars[..i].iter().rev().take_while(|ch| **ch == '\\').count();
            prop_assert_eq!(class.is_escaped, run % 2 == 1, "char {}", i);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Early exit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn first_some_stops_the_walk(chars in chars_strategy(), stop in 0usize..140) {
        let mut visited = 0usize;
        let result = iterate_code(&chars, 0..chars.len(), &C_LIKE, |_| {
            visited += 1;
            (visited > stop).then_some(visited - 1)
        });
        if stop < chars.len() {
            prop_assert_eq!(result, Some(stop));
            prop_assert_eq!(visited, stop + 1);
        } else {
            prop_assert_eq!(result, None);
            prop_assert_eq!(visited, chars.len());
        }
    }
}
