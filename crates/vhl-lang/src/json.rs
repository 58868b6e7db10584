#![forbid(unsafe_code)]

//! JSON profile. Object keys are tagged `type` so they read apart from
//! string values.

use vhl_core::{Engine, Language, LanguageConfig, TokenKind, Tokenizer};

pub static JSON: LanguageConfig = LanguageConfig {
    name: "JSON",
    extensions: &["json", "jsonc", "json5", "geojson"],
    aliases: &["json", "jsonc"],
    keywords: &["true", "false", "null"],
    operators: &["-"],
    single_line_comment_start: "//",
    multi_line_comment_start: "/*",
    multi_line_comment_end: "*/",
    allow_parameters: false,
    ..LanguageConfig::DEFAULT
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Json;

/// Create a tokenizer for JSON (comments tolerated).
pub fn json_tokenizer() -> Tokenizer {
    Tokenizer::new(Json)
}

impl Language for Json {
    fn config(&self) -> &'static LanguageConfig {
        &JSON
    }

    fn on_char(&mut self, cx: &mut Engine, ch: char, _is_escaped: bool, _is_preprocessor: bool) -> bool {
        if ch == ':'
            && let Some(key) = cx.last_non_blank()
            && cx.token(key).is_some_and(|token| token.is_str())
        {
            cx.retag(key, Some(TokenKind::Type));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_values_and_literals() {
        let code = "{\n  \"name\": \"vhl\",\n  \"size\": -12.5,\n  \"ok\": true\n}\n";
        let stream = json_tokenizer().tokenize(code).unwrap();
        assert_eq!(stream.text(), code);
        let kinds: Vec<_> = stream
            .tokens()
            .iter()
            .filter(|token| !token.is_blank())
            .map(|token| (token.data.as_str(), token.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("{", None),
                ("\"name\"", Some(TokenKind::Type)),
                (":", None),
                ("\"vhl\"", Some(TokenKind::String)),
                (",", None),
                ("\"size\"", Some(TokenKind::Type)),
                (":", None),
                ("-", Some(TokenKind::Operator)),
                ("12.5", Some(TokenKind::Numeric)),
                (",", None),
                ("\"ok\"", Some(TokenKind::Type)),
                (":", None),
                ("true", Some(TokenKind::Keyword)),
                ("}", None),
            ]
        );
    }
}
