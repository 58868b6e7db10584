#![forbid(unsafe_code)]

//! Python profile.
//!
//! Scopes close by indentation, so definitions push their own parent and the
//! post-modifier region of a `def` ends at its `:`.

use vhl_core::{
    Engine, Language, LanguageConfig, ModifierRegion, ParenthClose, Token, TokenFlags, TokenId,
    TokenKind, TokenizeError, Tokenizer,
};

use crate::support;

pub static PYTHON: LanguageConfig = LanguageConfig {
    name: "Python",
    extensions: &["py", "pyw", "pyi"],
    aliases: &["python", "py", "python3"],
    keywords: &[
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "case",
        "class", "continue", "def", "del", "elif", "else", "except", "finally", "for", "from",
        "global", "if", "import", "in", "is", "lambda", "match", "nonlocal", "not", "or", "pass",
        "raise", "return", "self", "try", "while", "with", "yield",
    ],
    type_def_keywords: &["class", "def"],
    builtin_types: &[
        "int", "float", "complex", "str", "bytes", "bool", "list", "dict", "tuple", "set",
        "frozenset", "object", "type",
    ],
    operators: &[
        "+", "-", "*", "/", "//", "%", "**", "=", "==", "!=", "<", ">", "<=", ">=", "&", "|",
        "^", "~", "<<", ">>", "+=", "-=", "*=", "/=",
    ],
    string_prefixes: &[
        "r", "u", "b", "f", "rb", "br", "fr", "rf", "R", "U", "B", "F", "Rb", "bR", "Fr", "rF",
    ],
    single_line_comment_start: "#",
    allow_triple_quotes: true,
    allow_comment_codeblock: true,
    allow_assignment_parameters: true,
    allow_decorators: true,
    post_modifier_end: &[':'],
    indent_language: true,
    ..LanguageConfig::DEFAULT
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Python;

/// Create a tokenizer for Python.
pub fn python_tokenizer() -> Tokenizer {
    Tokenizer::new(Python)
}

impl Language for Python {
    fn config(&self) -> &'static LanguageConfig {
        &PYTHON
    }

    fn on_parenth_close(&mut self, cx: &mut Engine, close: &ParenthClose) -> Option<TokenId> {
        let before = close.before?;
        let class_bases = cx.kind(before) == Some(TokenKind::TypeDef)
            && cx
                .get_prev_token(before, true)
                .is_some_and(|prev| cx.data(prev) == "class");
        if !class_bases {
            return cx.default_parenth_target(close);
        }
        // Keyword arguments such as `metaclass=Meta` are not bases.
        let entries = support::split_entries(cx, close.open, Some(close.close))
            .into_iter()
            .filter(|entry| !entry.iter().any(|id| cx.data(*id) == "="))
            .collect();
        support::record_inherited(cx, before, entries, &[], "");
        None
    }

    fn on_post_type_def_modifier_end(
        &mut self,
        cx: &mut Engine,
        region: &ModifierRegion,
    ) -> Result<(), TokenizeError> {
        let type_def = region.type_def;
        let region = support::solid_between(cx, region.close, Some(TokenId(region.last.0 + 1)));
        let Some(arrow) = region
            .windows(2)
            .rposition(|pair| cx.data(pair[0]) == "-" && cx.data(pair[1]) == ">")
        else {
            return Ok(());
        };
        let annotation = region[arrow + 2..].to_vec();
        if annotation.is_empty() {
            return Ok(());
        }
        for id in &annotation {
            if cx.token(*id).is_some_and(|token| token.is_word() && token.kind.is_none()) {
                cx.retag(*id, Some(TokenKind::Type));
            }
        }
        if let Some(meta) = cx.meta_mut(type_def) {
            meta.ty = annotation;
        }
        Ok(())
    }

    fn ends_statement(&self, token: &Token) -> bool {
        !token.has(TokenFlags::DECORATOR) && token.data != ":"
    }

    fn is_scope_separator(&self, token: &Token, line: &[Token]) -> bool {
        token.is(TokenKind::TypeDef)
            && line
                .first()
                .is_some_and(|first| !first.is_whitespace() && !first.is_line_break())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vhl_core::TokenStream;

    fn tokenize(code: &str) -> TokenStream {
        python_tokenizer().tokenize(code).unwrap()
    }

    fn find<'a>(stream: &'a TokenStream, data: &str) -> &'a Token {
        stream
            .tokens()
            .iter()
            .find(|token| token.data == data)
            .unwrap_or_else(|| panic!("no token {data:?}"))
    }

    fn value_data(stream: &TokenStream, ids: &[TokenId]) -> Vec<String> {
        ids.iter().map(|id| stream.get(*id).unwrap().data.clone()).collect()
    }

    #[test]
    fn def_with_default_parameter() {
        let stream = tokenize("def foo(a, b=1):\n    pass\n");
        let foo = find(&stream, "foo");
        assert!(foo.is(TokenKind::TypeDef));
        let params = foo.parameters().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name.as_deref(), Some("a"));
        assert!(params[0].value.is_empty());
        assert_eq!(params[1].name.as_deref(), Some("b"));
        assert_eq!(value_data(&stream, &params[1].value), vec!["1"]);
    }

    #[test]
    fn indentation_closes_scopes() {
        let code = "class A(Base, metaclass=Meta):\n    def run(self) -> int:\n        return 1\n\ndef top():\n    pass\n";
        let stream = tokenize(code);
        let a = find(&stream, "A");
        let inherited = &a.meta().unwrap().inherited;
        assert_eq!(inherited.len(), 1);
        assert_eq!(stream.get(inherited[0].token).unwrap().data, "Base");
        assert!(a.parameters().is_none());

        let run = find(&stream, "run");
        assert_eq!(run.parents(), &[a.id()]);
        assert_eq!(value_data(&stream, &run.meta().unwrap().ty), vec!["int"]);
        let top = find(&stream, "top");
        assert_eq!(top.parents(), &[] as &[TokenId]);
    }

    #[test]
    fn decorators_keyword_arguments_and_prefixes() {
        let code = "@app.route\ndef index():\n    return render(name=f\"x{y}\", r'raw')\n";
        let stream = tokenize(code);
        let index = find(&stream, "index");
        assert_eq!(index.meta().unwrap().custom_decorators, vec!["app.route".to_string()]);
        let render = find(&stream, "render");
        assert!(render.has(TokenFlags::ASSIGNMENT_PARAMETERS));
        assert!(find(&stream, "name").is(TokenKind::Parameter));
        assert!(find(&stream, "f\"x{y}\"").is_str());
        assert!(find(&stream, "r'raw'").is_str());
        assert_eq!(stream.text(), code);
    }

    #[test]
    fn docstrings_span_lines() {
        let code = "def f():\n    \"\"\"Doc\n    more\"\"\"\n";
        let stream = tokenize(code);
        let strings: Vec<_> = stream.tokens().iter().filter(|token| token.is_str()).collect();
        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0].line, 1);
        assert_eq!(strings[1].line, 2);
    }
}
