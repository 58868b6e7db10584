#![forbid(unsafe_code)]

//! vhl public facade crate.
//!
//! This crate provides the stable surface for editors and renderers. It
//! re-exports the token model and the built-in profiles, and adds:
//! - [`highlight`] - one-shot tokenize-and-render to tagged markup
//! - [`Document`] - a text buffer that re-tokenizes incrementally on edit
//!
//! # Example
//! ```
//! use vhl::prelude::*;
//!
//! let html = vhl::highlight("let x = 1;", "js", &HtmlOptions::default())
//!     .unwrap()
//!     .unwrap();
//! assert!(html.contains("token_keyword"));
//!
//! let mut doc = Document::new("python", "def f(a):\n    return a\n").unwrap();
//! doc.set_text("def f(a):\n    return a + 1\n").unwrap();
//! assert_eq!(doc.tokens().text(), doc.text());
//! ```

use std::fmt;

mod document;

pub use document::{Document, edit_between};

// --- Core re-exports -------------------------------------------------------

pub use vhl_core::{
    Edit, HtmlOptions, Language, LanguageConfig, Token, TokenFlags, TokenId, TokenKind,
    TokenMeta, TokenStream, TokenizeError, Tokenizer, build_html,
};

// --- Language re-exports ---------------------------------------------------

pub use vhl_lang::{LanguageId, resolve, tokenizer_for};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for vhl callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A tokenization pass failed.
    Tokenize(TokenizeError),
    /// No built-in profile matches the requested name or extension.
    UnsupportedLanguage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenize(err) => write!(f, "{err}"),
            Self::UnsupportedLanguage(name) => write!(f, "unsupported language: {name}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tokenize(err) => Some(err),
            Self::UnsupportedLanguage(_) => None,
        }
    }
}

impl From<TokenizeError> for Error {
    fn from(err: TokenizeError) -> Self {
        Self::Tokenize(err)
    }
}

/// Standard result type for vhl APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Convenience -----------------------------------------------------------

/// Tokenize `code` with the profile named by `lang` (a name, alias or file
/// extension) and render it as tagged markup.
///
/// Returns `Ok(None)` when no profile matches `lang`.
pub fn highlight(code: &str, lang: &str, options: &HtmlOptions) -> Result<Option<String>> {
    let Some(id) = resolve(lang) else {
        return Ok(None);
    };
    let stream = id.tokenizer().tokenize(code)?;
    Ok(Some(build_html(&stream, options)))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Document, Edit, Error, HtmlOptions, LanguageId, Result, Token, TokenFlags, TokenKind,
        TokenStream, Tokenizer,
    };

    pub use crate::{core, lang};
}

pub use vhl_core as core;
pub use vhl_lang as lang;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_renders_known_languages() {
        let html = highlight("x = 1\n", "py", &HtmlOptions::default())
            .unwrap()
            .unwrap();
        assert!(html.contains("token_operator"));
        assert!(html.contains("token_numeric"));
    }

    #[test]
    fn highlight_skips_unknown_languages() {
        assert_eq!(highlight("x", "cobol", &HtmlOptions::default()), Ok(None));
    }

    #[test]
    fn errors_display_their_cause() {
        let err = Error::UnsupportedLanguage("cobol".into());
        assert_eq!(err.to_string(), "unsupported language: cobol");
        let err = Error::from(TokenizeError::InvalidEdit { reason: "bad" });
        assert_eq!(err.to_string(), "invalid edit: bad");
        assert!(std::error::Error::source(&err).is_some());
    }
}
