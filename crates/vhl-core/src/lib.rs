#![forbid(unsafe_code)]

//! Incremental, heuristic tokenizer engine.
//!
//! This crate provides the language-independent core:
//! - [`Token`] / [`TokenStream`] - the flat, line-partitioned token model
//! - [`Scanner`] / [`iterate_code`] - per-character string/comment/regex classification
//! - [`Engine`] - pass state and the primitives language hooks work with
//! - [`Language`] / [`LanguageConfig`] - declarative profiles plus hook points
//! - [`Tokenizer`] - full, stoppable and partial (incremental) passes
//! - [`build_html`] - token stream to tagged markup
//!
//! # Example
//! ```
//! use vhl_core::{Language, LanguageConfig, TokenKind, Tokenizer};
//!
//! static TINY: LanguageConfig = LanguageConfig {
//!     name: "tiny",
//!     keywords: &["let"],
//!     operators: &["="],
//!     ..LanguageConfig::DEFAULT
//! };
//!
//! struct Tiny;
//!
//! impl Language for Tiny {
//!     fn config(&self) -> &'static LanguageConfig {
//!         &TINY
//!     }
//! }
//!
//! let stream = Tokenizer::new(Tiny).tokenize("let x = 1\n").unwrap();
//! assert_eq!(stream.line_count(), 2);
//! assert!(stream.tokens()[0].is(TokenKind::Keyword));
//! assert_eq!(stream.text(), "let x = 1\n");
//! ```

pub mod engine;
pub mod error;
pub mod html;
pub mod language;
pub mod scanner;
pub mod stream;
pub mod token;
pub mod tokenizer;

pub use engine::{Depths, Engine, Mode, Parent, is_identifier_char, is_numeric};
pub use error::TokenizeError;
pub use html::{HtmlOptions, build_html};
pub use language::{Language, LanguageConfig, Lexicon, ModifierRegion, ParenthClose, is_blank};
pub use scanner::{CharClass, Scanner, iterate_code};
pub use stream::TokenStream;
pub use token::{Inherited, Param, TemplateParam, Token, TokenFlags, TokenId, TokenKind, TokenMeta};
pub use tokenizer::{Edit, Tokenizer};
