#![forbid(unsafe_code)]

//! Built-in language profiles for the `vhl-core` tokenizer.
//!
//! - [`c_family`] - C and C++ (templates, modifiers, overloads, inheritance)
//! - [`js`] - JavaScript (regexes, template literals, class methods)
//! - [`python`] - Python (indentation scopes, decorators, annotations)
//! - [`json`], [`css`], [`bash`] - thin table-driven profiles with a few hooks
//! - [`html`] - tags and attributes, `<script>`/`<style>` embedding
//! - [`markdown`] - inline markup and fenced code embedding
//! - [`registry`] - lookup by name, alias or file extension
//!
//! # Example
//! ```
//! use vhl_core::TokenKind;
//! use vhl_lang::registry;
//!
//! let mut tokenizer = registry::tokenizer_for(".py").unwrap();
//! let stream = tokenizer.tokenize("def foo(a):\n    pass\n").unwrap();
//! let foo = stream.tokens().iter().find(|token| token.data == "foo").unwrap();
//! assert!(foo.is(TokenKind::TypeDef));
//! assert!(registry::tokenizer_for("cobol").is_none());
//! ```

pub mod bash;
pub mod c_family;
pub mod css;
pub mod html;
pub mod js;
pub mod json;
pub mod markdown;
pub mod python;
pub mod registry;

mod support;

pub use bash::bash_tokenizer;
pub use c_family::cpp_tokenizer;
pub use css::css_tokenizer;
pub use html::html_tokenizer;
pub use js::javascript_tokenizer;
pub use json::json_tokenizer;
pub use markdown::{markdown_tokenizer, markdown_tokenizer_with};
pub use python::python_tokenizer;
pub use registry::{LanguageId, resolve, tokenizer_for};
