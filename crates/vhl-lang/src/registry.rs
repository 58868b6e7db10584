#![forbid(unsafe_code)]

//! Language lookup by name, alias or file extension.
//!
//! Lookups are case-insensitive and ignore a leading dot, so `"C++"`,
//! `"cpp"` and `".HPP"` all resolve to [`LanguageId::CFamily`]. Unknown
//! input resolves to `None`; it is not an error.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use vhl_core::{LanguageConfig, Tokenizer};

use crate::{bash, c_family, css, html, js, json, markdown, python};

/// The built-in profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageId {
    CFamily,
    JavaScript,
    Python,
    Json,
    Css,
    Bash,
    Html,
    Markdown,
}

impl LanguageId {
    /// Every profile, in lookup priority order.
    pub const ALL: [Self; 8] = [
        Self::CFamily,
        Self::JavaScript,
        Self::Python,
        Self::Json,
        Self::Css,
        Self::Bash,
        Self::Html,
        Self::Markdown,
    ];

    pub fn config(self) -> &'static LanguageConfig {
        match self {
            Self::CFamily => &c_family::CPP,
            Self::JavaScript => &js::JAVASCRIPT,
            Self::Python => &python::PYTHON,
            Self::Json => &json::JSON,
            Self::Css => &css::CSS,
            Self::Bash => &bash::BASH,
            Self::Html => &html::HTML,
            Self::Markdown => &markdown::MARKDOWN,
        }
    }

    /// Display name of the profile.
    pub fn name(self) -> &'static str {
        self.config().name
    }

    /// A fresh tokenizer for this profile.
    pub fn tokenizer(self) -> Tokenizer {
        match self {
            Self::CFamily => c_family::cpp_tokenizer(),
            Self::JavaScript => js::javascript_tokenizer(),
            Self::Python => python::python_tokenizer(),
            Self::Json => json::json_tokenizer(),
            Self::Css => css::css_tokenizer(),
            Self::Bash => bash::bash_tokenizer(),
            Self::Html => html::html_tokenizer(),
            Self::Markdown => markdown::markdown_tokenizer(),
        }
    }
}

#[derive(Debug, Default)]
struct Index {
    by_name: FxHashMap<String, LanguageId>,
    by_extension: FxHashMap<String, LanguageId>,
}

fn key(name: &str) -> String {
    name.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn index() -> &'static Index {
    static INDEX: OnceLock<Index> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = Index::default();
        // Earlier profiles win shared names.
        for id in LanguageId::ALL {
            let config = id.config();
            for name in std::iter::once(&config.name).chain(config.aliases) {
                index.by_name.entry(key(name)).or_insert(id);
            }
            for ext in config.extensions {
                index.by_extension.entry(key(ext)).or_insert(id);
            }
        }
        index
    })
}

/// Look up a profile by name or alias (case-insensitive).
pub fn by_name(name: &str) -> Option<LanguageId> {
    index().by_name.get(&key(name)).copied()
}

/// Look up a profile by file extension (case-insensitive, dot optional).
pub fn for_extension(ext: &str) -> Option<LanguageId> {
    index().by_extension.get(&key(ext)).copied()
}

/// Look up a profile by name, alias or extension.
pub fn resolve(name: &str) -> Option<LanguageId> {
    by_name(name).or_else(|| for_extension(name))
}

/// A fresh tokenizer for `name`, or `None` when no profile matches.
pub fn tokenizer_for(name: &str) -> Option<Tokenizer> {
    resolve(name).map(LanguageId::tokenizer)
}

/// Display names of every profile.
pub fn names() -> Vec<&'static str> {
    LanguageId::ALL.iter().map(|id| id.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_aliases_and_extensions() {
        assert_eq!(resolve("C++"), Some(LanguageId::CFamily));
        assert_eq!(resolve(".HPP"), Some(LanguageId::CFamily));
        assert_eq!(resolve("javascript"), Some(LanguageId::JavaScript));
        assert_eq!(resolve("mjs"), Some(LanguageId::JavaScript));
        assert_eq!(resolve(" py "), Some(LanguageId::Python));
        assert_eq!(resolve("shellscript"), Some(LanguageId::Bash));
        assert_eq!(resolve("md"), Some(LanguageId::Markdown));
        assert_eq!(for_extension("scss"), Some(LanguageId::Css));
        assert_eq!(by_name("htm"), None);
        assert_eq!(for_extension("htm"), Some(LanguageId::Html));
    }

    #[test]
    fn unknown_input_is_none() {
        assert_eq!(resolve("cobol"), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("."), None);
        assert!(tokenizer_for("brainfuck").is_none());
    }

    #[test]
    fn every_profile_resolves_by_its_name() {
        for id in LanguageId::ALL {
            assert_eq!(by_name(id.name()), Some(id));
            assert_eq!(id.tokenizer().language_name(), id.name());
        }
        assert_eq!(names().len(), 8);
    }
}
