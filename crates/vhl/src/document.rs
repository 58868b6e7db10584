#![forbid(unsafe_code)]

//! Incremental document model.

use tracing::debug;
use vhl_core::{Edit, TokenStream, TokenizeError, Tokenizer};
use vhl_lang::LanguageId;

use crate::{Error, Result};

/// Describe the change from `old` to `new` as an [`Edit`] over the lines
/// between their common leading and trailing lines.
///
/// Returns `None` when the texts are equal.
pub fn edit_between(old: &str, new: &str) -> Option<Edit> {
    if old == new {
        return None;
    }
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let shared = old_lines.len().min(new_lines.len());
    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count()
        .min(shared);
    let suffix = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
        .min(shared - prefix);

    // A pure deletion leaves no changed line in the new text; the line after
    // the gap stands in for it. An append restarts at the old last line.
    let last = new_lines.len() - 1;
    let start = prefix.min(last).min(old_lines.len() - 1);
    let end = (new_lines.len() - suffix).saturating_sub(1).clamp(start, last);
    Some(Edit {
        start,
        end,
        line_additions: new_lines.len() as isize - old_lines.len() as isize,
    })
}

/// A text buffer with an up-to-date token stream.
///
/// Edits re-tokenize the enclosing scope only; when the edit cannot be
/// applied incrementally the whole text is tokenized again.
pub struct Document {
    language: LanguageId,
    text: String,
    tokens: TokenStream,
    tokenizer: Tokenizer,
}

impl Document {
    /// Create a document for the profile named by `lang` (a name, alias or
    /// file extension).
    pub fn new(lang: &str, text: impl Into<String>) -> Result<Self> {
        let language = vhl_lang::resolve(lang).ok_or_else(|| Error::UnsupportedLanguage(lang.to_string()))?;
        Self::with_language(language, text)
    }

    pub fn with_language(language: LanguageId, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut tokenizer = language.tokenizer();
        let tokens = tokenizer.tokenize(&text)?;
        Ok(Self {
            language,
            text,
            tokens,
            tokenizer,
        })
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    /// Replace the text, re-tokenizing the lines described by `edit`.
    ///
    /// An edit that does not describe the new text falls back to a full pass.
    /// On error the document keeps its previous state.
    pub fn apply_edit(&mut self, new_text: impl Into<String>, edit: Edit) -> Result<&TokenStream> {
        let new_text = new_text.into();
        let tokens = match self.tokenizer.partial_tokenize(&new_text, edit, &self.tokens) {
            Ok(tokens) => tokens,
            Err(err @ TokenizeError::InvalidEdit { .. }) => {
                debug!(error = %err, "partial pass rejected, tokenizing the whole text");
                self.tokenizer.tokenize(&new_text)?
            }
            Err(err) => return Err(err.into()),
        };
        self.text = new_text;
        self.tokens = tokens;
        Ok(&self.tokens)
    }

    /// Replace the text, deriving the edit from a line diff.
    pub fn set_text(&mut self, new_text: impl Into<String>) -> Result<&TokenStream> {
        let new_text = new_text.into();
        match edit_between(&self.text, &new_text) {
            Some(edit) => self.apply_edit(new_text, edit),
            None => Ok(&self.tokens),
        }
    }

    /// Tokenize the current text from scratch.
    pub fn refresh(&mut self) -> Result<&TokenStream> {
        self.tokens = self.tokenizer.tokenize(&self.text)?;
        Ok(&self.tokens)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("language", &self.language)
            .field("lines", &self.tokens.line_count())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(start: usize, end: usize, line_additions: isize) -> Edit {
        Edit {
            start,
            end,
            line_additions,
        }
    }

    #[test]
    fn diff_of_a_changed_line() {
        assert_eq!(edit_between("a\nb\nc", "a\nB\nc"), Some(edit(1, 1, 0)));
        assert_eq!(edit_between("a\nb\nc", "a\nb\nc"), None);
    }

    #[test]
    fn diff_of_insertions_and_deletions() {
        assert_eq!(edit_between("a\nc", "a\nb1\nb2\nc"), Some(edit(1, 2, 2)));
        assert_eq!(edit_between("a\nb\nc", "a\nc"), Some(edit(1, 1, -1)));
        assert_eq!(edit_between("a\nb", "a"), Some(edit(0, 0, -1)));
        assert_eq!(edit_between("", "x\n"), Some(edit(0, 0, 1)));
        assert_eq!(edit_between("a\n", "a\nb\n"), Some(edit(1, 1, 1)));
    }

    #[test]
    fn unknown_language_is_an_error() {
        let err = Document::new("cobol", "").unwrap_err();
        assert_eq!(err, Error::UnsupportedLanguage("cobol".into()));
    }

    #[test]
    fn edits_match_a_full_pass() {
        let mut doc = Document::new("js", "function f(a) {\n  return a;\n}\n").unwrap();
        let edited = "function f(a) {\n  return a * 2;\n}\n";
        let tokens = doc.apply_edit(edited, Edit::line(1)).unwrap().clone();
        let full = LanguageId::JavaScript.tokenizer().tokenize(edited).unwrap();
        assert_eq!(tokens, full);
        assert_eq!(doc.text(), edited);
    }

    #[test]
    fn unbalanced_cpp_definitions_still_open() {
        let mut doc = Document::new("cpp", "int f() {}\n").unwrap();
        doc.set_text("int f() x) {}\n").unwrap();
        assert_eq!(doc.tokens().text(), doc.text());
        let doc = Document::new("cpp", "void f(a) b) ;\n").unwrap();
        assert_eq!(doc.tokens().line_count(), 2);
    }

    #[test]
    fn stale_edit_falls_back_to_a_full_pass() {
        let mut doc = Document::new("py", "x = 1\n").unwrap();
        let edited = "x = 1\ny = 2\nz = 3\n";
        // Claims no line was added.
        let tokens = doc.apply_edit(edited, Edit::line(1)).unwrap();
        assert_eq!(tokens.text(), edited);
        assert_eq!(tokens.line_count(), 4);
    }

    #[test]
    fn set_text_diffs_lines() {
        let mut doc = Document::with_language(LanguageId::Python, "def f(a):\n    return a\n").unwrap();
        doc.set_text("def f(a):\n    return a\n\ndef g():\n    pass\n").unwrap();
        assert_eq!(doc.tokens().text(), doc.text());
        let g = doc.tokens().tokens().iter().find(|token| token.data == "g").unwrap();
        assert!(g.is(vhl_core::TokenKind::TypeDef));
        assert!(format!("{doc:?}").starts_with("Document { language: Python, lines: 6,"));
    }
}
