#![forbid(unsafe_code)]

//! Tokenizer errors.

use std::fmt;

/// Failure of a tokenization pass.
///
/// Malformed source never fails a pass; these errors signal broken caller
/// input or a profile rejecting a construct it must not guess around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A definition's post-modifier region did not end where the profile
    /// requires it to (C++: not right after the closing `)`).
    UnclosedModifierRegion { type_def: String, line: usize },
    /// The edit descriptor does not describe the new text.
    InvalidEdit { reason: &'static str },
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclosedModifierRegion { type_def, line } => write!(
                f,
                "unclosed post-modifier region after `{type_def}` on line {line}"
            ),
            Self::InvalidEdit { reason } => write!(f, "invalid edit: {reason}"),
        }
    }
}

impl std::error::Error for TokenizeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_definition() {
        let err = TokenizeError::UnclosedModifierRegion {
            type_def: "func".into(),
            line: 3,
        };
        assert_eq!(
            err.to_string(),
            "unclosed post-modifier region after `func` on line 3"
        );
    }

    #[test]
    fn display_invalid_edit() {
        let err = TokenizeError::InvalidEdit {
            reason: "range outside the text",
        };
        assert_eq!(err.to_string(), "invalid edit: range outside the text");
    }
}
