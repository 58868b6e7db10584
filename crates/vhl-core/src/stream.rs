#![forbid(unsafe_code)]

//! Line-indexed token container.
//!
//! Tokens are stored in one flat arena ordered by `index`; `line_starts`
//! partitions the arena into per-line slices. Every line but the last ends
//! with its line-break token, so a text with `n` newlines has `n + 1` lines
//! and a text ending in `\n` has a trailing empty line.

use crate::token::{Token, TokenId};

/// Ordered, mutable, line-indexed token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenStream {
    tokens: Vec<Token>,
    line_starts: Vec<usize>,
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStream {
    /// An empty stream: a single empty line.
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            line_starts: vec![0],
        }
    }

    /// Build a stream from a flat token run, partitioning lines at line-break
    /// tokens and renumbering everything from zero.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut stream = Self {
            tokens,
            line_starts: vec![0],
        };
        stream.renumber();
        stream
    }

    pub(crate) fn from_parts(tokens: Vec<Token>, line_starts: Vec<usize>) -> Self {
        debug_assert!(!line_starts.is_empty());
        Self {
            tokens,
            line_starts,
        }
    }

    pub(crate) fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Arena position of the first token of `line`.
    pub(crate) fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Number of line arrays.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Total number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens, in index order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens of one line.
    pub fn line(&self, line: usize) -> Option<&[Token]> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.tokens.len());
        self.tokens.get(start..end)
    }

    /// Iterate line arrays in order.
    pub fn lines(&self) -> impl Iterator<Item = &[Token]> + '_ {
        (0..self.line_count()).map(|line| self.line(line).unwrap_or(&[]))
    }

    /// Resolve a token reference.
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        let first = self.tokens.first()?.index;
        let token = self.tokens.get(id.0.checked_sub(first)?)?;
        (token.index == id.0).then_some(token)
    }

    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        let first = self.tokens.first()?.index;
        let token = self.tokens.get_mut(id.0.checked_sub(first)?)?;
        (token.index == id.0).then_some(token)
    }

    /// Visit tokens of lines `start_line..end_line` in order and return the
    /// first non-`None` visitor result. `end_line` of `None` means "to the end".
    pub fn iterate_tokens<R>(
        &self,
        start_line: usize,
        end_line: Option<usize>,
        visitor: impl FnMut(&Token) -> Option<R>,
    ) -> Option<R> {
        let range = self.arena_range(start_line, end_line)?;
        self.tokens[range].iter().find_map(visitor)
    }

    /// Same as [`iterate_tokens`](Self::iterate_tokens), in reverse order.
    pub fn iterate_tokens_reversed<R>(
        &self,
        start_line: usize,
        end_line: Option<usize>,
        visitor: impl FnMut(&Token) -> Option<R>,
    ) -> Option<R> {
        let range = self.arena_range(start_line, end_line)?;
        self.tokens[range].iter().rev().find_map(visitor)
    }

    fn arena_range(&self, start_line: usize, end_line: Option<usize>) -> Option<std::ops::Range<usize>> {
        let end_line = end_line.unwrap_or(self.line_count()).min(self.line_count());
        if start_line >= end_line {
            return None;
        }
        let start = self.line_starts[start_line];
        let end = self
            .line_starts
            .get(end_line)
            .copied()
            .unwrap_or(self.tokens.len());
        Some(start..end)
    }

    /// Reconstruct the source text.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|token| token.data.as_str()).collect()
    }

    /// Append another stream as if its text were concatenated to this one.
    ///
    /// The first line of `other` continues the last line of `self`. Every
    /// appended token is renumbered and its attachments are rebased.
    pub fn concat(&mut self, other: TokenStream) {
        let base = self.tokens.len();
        let other_first = other.tokens.first().map_or(0, |token| token.index);
        for mut token in other.tokens {
            if let Some(meta) = token.meta.as_mut() {
                meta.remap(&mut |id| id.0.checked_sub(other_first).map(|i| TokenId(base + i)));
            }
            self.tokens.push(token);
        }
        self.renumber();
    }

    /// Reassign `index`, `line` and `offset` sequentially and rebuild the line
    /// partition. Attachments must already refer to final positions.
    pub fn renumber(&mut self) {
        self.line_starts.clear();
        self.line_starts.push(0);
        let mut line = 0;
        let mut offset = 0;
        for (index, token) in self.tokens.iter_mut().enumerate() {
            token.index = index;
            token.line = line;
            token.offset = offset;
            offset += token.char_len();
            if token.is_line_break() {
                line += 1;
                self.line_starts.push(index + 1);
            }
        }
    }

    /// Check the structural invariants: contiguous indices from the first
    /// token, contiguous offsets, and line partitioning at line breaks.
    pub fn validate(&self) -> bool {
        let Some(first) = self.tokens.first() else {
            return self.line_starts == [0];
        };
        let mut expected_offset = first.offset;
        let mut line = first.line;
        let mut starts = vec![0];
        for (pos, token) in self.tokens.iter().enumerate() {
            if token.index != first.index + pos
                || token.offset != expected_offset
                || token.line != line
            {
                return false;
            }
            expected_offset += token.char_len();
            if token.is_line_break() {
                line += 1;
                starts.push(pos + 1);
            }
        }
        starts == self.line_starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{TokenFlags, TokenKind, TokenMeta};

    fn word(data: &str) -> Token {
        Token::new(data, None)
    }

    fn line_break() -> Token {
        Token::new("\n", None).with_flags(TokenFlags::LINE_BREAK | TokenFlags::WORD_BOUNDARY)
    }

    fn sample() -> TokenStream {
        TokenStream::from_tokens(vec![
            word("a"),
            word(" "),
            word("b"),
            line_break(),
            word("c"),
            line_break(),
        ])
    }

    #[test]
    fn empty_stream_has_one_line() {
        let stream = TokenStream::new();
        assert_eq!(stream.line_count(), 1);
        assert_eq!(stream.line(0), Some(&[][..]));
        assert!(stream.validate());
    }

    #[test]
    fn lines_partition_at_line_breaks() {
        let stream = sample();
        assert_eq!(stream.line_count(), 3);
        assert_eq!(stream.line(0).unwrap().len(), 4);
        assert_eq!(stream.line(1).unwrap()[0].data, "c");
        assert!(stream.line(2).unwrap().is_empty());
        assert!(stream.line(3).is_none());
        assert_eq!(stream.text(), "a b\nc\n");
        assert!(stream.validate());
    }

    #[test]
    fn offsets_and_indices_are_sequential() {
        let stream = sample();
        let offsets: Vec<_> = stream.tokens().iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(stream.get(TokenId(4)).unwrap().data, "c");
        assert!(stream.get(TokenId(40)).is_none());
    }

    #[test]
    fn iterate_tokens_stops_at_first_result() {
        let stream = sample();
        let found = stream.iterate_tokens(0, None, |t| (t.data == "b").then_some(t.index));
        assert_eq!(found, Some(2));
        let last_word =
            stream.iterate_tokens_reversed(0, Some(1), |t| t.is_word().then(|| t.data.clone()));
        assert_eq!(last_word.as_deref(), Some("b"));
        assert_eq!(stream.iterate_tokens(5, None, |_| Some(())), None);
    }

    #[test]
    fn concat_continues_last_line_and_rebases_attachments() {
        let mut left = TokenStream::from_tokens(vec![word("x"), line_break(), word("y")]);
        let mut right_tokens = vec![word("z"), word("w")];
        right_tokens[1].kind = Some(TokenKind::TypeDef);
        right_tokens[1].meta = Some(Box::new(TokenMeta {
            parents: Some(vec![TokenId(0)]),
            ..TokenMeta::default()
        }));
        let right = TokenStream::from_tokens(right_tokens);

        left.concat(right);
        assert_eq!(left.line_count(), 2);
        assert_eq!(left.text(), "x\nyzw");
        let w = left.get(TokenId(4)).unwrap();
        assert_eq!(w.parents(), &[TokenId(3)]);
        assert!(left.validate());
    }
}
