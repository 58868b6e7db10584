#![forbid(unsafe_code)]

//! Token model.
//!
//! A [`Token`] is one lexical unit, or one joined run of word-boundary or
//! whitespace characters. Tokens never borrow each other: semantic
//! attachments (parents, parameters, templates, ...) refer to other tokens by
//! [`TokenId`], which is the referenced token's `index` inside its
//! [`TokenStream`](crate::TokenStream).

use std::fmt;

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Token kinds
// ---------------------------------------------------------------------------

/// Semantic tag of a token.
///
/// Plain code runs carry no kind (`Option::None` on [`Token::kind`]); they are
/// still meaningful to consumers and may be retagged by a later pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TokenKind {
    Keyword,
    Operator,
    Numeric,
    String,
    Comment,
    CommentKeyword,
    CommentCodeblock,
    Preprocessor,
    Type,
    TypeDef,
    Parameter,
    Line,

    // Markup
    Codeblock,
    Heading,
    Bold,
    Italic,
    Link,
}

impl TokenKind {
    /// The snake_case name used by renderers (`"type_def"`, `"comment_keyword"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Operator => "operator",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Comment => "comment",
            Self::CommentKeyword => "comment_keyword",
            Self::CommentCodeblock => "comment_codeblock",
            Self::Preprocessor => "preprocessor",
            Self::Type => "type",
            Self::TypeDef => "type_def",
            Self::Parameter => "parameter",
            Self::Line => "line",
            Self::Codeblock => "codeblock",
            Self::Heading => "heading",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Link => "link",
        }
    }

    /// Whether this kind is a comment variant.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            Self::Comment | Self::CommentKeyword | Self::CommentCodeblock
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Lexical context and role flags of a token.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TokenFlags: u16 {
        const WORD_BOUNDARY         = 1 << 0;
        const WHITESPACE            = 1 << 1;
        const LINE_BREAK            = 1 << 2;
        const COMMENT               = 1 << 3;
        const STR                   = 1 << 4;
        const REGEX                 = 1 << 5;
        const PREPROCESSOR          = 1 << 6;
        const TEMPLATE              = 1 << 7;
        const DECORATOR             = 1 << 8;
        const DUPLICATE             = 1 << 9;
        const NAMESPACE             = 1 << 10;
        const ASSIGNMENT_PARAMETERS = 1 << 11;
    }
}

// ---------------------------------------------------------------------------
// Token references and attachments
// ---------------------------------------------------------------------------

/// Reference to a token by its stream-wide `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenId(pub usize);

impl TokenId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One entry of a parameter or template parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    /// Declared name, if one could be recovered.
    pub name: Option<String>,
    /// Position in the list, starting at zero.
    pub index: usize,
    /// Declared type tokens (`int`, `const std::string &`, `: int` annotations).
    pub ty: Vec<TokenId>,
    /// Default value tokens, after the top-level `=`.
    pub value: Vec<TokenId>,
}

/// Template parameters share the parameter record shape.
pub type TemplateParam = Param;

/// One inheritance entry of a class-like type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inherited {
    /// Access specifier or inheritance keyword (`public`, `extends`, ...).
    /// Empty when the source names none.
    pub access: String,
    pub token: TokenId,
}

/// Semantic attachments, only ever populated on a handful of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenMeta {
    /// Enclosing scope chain, outer to inner. `None` until assigned.
    pub parents: Option<Vec<TokenId>>,
    /// `None` for tokens that never had a parameter list.
    pub parameters: Option<Vec<Param>>,
    pub parameter_tokens: Vec<TokenId>,
    pub ty: Vec<TokenId>,
    pub templates: Vec<TemplateParam>,
    pub template_tokens: Vec<TokenId>,
    pub requires_tokens: Vec<TokenId>,
    pub pre_modifiers: Vec<TokenId>,
    pub post_modifiers: Vec<TokenId>,
    pub inherited: Vec<Inherited>,
    pub overloaded_operators: Vec<TokenId>,
    pub custom_decorators: Vec<String>,
}

impl TokenMeta {
    /// Rewrite every token reference through `map`. References for which
    /// `map` returns `None` are dropped.
    pub fn remap(&mut self, map: &mut dyn FnMut(TokenId) -> Option<TokenId>) {
        fn ids(list: &mut Vec<TokenId>, map: &mut dyn FnMut(TokenId) -> Option<TokenId>) {
            *list = list.iter().filter_map(|id| map(*id)).collect();
        }
        fn params(list: &mut [Param], map: &mut dyn FnMut(TokenId) -> Option<TokenId>) {
            for param in list {
                ids(&mut param.ty, map);
                ids(&mut param.value, map);
            }
        }

        if let Some(parents) = self.parents.as_mut() {
            ids(parents, map);
        }
        if let Some(parameters) = self.parameters.as_mut() {
            params(parameters, map);
        }
        params(&mut self.templates, map);
        ids(&mut self.parameter_tokens, map);
        ids(&mut self.ty, map);
        ids(&mut self.template_tokens, map);
        ids(&mut self.requires_tokens, map);
        ids(&mut self.pre_modifiers, map);
        ids(&mut self.post_modifiers, map);
        ids(&mut self.overloaded_operators, map);
        self.inherited = self
            .inherited
            .drain(..)
            .filter_map(|entry| {
                map(entry.token).map(|token| Inherited {
                    access: entry.access,
                    token,
                })
            })
            .collect();
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A lexical unit with its position and annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// Literal source text.
    pub data: String,
    pub kind: Option<TokenKind>,
    /// Stream-wide position, contiguous from zero.
    pub index: usize,
    /// Zero-based source line.
    pub line: usize,
    /// Character offset from the start of the tokenized text.
    pub offset: usize,
    /// Curly-brace depth at this token. A `{` and its matching `}` share it.
    pub nesting: u32,
    pub flags: TokenFlags,
    pub meta: Option<Box<TokenMeta>>,
}

impl Token {
    /// Create an unpositioned token. The engine assigns index, line and offset.
    pub fn new(data: impl Into<String>, kind: Option<TokenKind>) -> Self {
        Self {
            data: data.into(),
            kind,
            index: 0,
            line: 0,
            offset: 0,
            nesting: 0,
            flags: TokenFlags::empty(),
            meta: None,
        }
    }

    /// Builder-style flag setter.
    #[must_use]
    pub fn with_flags(mut self, flags: TokenFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn id(&self) -> TokenId {
        TokenId(self.index)
    }

    /// Length of `data` in characters.
    pub fn char_len(&self) -> usize {
        self.data.chars().count()
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == Some(kind)
    }

    #[inline]
    pub fn has(&self, flags: TokenFlags) -> bool {
        self.flags.contains(flags)
    }

    #[inline]
    pub fn is_word_boundary(&self) -> bool {
        self.flags.contains(TokenFlags::WORD_BOUNDARY)
    }

    #[inline]
    pub fn is_whitespace(&self) -> bool {
        self.flags.contains(TokenFlags::WHITESPACE)
    }

    #[inline]
    pub fn is_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::LINE_BREAK)
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.flags.contains(TokenFlags::COMMENT)
    }

    #[inline]
    pub fn is_str(&self) -> bool {
        self.flags.contains(TokenFlags::STR)
    }

    /// Whitespace or a line break.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.flags
            .intersects(TokenFlags::WHITESPACE | TokenFlags::LINE_BREAK)
    }

    /// An identifier-like run: not a boundary, string, comment or preprocessor
    /// token.
    pub fn is_word(&self) -> bool {
        !self.flags.intersects(
            TokenFlags::WORD_BOUNDARY
                | TokenFlags::STR
                | TokenFlags::COMMENT
                | TokenFlags::PREPROCESSOR
                | TokenFlags::REGEX,
        ) && !self.data.is_empty()
    }

    /// Attachments, if any were recorded.
    pub fn meta(&self) -> Option<&TokenMeta> {
        self.meta.as_deref()
    }

    /// Attachments, created on first access.
    pub fn meta_mut(&mut self) -> &mut TokenMeta {
        self.meta.get_or_insert_with(Box::default)
    }

    /// Parent chain, empty when unassigned.
    pub fn parents(&self) -> &[TokenId] {
        self.meta()
            .and_then(|meta| meta.parents.as_deref())
            .unwrap_or(&[])
    }

    /// Parameter list, if this token ever received one.
    pub fn parameters(&self) -> Option<&[Param]> {
        self.meta().and_then(|meta| meta.parameters.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(TokenKind::TypeDef.as_str(), "type_def");
        assert_eq!(TokenKind::CommentKeyword.to_string(), "comment_keyword");
        assert_eq!(TokenKind::Numeric.as_str(), "numeric");
    }

    #[test]
    fn comment_predicate() {
        assert!(TokenKind::Comment.is_comment());
        assert!(TokenKind::CommentCodeblock.is_comment());
        assert!(!TokenKind::String.is_comment());
    }

    #[test]
    fn word_predicate_excludes_boundaries_and_strings() {
        let word = Token::new("foo", None);
        assert!(word.is_word());

        let boundary = Token::new("(", None).with_flags(TokenFlags::WORD_BOUNDARY);
        assert!(!boundary.is_word());

        let string = Token::new("\"x\"", Some(TokenKind::String)).with_flags(TokenFlags::STR);
        assert!(!string.is_word());
    }

    #[test]
    fn meta_is_created_lazily() {
        let mut token = Token::new("foo", Some(TokenKind::TypeDef));
        assert!(token.meta().is_none());
        assert!(token.parents().is_empty());
        token.meta_mut().parents = Some(vec![TokenId(3)]);
        assert_eq!(token.parents(), &[TokenId(3)]);
    }

    #[test]
    fn remap_rewrites_and_drops_references() {
        let mut meta = TokenMeta {
            parents: Some(vec![TokenId(1), TokenId(5)]),
            parameters: Some(vec![Param {
                name: Some("a".into()),
                index: 0,
                ty: vec![TokenId(7)],
                value: vec![TokenId(9)],
            }]),
            inherited: vec![Inherited {
                access: "public".into(),
                token: TokenId(5),
            }],
            ..TokenMeta::default()
        };
        meta.remap(&mut |id| (id.0 != 9).then_some(TokenId(id.0 + 10)));
        assert_eq!(meta.parents, Some(vec![TokenId(11), TokenId(15)]));
        let param = &meta.parameters.as_ref().unwrap()[0];
        assert_eq!(param.ty, vec![TokenId(17)]);
        assert!(param.value.is_empty());
        assert_eq!(meta.inherited[0].token, TokenId(15));
    }
}
