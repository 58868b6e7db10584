#![forbid(unsafe_code)]

//! Character classifier.
//!
//! The scanner walks characters left to right and reports, for each one,
//! whether it lies inside a string, a comment, a regex literal or a
//! preprocessor line. Opening and closing delimiters belong to their region.
//! It knows nothing about tokens; the engine consumes its classifications.
//!
//! Region precedence at a plain-code character: preprocessor (a `#` that is
//! the first non-whitespace character of its line), string, comment, regex.

use std::ops::Range;

use smallvec::SmallVec;

use crate::language::{LanguageConfig, is_blank};

/// Classification of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharClass {
    pub ch: char,
    pub in_string: bool,
    pub in_single_line_comment: bool,
    pub in_multi_line_comment: bool,
    pub in_regex: bool,
    /// Preceded by an odd number of backslashes.
    pub is_escaped: bool,
    pub in_preprocessor: bool,
    /// This character opens a new region.
    pub starts_region: bool,
}

impl CharClass {
    #[inline]
    pub fn in_comment(&self) -> bool {
        self.in_single_line_comment || self.in_multi_line_comment
    }

    /// Plain code: outside every region.
    #[inline]
    pub fn is_code(&self) -> bool {
        !(self.in_string || self.in_comment() || self.in_regex || self.in_preprocessor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Str { quote: char, triple: bool, start: usize },
    LineComment,
    BlockComment { start: usize },
    Regex { start: usize },
    Preprocessor,
}

/// Incremental classifier state.
#[derive(Debug, Clone)]
pub struct Scanner {
    region: Region,
    /// Index of the last character of a closing delimiter.
    exit_after: Option<usize>,
    /// Open `${` interpolations, each with its inner curly depth.
    interpolations: SmallVec<[u32; 4]>,
    interpolation_pending: bool,
    /// Index of the `}` that closed an interpolation; the template string
    /// resumes right after it.
    resume_template: Option<usize>,
    line_has_code: bool,
    prev_char: Option<char>,
    /// Length of the backslash run ending right before `run_end`.
    backslashes: usize,
    run_end: usize,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `chars[i]` is preceded by an odd number of backslashes.
pub fn is_escaped(chars: &[char], i: usize) -> bool {
    backslash_run(chars, i) % 2 == 1
}

fn backslash_run(chars: &[char], i: usize) -> usize {
    chars[..i].iter().rev().take_while(|ch| **ch == '\\').count()
}

fn starts_with(chars: &[char], i: usize, pattern: &str) -> bool {
    let mut j = i;
    for ch in pattern.chars() {
        if chars.get(j) != Some(&ch) {
            return false;
        }
        j += 1;
    }
    !pattern.is_empty()
}

fn ends_with(chars: &[char], i: usize, pattern: &str, min_start: usize) -> bool {
    let len = pattern.chars().count();
    if len == 0 || i + 1 < len || i + 1 - len < min_start {
        return false;
    }
    starts_with(chars, i + 1 - len, pattern)
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            region: Region::Code,
            exit_after: None,
            interpolations: SmallVec::new(),
            interpolation_pending: false,
            resume_template: None,
            line_has_code: false,
            prev_char: None,
            backslashes: 0,
            run_end: 0,
        }
    }

    /// Forget every region, as at the start of a text.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Restart classification at `index` as plain code, recovering the
    /// line-start and previous-character context from the text.
    pub fn reset_at(&mut self, chars: &[char], index: usize) {
        self.reset();
        let before = &chars[..index.min(chars.len())];
        self.line_has_code = before
            .iter()
            .rev()
            .take_while(|ch| **ch != '\n')
            .any(|ch| !is_blank(*ch));
        self.prev_char = before
            .iter()
            .rev()
            .find(|ch| **ch == '\n' || !is_blank(**ch))
            .copied();
        self.run_end = before.len();
        self.backslashes = backslash_run(chars, self.run_end);
    }

    /// Whether the scanner is in plain code with no pending template state.
    pub fn is_idle(&self) -> bool {
        self.region == Region::Code
            && self.exit_after.is_none()
            && self.interpolations.is_empty()
            && !self.interpolation_pending
            && self.resume_template.is_none()
    }

    /// Classify `chars[i]`. Characters must be fed in order.
    pub fn step(&mut self, config: &LanguageConfig, chars: &[char], i: usize) -> CharClass {
        let ch = chars[i];
        if i != self.run_end {
            self.backslashes = backslash_run(chars, i);
        }
        let escaped = self.backslashes % 2 == 1;
        self.backslashes = if ch == '\\' { self.backslashes + 1 } else { 0 };
        self.run_end = i + 1;
        let mut starts_region = false;

        if self.exit_after.is_some_and(|end| i > end) {
            self.exit_after = None;
            self.region = Region::Code;
        }
        if let Some(brace) = self.resume_template.take() {
            self.region = Region::Str {
                quote: '`',
                triple: false,
                start: brace,
            };
        }

        match self.region {
            Region::Code => match self.region_start(config, chars, i, escaped) {
                Some(region) => {
                    self.region = region;
                    starts_region = true;
                }
                None => self.track_interpolation(ch, i),
            },
            Region::Str {
                quote,
                triple,
                start,
            } if self.exit_after.is_none() => {
                if ch == '\n' && !escaped && !triple && quote != '`' {
                    self.region = Region::Code;
                } else if quote == '`'
                    && config.allow_template_strings
                    && ch == '$'
                    && !escaped
                    && chars.get(i + 1) == Some(&'{')
                {
                    self.region = Region::Code;
                    self.interpolation_pending = true;
                } else if ch == quote && !escaped {
                    if !triple && i > start {
                        self.exit_after = Some(i);
                    } else if triple && i >= start + 3 && starts_with(chars, i, &quote.to_string().repeat(3))
                    {
                        self.exit_after = Some(i + 2);
                    }
                }
            }
            Region::Str { .. } => {}
            Region::LineComment | Region::Preprocessor => {
                if ch == '\n' && !escaped {
                    self.region = Region::Code;
                }
            }
            Region::BlockComment { start } => {
                let min_start = start + config.multi_line_comment_start.chars().count();
                if self.exit_after.is_none()
                    && ends_with(chars, i, config.multi_line_comment_end, min_start)
                {
                    self.exit_after = Some(i);
                }
            }
            Region::Regex { start } => {
                if ch == '\n' {
                    self.region = Region::Code;
                } else if self.exit_after.is_none() && ch == '/' && !escaped && i > start {
                    self.exit_after = Some(i);
                }
            }
        }

        if ch == '\n' {
            self.line_has_code = false;
        } else if !is_blank(ch) {
            self.line_has_code = true;
        }
        if ch == '\n' || !is_blank(ch) {
            self.prev_char = Some(ch);
        }

        CharClass {
            ch,
            in_string: matches!(self.region, Region::Str { .. }),
            in_single_line_comment: self.region == Region::LineComment,
            in_multi_line_comment: matches!(self.region, Region::BlockComment { .. }),
            in_regex: matches!(self.region, Region::Regex { .. }),
            is_escaped: escaped,
            in_preprocessor: self.region == Region::Preprocessor,
            starts_region,
        }
    }

    fn region_start(
        &self,
        config: &LanguageConfig,
        chars: &[char],
        i: usize,
        escaped: bool,
    ) -> Option<Region> {
        let ch = chars[i];
        if config.allow_preprocessors && ch == '#' && !self.line_has_code {
            return Some(Region::Preprocessor);
        }
        if config.allow_strings && !escaped && matches!(ch, '"' | '\'' | '`') {
            let triple = config.allow_triple_quotes
                && ch != '`'
                && chars.get(i + 1) == Some(&ch)
                && chars.get(i + 2) == Some(&ch);
            return Some(Region::Str {
                quote: ch,
                triple,
                start: i,
            });
        }
        if starts_with(chars, i, config.single_line_comment_start) {
            return Some(Region::LineComment);
        }
        if starts_with(chars, i, config.multi_line_comment_start) {
            return Some(Region::BlockComment { start: i });
        }
        if config.allow_slash_regexes
            && ch == '/'
            && !escaped
            && !matches!(chars.get(i + 1), Some('/' | '*'))
            && self.regex_may_follow(config)
        {
            return Some(Region::Regex { start: i });
        }
        None
    }

    fn regex_may_follow(&self, config: &LanguageConfig) -> bool {
        match self.prev_char {
            None => true,
            Some(prev) => {
                matches!(prev, '\n' | ',' | '(' | '[' | '{' | ':' | ';')
                    || config
                        .operators
                        .iter()
                        .any(|op| op.ends_with(prev) && !op.chars().all(char::is_alphanumeric))
            }
        }
    }

    fn track_interpolation(&mut self, ch: char, i: usize) {
        if self.interpolation_pending {
            if ch == '{' {
                self.interpolation_pending = false;
                self.interpolations.push(0);
            }
            return;
        }
        match ch {
            '{' => {
                if let Some(depth) = self.interpolations.last_mut() {
                    *depth += 1;
                }
            }
            '}' => match self.interpolations.last_mut() {
                Some(0) => {
                    self.interpolations.pop();
                    self.resume_template = Some(i);
                }
                Some(depth) => *depth -= 1,
                None => {}
            },
            _ => {}
        }
    }
}

/// Classify `chars[range]` and hand every character to `visitor`, stopping at
/// the first `Some` it returns.
///
/// A range starting mid-text is classified as if it started in plain code.
pub fn iterate_code<R>(
    chars: &[char],
    range: Range<usize>,
    config: &LanguageConfig,
    mut visitor: impl FnMut(&CharClass) -> Option<R>,
) -> Option<R> {
    let mut scanner = Scanner::new();
    let end = range.end.min(chars.len());
    if range.start > 0 {
        scanner.reset_at(chars, range.start);
    }
    for i in range.start..end {
        let class = scanner.step(config, chars, i);
        if let Some(result) = visitor(&class) {
            return Some(result);
        }
    }
    None
}
