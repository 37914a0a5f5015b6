//! Text manipulation utilities for PL/SQL source.
//!
//! Every masking function here preserves byte offsets and line structure:
//! masked characters are replaced by as many spaces as their UTF-8 width and
//! newlines are always kept. Offsets found in a masked copy can therefore be
//! used to slice the original text, and line numbers never drift.

/// What to blank out when masking source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask {
    pub comments: bool,
    pub strings: bool,
}

impl Mask {
    pub const COMMENTS: Mask = Mask {
        comments: true,
        strings: false,
    };
    pub const COMMENTS_AND_STRINGS: Mask = Mask {
        comments: true,
        strings: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    Literal,
}

fn push_masked(out: &mut String, c: char, masked: bool) {
    if c == '\n' {
        out.push('\n');
    } else if masked {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    } else {
        out.push(c);
    }
}

/// Blank `--` / `/* */` comments and/or the contents of `'...'` literals.
///
/// Quote characters themselves are kept so `= 'Y'` still reads as a
/// comparison against a literal. Doubled quotes inside a literal are treated
/// as an escaped quote.
pub fn mask_source(text: &str, mask: Mask) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = ScanState::Code;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScanState::Code => match (c, chars.peek().copied()) {
                ('-', Some('-')) => {
                    chars.next();
                    push_masked(&mut out, '-', mask.comments);
                    push_masked(&mut out, '-', mask.comments);
                    state = ScanState::LineComment;
                }
                ('/', Some('*')) => {
                    chars.next();
                    push_masked(&mut out, '/', mask.comments);
                    push_masked(&mut out, '*', mask.comments);
                    state = ScanState::BlockComment;
                }
                ('\'', _) => {
                    out.push('\'');
                    state = ScanState::Literal;
                }
                _ => out.push(c),
            },
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
                push_masked(&mut out, c, mask.comments);
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    push_masked(&mut out, '*', mask.comments);
                    push_masked(&mut out, '/', mask.comments);
                    state = ScanState::Code;
                } else {
                    push_masked(&mut out, c, mask.comments);
                }
            }
            ScanState::Literal => {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        push_masked(&mut out, '\'', mask.strings);
                        push_masked(&mut out, '\'', mask.strings);
                    } else {
                        out.push('\'');
                        state = ScanState::Code;
                    }
                } else {
                    push_masked(&mut out, c, mask.strings);
                }
            }
        }
    }

    out
}

/// Comments removed, literals kept, ASCII-uppercased.
pub fn strip_comments(text: &str) -> String {
    mask_source(text, Mask::COMMENTS).to_ascii_uppercase()
}

/// Comments and literal contents removed, ASCII-uppercased.
///
/// This is the form keyword scanners should match against.
pub fn code_only(text: &str) -> String {
    mask_source(text, Mask::COMMENTS_AND_STRINGS).to_ascii_uppercase()
}

/// True for characters that can continue a PL/SQL identifier.
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#')
}

/// Find `needle` in `haystack` as a whole keyword (not part of a longer
/// identifier). Both sides are expected to be uppercase already.
pub fn contains_keyword(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Leading whitespace of a line.
pub fn indentation(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    first_line: usize,
}

impl LineIndex {
    /// `first_line` is the line number of the first line of `text`.
    pub fn new(text: &str, first_line: usize) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts, first_line }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset) - 1 + self.first_line
    }
}
