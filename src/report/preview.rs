//! Windowed source previews.
//!
//! Given a file and the character span an issue covers, yield the issue
//! lines plus a few surrounding context lines, each with the exact sub-range
//! to highlight. Files using `\n`, `\r`, or `\r\n` line endings produce
//! identical previews.
//!
//! Offsets and lengths are measured in characters, never bytes: the span the
//! server reports counts characters within a line, and terminators count
//! toward the running position between issue lines.

use std::fs;
use std::iter::Peekable;
use std::path::Path;

use encoding_rs::Encoding;

use super::{RenderError, Result};

/// Context lines shown on each side of an issue by default.
pub const DEFAULT_CONTEXT_LINES: usize = 1;

/// Character span of an issue: 1-based lines, 0-based character offsets
/// within the start and end lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// One rendered preview line. `highlight` bounds are character offsets into
/// `text`, present only on issue lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePreview {
    pub number: usize,
    pub text: String,
    pub highlight: Option<(usize, usize)>,
}

impl LinePreview {
    pub fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }
}

/// Lazily yields the preview lines for one issue range.
///
/// One shot: a single pass over the decoded file, stopping as soon as the
/// window is exhausted. A range starting past the end of the file yields
/// nothing rather than failing.
#[derive(Debug)]
pub struct FilePreview {
    chars: Peekable<std::vec::IntoIter<char>>,
    range: Range,
    context: usize,
    line_number: usize,
    /// Running character position for highlight bookkeeping, seeded with the
    /// range's start offset at the first issue line.
    cursor: Option<usize>,
    finished: bool,
}

impl FilePreview {
    /// Opens `path` and decodes it with `encoding`, strictly: bytes invalid
    /// in the encoding are an error, not replacement characters.
    pub fn open(
        path: &Path,
        encoding: &'static Encoding,
        range: Range,
        context: usize,
    ) -> Result<Self> {
        let bytes = fs::read(path)?;
        let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&bytes)
        else {
            return Err(RenderError::Decode {
                path: path.display().to_string(),
                encoding: encoding.name(),
            });
        };

        Ok(Self {
            chars: text.chars().collect::<Vec<_>>().into_iter().peekable(),
            range,
            context,
            line_number: 1,
            cursor: None,
            finished: false,
        })
    }

    /// Reads the next logical line: its text without the terminator, plus
    /// the number of characters the terminator consumed (0 on the final
    /// line). A file has one more logical line than terminators, so a
    /// trailing terminator yields a final empty line.
    fn read_line(&mut self) -> Option<(String, usize)> {
        if self.finished {
            return None;
        }

        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('\n') => return Some((text, 1)),
                Some('\r') => {
                    let term_len = if self.chars.peek() == Some(&'\n') {
                        self.chars.next();
                        2
                    } else {
                        1
                    };
                    return Some((text, term_len));
                }
                Some(c) => text.push(c),
                None => {
                    self.finished = true;
                    return Some((text, 0));
                }
            }
        }
    }

    /// Computes the highlight bounds for an issue line and advances the
    /// running cursor past it.
    fn issue_line(&mut self, number: usize, text: String, term_len: usize) -> Result<LinePreview> {
        let cursor = *self.cursor.get_or_insert(self.range.start_offset);

        let text_len = text.chars().count();
        let raw_len = text_len + term_len;
        let start = if number == self.range.start_line {
            cursor
        } else {
            0
        };

        // Last issue line iff the range's end falls inside this line's raw
        // span. Phrased additively so a start offset past the line's end
        // cannot underflow; that case is caught by the length checks below.
        let is_last = self.range.end_offset + start < cursor + raw_len;
        let highlighted_len = if is_last {
            self.range
                .end_offset
                .checked_sub(cursor)
                .ok_or(RenderError::OutOfSync)?
        } else {
            text_len.checked_sub(start).ok_or(RenderError::OutOfSync)?
        };

        let end = start + highlighted_len;
        if start > text_len || end > text_len {
            return Err(RenderError::OutOfSync);
        }

        // Between issue lines the stripped terminator still consumes
        // characters of the original span.
        self.cursor = Some(cursor + highlighted_len + if is_last { 0 } else { term_len });

        Ok(LinePreview {
            number,
            text,
            highlight: Some((start, end)),
        })
    }
}

impl Iterator for FilePreview {
    type Item = Result<LinePreview>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.line_number > self.range.end_line.saturating_add(self.context) {
                return None;
            }

            let (text, term_len) = self.read_line()?;
            let number = self.line_number;
            self.line_number += 1;

            let issue = number >= self.range.start_line && number <= self.range.end_line;
            let before =
                number < self.range.start_line && self.range.start_line - number <= self.context;
            let after =
                number > self.range.end_line && number - self.range.end_line <= self.context;

            if issue {
                let result = self.issue_line(number, text, term_len);
                if result.is_err() {
                    self.finished = true;
                }
                return Some(result);
            }
            if before || after {
                return Some(Ok(LinePreview {
                    number,
                    text,
                    highlight: None,
                }));
            }
        }
    }
}
