//! Text buffer with position conversion.
//!
//! Keeps a document's bytes together with a line-start index so that byte
//! offsets and LSP positions (line + UTF-16 column) can be converted in both
//! directions, and applies incremental edits addressed by LSP ranges.

use thiserror::Error;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};

/// Failure converting between offsets and positions, or applying an edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("offset {offset} is out of range [0, {len}]")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("position {}:{} is out of range", .0.line, .0.character)]
    OutOfRange(Position),

    #[error("range end {}:{} precedes start {}:{}", .end.line, .end.character, .start.line, .start.character)]
    InvertedRange { start: Position, end: Position },

    #[error("invalid UTF-8 encoding at byte {0}")]
    InvalidEncoding(usize),

    #[error("position {}:{} does not point to a valid UTF-16 code unit", .0.line, .0.character)]
    MisalignedSurrogate(Position),
}

/// Document content plus a pre-computed line index.
///
/// LSP positions use line/column where column is in UTF-16 code units.
/// The index is rebuilt wholesale whenever the content changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    bytes: Vec<u8>,
    /// Byte offset where each line starts. Always begins with 0.
    line_starts: Vec<usize>,
}

impl TextBuffer {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        let mut buffer = Self::default();
        buffer.reset(content);
        buffer
    }

    /// Raw document content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of entries in the line index (newline count + 1).
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Replace the content and rebuild the line index.
    pub fn reset(&mut self, content: impl Into<Vec<u8>>) {
        self.bytes = content.into();

        let newlines = self.bytes.iter().filter(|&&b| b == b'\n').count();
        let mut line_starts = Vec::with_capacity(newlines + 1);
        line_starts.push(0);
        for (i, &b) in self.bytes.iter().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        self.line_starts = line_starts;
    }

    /// Convert a byte offset to an LSP position.
    pub fn position_of(&self, offset: usize) -> Result<Position, BufferError> {
        if offset > self.bytes.len() {
            return Err(BufferError::OffsetOutOfRange {
                offset,
                len: self.bytes.len(),
            });
        }

        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line - 1,
        };

        let character = utf16_len(&self.bytes[self.line_starts[line]..offset]);

        Ok(Position::new(line as u32, character))
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// A position one line past the last line with character 0 addresses the
    /// end of the buffer.
    pub fn offset_of(&self, position: Position) -> Result<usize, BufferError> {
        let line = position.line as usize;

        if line == self.line_starts.len() && position.character == 0 {
            return Ok(self.bytes.len());
        }

        let Some(&line_start) = self.line_starts.get(line) else {
            return Err(BufferError::OutOfRange(position));
        };

        let mut rest = &self.bytes[line_start..];
        let mut units = 0u32;

        while units < position.character {
            let Some(&lead) = rest.first() else {
                return Err(BufferError::OutOfRange(position));
            };

            if lead == b'\n' {
                return Err(BufferError::OutOfRange(position));
            }

            if lead < 0x80 {
                units += 1;
                rest = &rest[1..];
                continue;
            }

            let offset = self.bytes.len() - rest.len();
            let width = utf8_width(lead);
            let ch = rest
                .get(..width)
                .and_then(|seq| std::str::from_utf8(seq).ok())
                .and_then(|seq| seq.chars().next())
                .ok_or(BufferError::InvalidEncoding(offset))?;

            units += ch.len_utf16() as u32;
            if units > position.character {
                return Err(BufferError::MisalignedSurrogate(position));
            }

            rest = &rest[width..];
        }

        Ok(self.bytes.len() - rest.len())
    }

    /// Apply a single content change.
    ///
    /// A change without a range replaces the whole document. On error the
    /// buffer is left untouched.
    pub fn apply_edit(&mut self, edit: &TextDocumentContentChangeEvent) -> Result<(), BufferError> {
        let Some(range) = edit.range else {
            self.reset(edit.text.as_bytes());
            return Ok(());
        };

        let start = self.offset_of(range.start)?;
        let end = self.offset_of(range.end)?;

        if end < start {
            return Err(BufferError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }

        let mut bytes = Vec::with_capacity(self.bytes.len() - (end - start) + edit.text.len());
        bytes.extend_from_slice(&self.bytes[..start]);
        bytes.extend_from_slice(edit.text.as_bytes());
        bytes.extend_from_slice(&self.bytes[end..]);
        self.reset(bytes);

        Ok(())
    }
}

/// Number of UTF-16 code units needed to encode the given UTF-8 bytes.
///
/// Malformed sequences count one unit per invalid byte.
pub fn utf16_len(bytes: &[u8]) -> u32 {
    let mut n = 0u32;

    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            n += if ch.is_ascii() { 1 } else { ch.len_utf16() as u32 };
        }
        n += chunk.invalid().len() as u32;
    }

    n
}

/// Expected length of a UTF-8 sequence from its lead byte; 0 if the byte
/// cannot start a sequence.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tower_lsp::lsp_types::Range;

    fn edit(range: &str, text: &str) -> TextDocumentContentChangeEvent {
        let parse = |p: &str| {
            let (line, character) = p.split_once(':').unwrap();
            Position::new(line.parse().unwrap(), character.parse().unwrap())
        };
        let (start, end) = range.split_once('-').unwrap();
        TextDocumentContentChangeEvent {
            range: Some(Range::new(parse(start), parse(end))),
            range_length: None,
            text: text.to_string(),
        }
    }

    fn apply_steps(initial: &str, steps: &[(&str, &str, &str)]) {
        let mut buffer = TextBuffer::new(initial);
        for (i, (range, text, want)) in steps.iter().enumerate() {
            buffer
                .apply_edit(&edit(range, text))
                .unwrap_or_else(|e| panic!("step {i}: {e}"));
            assert_eq!(
                std::str::from_utf8(buffer.bytes()).unwrap(),
                *want,
                "step {i}"
            );
        }
    }

    #[test]
    fn single_line() {
        let buf = TextBuffer::new("hello world");
        assert_eq!(buf.position_of(0).unwrap(), Position::new(0, 0));
        assert_eq!(buf.position_of(5).unwrap(), Position::new(0, 5));
        assert_eq!(buf.position_of(11).unwrap(), Position::new(0, 11));
    }

    #[test]
    fn multi_line() {
        let buf = TextBuffer::new("hello\nworld\ntest");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.position_of(5).unwrap(), Position::new(0, 5));
        assert_eq!(buf.position_of(6).unwrap(), Position::new(1, 0));
        assert_eq!(buf.position_of(11).unwrap(), Position::new(1, 5));
        assert_eq!(buf.position_of(12).unwrap(), Position::new(2, 0));
    }

    #[test]
    fn offset_of_multi_line() {
        let buf = TextBuffer::new("hello\nworld");
        assert_eq!(buf.offset_of(Position::new(0, 0)), Ok(0));
        assert_eq!(buf.offset_of(Position::new(0, 5)), Ok(5));
        assert_eq!(buf.offset_of(Position::new(1, 0)), Ok(6));
        assert_eq!(buf.offset_of(Position::new(1, 5)), Ok(11));
    }

    #[test]
    fn utf16_handling() {
        // '😀' is 4 bytes in UTF-8 but 2 code units in UTF-16
        let buf = TextBuffer::new("a😀b");
        assert_eq!(buf.position_of(1).unwrap(), Position::new(0, 1));
        assert_eq!(buf.position_of(5).unwrap(), Position::new(0, 3));
        assert_eq!(buf.offset_of(Position::new(0, 3)), Ok(5));
    }

    #[test]
    fn bmp_multibyte_counts_one_unit() {
        let buf = TextBuffer::new("é:x");
        assert_eq!(buf.offset_of(Position::new(0, 1)), Ok(2));
        assert_eq!(buf.position_of(3).unwrap(), Position::new(0, 2));
    }

    #[test]
    fn split_surrogate_pair_is_rejected() {
        let buf = TextBuffer::new("a😀b");
        assert_eq!(
            buf.offset_of(Position::new(0, 2)),
            Err(BufferError::MisalignedSurrogate(Position::new(0, 2)))
        );
    }

    #[test]
    fn invalid_encoding_is_rejected() {
        let buf = TextBuffer::new(vec![b'a', 0xFF, b'b']);
        assert_eq!(
            buf.offset_of(Position::new(0, 2)),
            Err(BufferError::InvalidEncoding(1))
        );
        assert_eq!(utf16_len(buf.bytes()), 3);
    }

    #[test]
    fn out_of_bounds() {
        let buf = TextBuffer::new("hello\nab");
        assert_eq!(
            buf.offset_of(Position::new(5, 0)),
            Err(BufferError::OutOfRange(Position::new(5, 0)))
        );
        // Past the newline of line 0.
        assert_eq!(
            buf.offset_of(Position::new(0, 6)),
            Err(BufferError::OutOfRange(Position::new(0, 6)))
        );
        // Past the end of the last line.
        assert_eq!(
            buf.offset_of(Position::new(1, 3)),
            Err(BufferError::OutOfRange(Position::new(1, 3)))
        );
        assert!(matches!(
            buf.position_of(9),
            Err(BufferError::OffsetOutOfRange { offset: 9, len: 8 })
        ));
    }

    #[test]
    fn one_past_last_line_addresses_end_of_buffer() {
        let buf = TextBuffer::new("ab");
        assert_eq!(buf.offset_of(Position::new(1, 0)), Ok(2));
        assert_eq!(
            buf.offset_of(Position::new(1, 1)),
            Err(BufferError::OutOfRange(Position::new(1, 1)))
        );
    }

    #[test]
    fn hand_type_from_empty() {
        apply_steps(
            "\n",
            &[
                ("0:0-0:0", "a", "a\n"),
                ("0:1-0:1", "b", "ab\n"),
                ("0:2-0:2", "\n", "ab\n\n"),
                ("1:0-1:0", "c", "ab\nc\n"),
                ("1:1-1:1", "d", "ab\ncd\n"),
            ],
        );
    }

    #[test]
    fn hand_delete_from_end() {
        apply_steps(
            "ab\ncd\n",
            &[
                ("1:1-1:2", "", "ab\nc\n"),
                ("1:0-1:1", "", "ab\n\n"),
                ("0:2-0:2", "", "ab\n\n"),
                ("1:0-2:0", "", "ab\n"),
                ("0:1-0:2", "", "a\n"),
                ("0:0-0:1", "", "\n"),
            ],
        );
    }

    #[test]
    fn insert_lines_then_update_each() {
        apply_steps(
            "ab\ncd\n",
            &[
                ("0:2-0:2", "\n12\n34", "ab\n12\n34\ncd\n"),
                ("3:1-3:2", "x", "ab\n12\n34\ncx\n"),
                ("2:1-2:2", "y", "ab\n12\n3y\ncx\n"),
                ("1:1-1:2", "z", "ab\n1z\n3y\ncx\n"),
            ],
        );
    }

    #[test]
    fn replace_across_lines() {
        apply_steps(
            "line1\nline2\nline3\nline4\n",
            &[
                ("1:2-3:4", "new\ntext\n", "line1\nlinew\ntext\n4\n"),
                ("3:1-3:1", "x", "line1\nlinew\ntext\n4x\n"),
            ],
        );
    }

    #[test]
    fn insert_at_end_of_file() {
        apply_steps(
            "line1\nline2",
            &[("2:0-2:0", "\nend", "line1\nline2\nend")],
        );
        apply_steps("", &[("0:0-0:0", "\n\n", "\n\n")]);
        apply_steps("a\n", &[("0:0-1:0", "", "")]);
    }

    #[test]
    fn full_replacement() {
        let mut buf = TextBuffer::new("old\ntext");
        buf.apply_edit(&TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        })
        .unwrap();
        assert_eq!(buf, TextBuffer::new("new"));
        assert_eq!(buf.line_count(), 1);
    }

    #[test]
    fn failed_edit_leaves_buffer_untouched() {
        let mut buf = TextBuffer::new("ab\ncd");
        let before = buf.clone();
        assert!(buf.apply_edit(&edit("0:1-7:0", "x")).is_err());
        assert!(matches!(
            buf.apply_edit(&edit("1:1-0:1", "x")),
            Err(BufferError::InvertedRange { .. })
        ));
        assert_eq!(buf, before);
    }

    #[test]
    fn noop_edit_keeps_bytes() {
        let text = "a: 1\n  b: \"😀\"\n";
        let mut buf = TextBuffer::new(text);
        let end = buf.position_of(text.len()).unwrap();
        buf.apply_edit(&TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(0, 0), end)),
            range_length: None,
            text: text.to_string(),
        })
        .unwrap();
        assert_eq!(buf.bytes(), text.as_bytes());
    }

    proptest! {
        #[test]
        fn offset_position_round_trip(text in "[a-z: \n\"é😀]{0,40}") {
            let buf = TextBuffer::new(text.as_str());
            for offset in (0..=text.len()).filter(|&o| text.is_char_boundary(o)) {
                let position = buf.position_of(offset).unwrap();
                prop_assert_eq!(buf.offset_of(position), Ok(offset));
            }
        }
    }
}
