//! Offset translation between editor lines and [LSP positions][pos].
//!
//! Editor buffers address a line by character (Unicode scalar value) offsets,
//! while the protocol counts columns in code units of the negotiated
//! [`OffsetEncoding`]. Every conversion here works on a single line of text and
//! clamps instead of failing: a protocol response can describe a line that has
//! been edited since the request went out.
//!
//! [pos]: https://microsoft.github.io/language-server-protocol/specifications/lsp/3.17/specification/#position
#![warn(missing_docs)]

use lsp_types::{Position, PositionEncodingKind};
use serde::{Deserialize, Serialize};

/// Offset encoding for LSP positions.
///
/// LSP uses UTF-16 by default, but servers can negotiate different encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OffsetEncoding {
	/// UTF-8 byte offsets.
	#[serde(rename = "utf-8")]
	Utf8,
	/// UTF-16 code unit offsets (LSP default).
	#[default]
	#[serde(rename = "utf-16")]
	Utf16,
	/// UTF-32 / Unicode codepoint offsets.
	#[serde(rename = "utf-32")]
	Utf32,
}

impl OffsetEncoding {
	/// Parse from LSP position encoding kind.
	pub fn from_lsp(kind: &PositionEncodingKind) -> Option<Self> {
		match kind.as_str() {
			"utf-8" => Some(Self::Utf8),
			"utf-16" => Some(Self::Utf16),
			"utf-32" => Some(Self::Utf32),
			_ => None,
		}
	}

	/// The protocol name of this encoding.
	pub fn to_lsp(self) -> PositionEncodingKind {
		match self {
			Self::Utf8 => PositionEncodingKind::UTF8,
			Self::Utf16 => PositionEncodingKind::UTF16,
			Self::Utf32 => PositionEncodingKind::UTF32,
		}
	}

	/// Number of code units `ch` occupies in this encoding.
	#[inline]
	pub fn unit_len(self, ch: char) -> usize {
		match self {
			Self::Utf8 => ch.len_utf8(),
			Self::Utf16 => ch.len_utf16(),
			Self::Utf32 => 1,
		}
	}
}

/// Converts a protocol column on `line` into a character offset.
///
/// A column past the end of the line clamps to the line length. A column
/// pointing inside a multi-unit character (e.g. between the two halves of a
/// UTF-16 surrogate pair) clamps to the start of that character.
pub fn to_buffer_offset(line: &str, character: u32, encoding: OffsetEncoding) -> usize {
	let target = character as usize;
	let mut units = 0;
	for (idx, ch) in line.chars().enumerate() {
		let next = units + encoding.unit_len(ch);
		if next > target {
			return idx;
		}
		units = next;
	}
	char_len(line)
}

/// Converts a character offset on `line` into a protocol position.
///
/// Offsets past the end of the line clamp to the line length.
pub fn to_protocol_position(line_number: u32, line: &str, offset: usize, encoding: OffsetEncoding) -> Position {
	let units: usize = line.chars().take(offset).map(|ch| encoding.unit_len(ch)).sum();
	Position {
		line: line_number,
		character: u32::try_from(units).unwrap_or(u32::MAX),
	}
}

/// Number of characters on `line`.
#[inline]
pub fn char_len(line: &str) -> usize {
	line.chars().count()
}

/// Byte index of the character at `offset`, clamped to the line length.
pub fn char_to_byte(line: &str, offset: usize) -> usize {
	line.char_indices().nth(offset).map_or(line.len(), |(byte, _)| byte)
}

/// Character offset of the byte index `byte`.
///
/// Bytes inside a multi-byte character round down to that character.
pub fn byte_to_char(line: &str, byte: usize) -> usize {
	let mut byte = byte.min(line.len());
	while !line.is_char_boundary(byte) {
		byte -= 1;
	}
	char_len(&line[..byte])
}

/// The text between two character offsets, clamped to the line.
///
/// An inverted range yields an empty slice.
pub fn slice_chars(line: &str, start: usize, end: usize) -> &str {
	let start = char_to_byte(line, start);
	let end = char_to_byte(line, end).max(start);
	&line[start..end]
}
