//! Buffer correction after the engine inserted an item.
//!
//! The engine inserts an item's `word` at the suggestion column on its own.
//! That is enough for most items; the ones whose canonical text, edit range or
//! additional edits disagree with the plain insertion are rewritten here in a
//! single batch of edits.
//!
//! All offsets below are character offsets until the batch is handed to the
//! editor, which takes byte columns.

use std::collections::HashMap;

use lsp_types::{CompletionItem, CompletionTextEdit, Position, TextEdit};
use lspcomp_position::{OffsetEncoding, char_len, char_to_byte, slice_chars, to_buffer_offset};
use tracing::debug;

use crate::config::{ConfirmBehavior, SnippetEngine};
use crate::host::{BufferEdit, BufferPosition, Editor, LanguageClient, LineContext};
use crate::item::{ItemPayload, NormalizedItem, edit_range, insert_text, is_snippet};
use crate::session::CompletionSession;
use crate::{Error, Result, snippet};

/// What [`CompletionSession::confirm`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
	/// The buffer no longer holds the accepted text where it was inserted.
	/// Nothing was changed.
	Stale,
	/// The engine's own insertion already matches the item.
	Native,
	/// Corrective edits were applied.
	Corrected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Point {
	line: u32,
	character: usize,
}

#[derive(Debug, Clone)]
struct PlannedEdit {
	start: Point,
	end: Point,
	text: String,
}

impl<C: LanguageClient, E: Editor> CompletionSession<C, E> {
	/// Reconciles the buffer with `item` after the engine inserted `accepted`.
	pub async fn confirm(&self, item: &NormalizedItem, accepted: &str) -> Result<ConfirmOutcome> {
		let payload = &item.user_data;
		let live = self.editor.line_context().await?;
		let suggest = payload.suggest_character;
		if live.character < suggest || slice_chars(&live.text, suggest, live.character) != accepted {
			debug!(provider = %payload.client_id, accepted, "buffer changed under the completion, skipping confirm");
			return Ok(ConfirmOutcome::Stale);
		}

		let mut candidate = payload.candidate()?;
		if payload.resolvable && self.config.enable_resolve_item {
			candidate = self.resolve_candidate(payload, candidate).await;
		}

		let text = insert_text(&candidate).to_owned();
		let additional = match &candidate.additional_text_edits {
			Some(edits) if self.config.enable_additional_text_edit => edits.clone(),
			_ => Vec::new(),
		};
		let request = payload.request_character;
		let span = request_span(&candidate, payload, self.config.confirm_behavior, live.line);
		if text == accepted && additional.is_empty() && span.is_none_or(|span| span == (suggest, request)) {
			return Ok(ConfirmOutcome::Native);
		}

		let (edit_start, edit_end) = span.unwrap_or((suggest, request));
		let Some((main, inserted)) = self.main_edit(payload, &live, &candidate, &text, edit_start, edit_end) else {
			return Ok(ConfirmOutcome::Stale);
		};

		let mut lines = HashMap::from([(live.line, live.text.clone())]);
		let mut edits = Vec::with_capacity(additional.len() + 1);
		for edit in &additional {
			edits.push(self.additional_edit(edit, payload, &live, &mut lines).await?);
		}
		// Insertions at the word's own start land before it once applied.
		let preceding: Vec<_> = edits.iter().filter(|edit| edit.end <= main.start).cloned().collect();
		edits.push(main.clone());
		edits.sort_by_key(|edit| (edit.start, edit.end));
		if edits.windows(2).any(|pair| pair[0].end > pair[1].start) {
			return Err(Error::OverlappingEdits);
		}

		let buffer_edits: Vec<_> = edits
			.iter()
			.rev()
			.map(|edit| BufferEdit {
				start: to_buffer_position(edit.start, &lines),
				end: to_buffer_position(edit.end, &lines),
				text: edit.text.clone(),
			})
			.collect();

		let cursor = preceding
			.iter()
			.rev()
			.fold(main.start, |point, edit| shift_past(point, edit));
		let cursor = advance(cursor, &main.text.chars().take(inserted).collect::<String>());

		self.editor.undo_break().await?;
		self.editor.apply_edits(buffer_edits).await?;
		let cursor_line = self.editor.line(cursor.line).await?;
		self.editor
			.set_cursor(BufferPosition::new(cursor.line, char_to_byte(&cursor_line, cursor.character)))
			.await?;

		if is_snippet(&candidate) {
			match &self.config.snippet_engine {
				Some(SnippetEngine::Callback(name)) => self.editor.call_snippet_callback(name, text).await?,
				Some(SnippetEngine::Function(expand)) => expand(text),
				None => {}
			}
		}
		self.editor.skip_next_complete().await?;
		Ok(ConfirmOutcome::Corrected)
	}

	/// The edit replacing what the engine inserted with the item's text, and
	/// the number of its characters the cursor ends up behind.
	///
	/// Returns `None` when the text before the suggestion column that the
	/// item's edit covers no longer matches the request line.
	fn main_edit(
		&self,
		payload: &ItemPayload,
		live: &LineContext,
		candidate: &CompletionItem,
		text: &str,
		edit_start: usize,
		edit_end: usize,
	) -> Option<(PlannedEdit, usize)> {
		let request_line = &payload.line_on_request;
		let suggest = payload.suggest_character;
		let request = payload.request_character;
		let cursor = live.character;

		let start = edit_start.min(suggest);
		if slice_chars(&live.text, start, suggest) != slice_chars(request_line, start, suggest) {
			debug!(provider = %payload.client_id, "text before the completion changed, skipping confirm");
			return None;
		}

		let mut end = cursor;
		if edit_end > request {
			let overhang = edit_end - request;
			if slice_chars(&live.text, cursor, cursor + overhang) == slice_chars(request_line, request, edit_end) {
				end = cursor + overhang;
			} else {
				debug!(provider = %payload.client_id, "text after the cursor changed, keeping it");
			}
		}

		let before = if edit_start > suggest { slice_chars(request_line, suggest, edit_start) } else { "" };
		let after = if edit_end < request { slice_chars(request_line, edit_end, request) } else { "" };
		let body = self.body(candidate, text);
		let inserted = char_len(before) + char_len(&body);
		let edit = PlannedEdit {
			start: Point { line: live.line, character: start },
			end: Point { line: live.line, character: end },
			text: format!("{before}{body}{after}"),
		};
		Some((edit, inserted))
	}

	/// Text written into the buffer for the item itself.
	///
	/// A snippet handed to an engine is left for the engine to insert.
	fn body(&self, candidate: &CompletionItem, text: &str) -> String {
		match (is_snippet(candidate), &self.config.snippet_engine) {
			(false, _) => text.to_owned(),
			(true, Some(_)) => String::new(),
			(true, None) => snippet::render_plain(text),
		}
	}

	/// Converts an additional edit into live character coordinates.
	async fn additional_edit(&self, edit: &TextEdit, payload: &ItemPayload, live: &LineContext, lines: &mut HashMap<u32, String>) -> Result<PlannedEdit> {
		let start = self.live_point(edit.range.start, payload, live, lines).await?;
		let end = self.live_point(edit.range.end, payload, live, lines).await?;
		Ok(PlannedEdit {
			start,
			end: end.max(start),
			text: edit.new_text.clone(),
		})
	}

	async fn live_point(&self, position: Position, payload: &ItemPayload, live: &LineContext, lines: &mut HashMap<u32, String>) -> Result<Point> {
		let encoding = payload.offset_encoding;
		if position.line == live.line {
			return Ok(Point {
				line: position.line,
				character: shift_request_offset(&payload.line_on_request, position.character, encoding, payload.request_character, live.character),
			});
		}
		if !lines.contains_key(&position.line) {
			let text = self.editor.line(position.line).await?;
			lines.insert(position.line, text);
		}
		let text = lines.get(&position.line).map(String::as_str).unwrap_or_default();
		Ok(Point {
			line: position.line,
			character: to_buffer_offset(text, position.character, encoding),
		})
	}
}

/// Character span on the request line that the item's edit replaces.
///
/// A plain edit under [`ConfirmBehavior::Insert`] never reaches past the
/// request cursor. An edit ending on a later line is cut at the line end.
fn request_span(candidate: &CompletionItem, payload: &ItemPayload, behavior: ConfirmBehavior, line: u32) -> Option<(usize, usize)> {
	let range = edit_range(candidate, behavior)?;
	if range.start.line != line {
		return None;
	}
	let request_line = &payload.line_on_request;
	let start = to_buffer_offset(request_line, range.start.character, payload.offset_encoding);
	let mut end = if range.end.line == line {
		to_buffer_offset(request_line, range.end.character, payload.offset_encoding)
	} else {
		char_len(request_line)
	};
	if behavior == ConfirmBehavior::Insert && matches!(candidate.text_edit, Some(CompletionTextEdit::Edit(_))) {
		end = end.min(payload.request_character);
	}
	Some((start, end.max(start)))
}

/// Maps a request-line offset onto the live line, where everything from the
/// request cursor on has moved with the inserted word.
fn shift_request_offset(request_line: &str, character: u32, encoding: OffsetEncoding, request: usize, cursor: usize) -> usize {
	let offset = to_buffer_offset(request_line, character, encoding);
	if offset >= request { offset - request + cursor } else { offset }
}

/// Moves `point` forward over `text` as if it had just been inserted there.
fn advance(point: Point, text: &str) -> Point {
	match text.rsplit_once('\n') {
		Some((head, tail)) => Point {
			line: point
				.line
				.saturating_add(u32::try_from(head.matches('\n').count()).unwrap_or(u32::MAX))
				.saturating_add(1),
			character: char_len(tail),
		},
		None => Point {
			line: point.line,
			character: point.character + char_len(text),
		},
	}
}

/// Position of `point` once `edit`, which ends at or before it, is applied.
fn shift_past(point: Point, edit: &PlannedEdit) -> Point {
	let replaced_end = advance(edit.start, &edit.text);
	let line = point.line - edit.end.line + replaced_end.line;
	let character = if point.line == edit.end.line {
		replaced_end.character + (point.character - edit.end.character)
	} else {
		point.character
	};
	Point { line, character }
}

fn to_buffer_position(point: Point, lines: &HashMap<u32, String>) -> BufferPosition {
	let byte = lines.get(&point.line).map_or(0, |text| char_to_byte(text, point.character));
	BufferPosition::new(point.line, byte)
}
