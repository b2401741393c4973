//! Seams to the language client and the editor.
//!
//! Both sides live out of process in a typical deployment, so every call is
//! async and fallible. Positions handed to the editor use byte columns; the
//! session converts from character offsets using line text it has already
//! read.

use async_trait::async_trait;
use lsp_types::{CompletionItem, CompletionParams, Uri};
use serde_json::Value;

use crate::Result;
use crate::provider::{Provider, ProviderId};

/// Snapshot of the cursor line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext {
	/// Zero-based line number.
	pub line: u32,
	/// Cursor position as a character offset into `text`.
	pub character: usize,
	/// Full text of the line, without the line break.
	pub text: String,
}

/// A buffer position with a byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferPosition {
	/// Zero-based line number.
	pub line: u32,
	/// Byte offset into the line.
	pub byte: usize,
}

impl BufferPosition {
	/// Creates a position.
	pub const fn new(line: u32, byte: usize) -> Self {
		Self { line, byte }
	}
}

/// Replaces the text between `start` and `end` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferEdit {
	/// Start of the replaced range.
	pub start: BufferPosition,
	/// End of the replaced range (exclusive).
	pub end: BufferPosition,
	/// Replacement text, possibly spanning lines.
	pub text: String,
}

/// Access to the language servers attached to the current buffer.
#[async_trait]
pub trait LanguageClient: Send + Sync {
	/// Providers active for the current buffer.
	async fn list_providers(&self) -> Result<Vec<Provider>>;

	/// Sends `textDocument/completion` and returns the raw result.
	///
	/// The session bounds this call with its own timeout; implementations do
	/// not need one.
	async fn completion(&self, provider: ProviderId, params: CompletionParams) -> Result<Option<Value>>;

	/// Sends `completionItem/resolve`.
	async fn resolve(&self, provider: ProviderId, item: CompletionItem) -> Result<Option<CompletionItem>>;

	/// Renders a snippet body for display.
	///
	/// Defaults to the plain rendering of [`crate::snippet::render_plain`].
	async fn parse_snippet_body(&self, body: &str) -> Result<String> {
		Ok(crate::snippet::render_plain(body))
	}
}

/// Buffer introspection and mutation.
#[async_trait]
pub trait Editor: Send + Sync {
	/// The cursor line and position.
	async fn line_context(&self) -> Result<LineContext>;

	/// Text of an arbitrary line.
	async fn line(&self, line: u32) -> Result<String>;

	/// Filetype of the current buffer.
	async fn filetype(&self) -> Result<String>;

	/// URI of the current buffer.
	async fn document_uri(&self) -> Result<Uri>;

	/// Applies a batch of non-overlapping edits.
	///
	/// Edits arrive ordered last to first, so applying them one after another
	/// never shifts a range that is still pending.
	async fn apply_edits(&self, edits: Vec<BufferEdit>) -> Result<()>;

	/// Moves the cursor.
	async fn set_cursor(&self, position: BufferPosition) -> Result<()>;

	/// Starts a new undo step.
	async fn undo_break(&self) -> Result<()>;

	/// Invokes a host-registered snippet callback with the snippet body.
	async fn call_snippet_callback(&self, name: &str, body: String) -> Result<()>;

	/// Suppresses the completion the engine would start after our own edit.
	async fn skip_next_complete(&self) -> Result<()>;

	/// Shows a non-fatal error to the user.
	fn report_error(&self, message: String);
}
