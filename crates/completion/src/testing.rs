//! In-memory language client and editor for session tests.

use std::collections::HashMap;

use async_trait::async_trait;
use lsp_types::{CompletionItem, CompletionParams, Uri};
use parking_lot::Mutex;
use serde_json::Value;

use crate::host::{BufferEdit, BufferPosition, Editor, LanguageClient, LineContext};
use crate::provider::{Provider, ProviderId};
use crate::{Error, Result, position};

/// How a provider answers `textDocument/completion`.
#[derive(Debug, Clone)]
pub enum MockResponse {
	Value(Option<Value>),
	Error(String),
	/// Never answers.
	Hang,
}

#[derive(Default)]
pub struct MockClient {
	providers: Vec<Provider>,
	responses: Mutex<HashMap<ProviderId, MockResponse>>,
	resolved: Mutex<HashMap<String, Option<CompletionItem>>>,
	requests: Mutex<Vec<(ProviderId, CompletionParams)>>,
	resolve_calls: Mutex<Vec<String>>,
}

impl MockClient {
	pub fn new(providers: Vec<Provider>) -> Self {
		Self {
			providers,
			..Self::default()
		}
	}

	pub fn respond(&self, provider: ProviderId, response: MockResponse) {
		self.responses.lock().insert(provider, response);
	}

	pub fn respond_json(&self, provider: ProviderId, value: Value) {
		self.respond(provider, MockResponse::Value(Some(value)));
	}

	/// Answers resolve requests for the item labelled `label`.
	pub fn resolve_to(&self, label: &str, item: Option<CompletionItem>) {
		self.resolved.lock().insert(label.to_string(), item);
	}

	pub fn requests(&self) -> Vec<(ProviderId, CompletionParams)> {
		self.requests.lock().clone()
	}

	pub fn request_count(&self, provider: ProviderId) -> usize {
		self.requests.lock().iter().filter(|(id, _)| *id == provider).count()
	}

	pub fn resolve_calls(&self) -> Vec<String> {
		self.resolve_calls.lock().clone()
	}
}

#[async_trait]
impl LanguageClient for MockClient {
	async fn list_providers(&self) -> Result<Vec<Provider>> {
		Ok(self.providers.clone())
	}

	async fn completion(&self, provider: ProviderId, params: CompletionParams) -> Result<Option<Value>> {
		self.requests.lock().push((provider, params));
		let response = self.responses.lock().get(&provider).cloned();
		match response {
			None => Ok(None),
			Some(MockResponse::Value(value)) => Ok(value),
			Some(MockResponse::Error(message)) => Err(Error::Client(message)),
			Some(MockResponse::Hang) => futures::future::pending().await,
		}
	}

	async fn resolve(&self, _provider: ProviderId, item: CompletionItem) -> Result<Option<CompletionItem>> {
		self.resolve_calls.lock().push(item.label.clone());
		match self.resolved.lock().get(&item.label) {
			Some(resolved) => Ok(resolved.clone()),
			None => Err(Error::Client(format!("no resolve answer for {}", item.label))),
		}
	}
}

/// Everything the session asked the editor to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCall {
	UndoBreak,
	ApplyEdits(Vec<BufferEdit>),
	SetCursor(BufferPosition),
	SnippetCallback(String, String),
	SkipNextComplete,
}

struct BufferState {
	lines: Vec<String>,
	cursor_line: u32,
	/// Character offset.
	cursor: usize,
}

pub struct MockEditor {
	state: Mutex<BufferState>,
	filetype: String,
	calls: Mutex<Vec<EditorCall>>,
	errors: Mutex<Vec<String>>,
}

impl MockEditor {
	/// A buffer whose cursor sits at the first `|` in `text`.
	pub fn new(text: &str) -> Self {
		let (cursor_line, cursor, lines) = text
			.split('\n')
			.enumerate()
			.find_map(|(line, content)| content.find('|').map(|byte| (line, position::byte_to_char(content, byte))))
			.map(|(line, cursor)| {
				let lines = text.replacen('|', "", 1).split('\n').map(String::from).collect();
				(line as u32, cursor, lines)
			})
			.unwrap_or_else(|| (0, 0, text.split('\n').map(String::from).collect()));
		Self {
			state: Mutex::new(BufferState { lines, cursor_line, cursor }),
			filetype: String::from("rust"),
			calls: Mutex::new(Vec::new()),
			errors: Mutex::new(Vec::new()),
		}
	}

	pub fn with_filetype(mut self, filetype: &str) -> Self {
		self.filetype = filetype.to_string();
		self
	}

	/// Buffer text with `|` marking the cursor.
	pub fn text(&self) -> String {
		let state = self.state.lock();
		let mut lines = state.lines.clone();
		if let Some(line) = lines.get_mut(state.cursor_line as usize) {
			line.insert(position::char_to_byte(line, state.cursor), '|');
		}
		lines.join("\n")
	}

	/// Replaces the buffer, e.g. to simulate the engine's native insertion.
	pub fn set_text(&self, text: &str) {
		let fresh = Self::new(text);
		*self.state.lock() = fresh.state.into_inner();
	}

	pub fn calls(&self) -> Vec<EditorCall> {
		self.calls.lock().clone()
	}

	pub fn errors(&self) -> Vec<String> {
		self.errors.lock().clone()
	}
}

fn absolute(lines: &[String], position: BufferPosition) -> usize {
	let before: usize = lines.iter().take(position.line as usize).map(|line| line.len() + 1).sum();
	before + position.byte
}

#[async_trait]
impl Editor for MockEditor {
	async fn line_context(&self) -> Result<LineContext> {
		let state = self.state.lock();
		Ok(LineContext {
			line: state.cursor_line,
			character: state.cursor,
			text: state.lines[state.cursor_line as usize].clone(),
		})
	}

	async fn line(&self, line: u32) -> Result<String> {
		self.state
			.lock()
			.lines
			.get(line as usize)
			.cloned()
			.ok_or_else(|| Error::Editor(format!("no line {line}")))
	}

	async fn filetype(&self) -> Result<String> {
		Ok(self.filetype.clone())
	}

	async fn document_uri(&self) -> Result<Uri> {
		"file:///src/main.rs".parse().map_err(|_| Error::Editor(String::from("bad uri")))
	}

	async fn apply_edits(&self, edits: Vec<BufferEdit>) -> Result<()> {
		self.calls.lock().push(EditorCall::ApplyEdits(edits.clone()));
		let mut state = self.state.lock();
		let mut text = state.lines.join("\n");
		for edit in &edits {
			let start = absolute(&state.lines, edit.start);
			let end = absolute(&state.lines, edit.end);
			text.replace_range(start..end, &edit.text);
		}
		state.lines = text.split('\n').map(String::from).collect();
		Ok(())
	}

	async fn set_cursor(&self, position: BufferPosition) -> Result<()> {
		self.calls.lock().push(EditorCall::SetCursor(position));
		let mut state = self.state.lock();
		let line = &state.lines[position.line as usize];
		state.cursor = position::byte_to_char(line, position.byte);
		state.cursor_line = position.line;
		Ok(())
	}

	async fn undo_break(&self) -> Result<()> {
		self.calls.lock().push(EditorCall::UndoBreak);
		Ok(())
	}

	async fn call_snippet_callback(&self, name: &str, body: String) -> Result<()> {
		self.calls.lock().push(EditorCall::SnippetCallback(name.to_string(), body));
		Ok(())
	}

	async fn skip_next_complete(&self) -> Result<()> {
		self.calls.lock().push(EditorCall::SkipNextComplete);
		Ok(())
	}

	fn report_error(&self, message: String) {
		self.errors.lock().push(message);
	}
}
