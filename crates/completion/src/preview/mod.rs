//! Documentation preview for the selected item.

use lsp_types::{CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind};
use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::host::{Editor, LanguageClient};
use crate::item::{NormalizedItem, insert_text};
use crate::session::CompletionSession;

/// Places where servers stash the module an item gets imported from.
const IMPORT_SOURCE_POINTERS: &[&str] = &["/entryNames/0/source", "/tsc/source", "/imports/0/full_import_path"];

/// Markup of a [`PreviewDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
	/// Markdown lines.
	Markdown,
}

/// A display-ready preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewDocument {
	/// How `contents` should be rendered.
	pub kind: PreviewKind,
	/// Lines to display.
	pub contents: Vec<String>,
}

impl<C: LanguageClient, E: Editor> CompletionSession<C, E> {
	/// Renders the preview for `item`, resolving it first when the provider
	/// supports resolution.
	pub async fn preview(&self, item: &NormalizedItem) -> Result<PreviewDocument> {
		let payload = &item.user_data;
		let mut candidate = payload.candidate()?;
		if payload.resolvable {
			candidate = self.resolve_candidate(payload, candidate).await;
		}

		let contents = if candidate.kind == Some(CompletionItemKind::SNIPPET) {
			let body = self.client.parse_snippet_body(insert_text(&candidate)).await?;
			fenced(&self.editor.filetype().await?, &body)
		} else {
			let filetype = self.editor.filetype().await?;
			render_sections(&candidate, &filetype)
		};

		Ok(PreviewDocument {
			kind: PreviewKind::Markdown,
			contents,
		})
	}
}

/// Detail, import source and documentation, separated by rules.
pub fn render_sections(item: &CompletionItem, filetype: &str) -> Vec<String> {
	let sections = [
		item.detail.as_deref().map(|detail| fenced(filetype, detail)),
		item.data.as_ref().and_then(import_source).map(|source| vec![format!("import from `{source}`")]),
		item.documentation.as_ref().map(documentation_lines),
	];

	let mut contents = Vec::new();
	for section in sections.into_iter().flatten().filter(|lines| !lines.is_empty()) {
		if !contents.is_empty() {
			contents.push(String::from("---"));
		}
		contents.extend(section);
	}
	contents
}

fn import_source(data: &Value) -> Option<&str> {
	IMPORT_SOURCE_POINTERS
		.iter()
		.find_map(|pointer| data.pointer(pointer).and_then(Value::as_str))
		.filter(|source| !source.is_empty())
}

fn documentation_lines(doc: &Documentation) -> Vec<String> {
	match doc {
		Documentation::String(text) => split_lines(text),
		Documentation::MarkupContent(MarkupContent {
			kind: MarkupKind::PlainText,
			value,
		}) => {
			if value.is_empty() {
				return Vec::new();
			}
			let mut lines = vec![String::from("<text>")];
			lines.extend(split_lines(value));
			lines.push(String::from("</text>"));
			lines
		}
		Documentation::MarkupContent(MarkupContent { value, .. }) => split_lines(value),
	}
}

fn fenced(filetype: &str, text: &str) -> Vec<String> {
	if text.is_empty() {
		return Vec::new();
	}
	let mut lines = vec![format!("```{filetype}")];
	lines.extend(split_lines(text));
	lines.push(String::from("```"));
	lines
}

/// Splits on any line ending. Empty text has no lines.
pub fn split_lines(text: &str) -> Vec<String> {
	if text.is_empty() {
		return Vec::new();
	}
	text.replace("\r\n", "\n").replace('\r', "\n").split('\n').map(String::from).collect()
}
