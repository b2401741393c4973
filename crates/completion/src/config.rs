//! Behavior options recognized by the completion session.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which range of an insert/replace edit is honored on confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmBehavior {
	/// Insert at the original cursor, never deleting text after it.
	#[default]
	Insert,
	/// Honor the server's replace range.
	Replace,
}

/// Function sink receiving a snippet body to expand.
pub type SnippetFn = Arc<dyn Fn(String) + Send + Sync>;

/// External snippet engine used to expand snippet-formatted items.
#[derive(Clone)]
pub enum SnippetEngine {
	/// A named callback registered on the host side.
	Callback(String),
	/// A function value set by the embedding program.
	Function(SnippetFn),
}

impl std::fmt::Debug for SnippetEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Callback(name) => f.debug_tuple("Callback").field(name).finish(),
			Self::Function(_) => f.write_str("Function(..)"),
		}
	}
}

/// Configuration for a [`CompletionSession`](crate::CompletionSession).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionConfig {
	/// Snippet engine; an empty name means none.
	#[serde(deserialize_with = "deserialize_snippet_engine")]
	pub snippet_engine: Option<SnippetEngine>,
	/// Resolve items before confirming them.
	pub enable_resolve_item: bool,
	/// Apply `additionalTextEdits` on confirm.
	pub enable_additional_text_edit: bool,
	/// Range policy for insert/replace edits.
	pub confirm_behavior: ConfirmBehavior,
	/// Marker appended to the menu label of snippet items.
	pub snippet_indicator: String,
	/// Show the item detail in the menu column.
	pub enable_display_detail: bool,
}

impl Default for CompletionConfig {
	fn default() -> Self {
		Self {
			snippet_engine: None,
			enable_resolve_item: false,
			enable_additional_text_edit: false,
			confirm_behavior: ConfirmBehavior::Insert,
			snippet_indicator: String::from("~"),
			enable_display_detail: false,
		}
	}
}

impl CompletionConfig {
	/// Parses host-provided parameters. Unknown keys are ignored.
	pub fn from_value(value: Value) -> crate::Result<Self> {
		Ok(serde_json::from_value(value)?)
	}

	/// Expand snippets through a function value.
	pub fn with_snippet_function(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
		self.snippet_engine = Some(SnippetEngine::Function(Arc::new(f)));
		self
	}
}

fn deserialize_snippet_engine<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SnippetEngine>, D::Error> {
	let name = Option::<String>::deserialize(deserializer)?;
	Ok(name.filter(|name| !name.is_empty()).map(SnippetEngine::Callback))
}
