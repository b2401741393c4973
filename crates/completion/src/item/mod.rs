//! Completion item normalization.
//!
//! A protocol response is turned into [`NormalizedItem`]s one entry at a time:
//! list-level `itemDefaults` are merged into each entry, the display word is
//! computed relative to where the engine will start inserting, and the entry
//! itself is serialized into the item's payload so that confirm and preview
//! can replay it later.
//!
//! Entries that fail to decode, or whose edit cannot be expressed as a word
//! starting at the suggestion column, are dropped without affecting their
//! siblings.

use std::cmp::Ordering;

use lsp_types::{
	CompletionItem, CompletionItemKind, CompletionItemTag, CompletionTextEdit, InsertReplaceEdit, InsertTextFormat, InsertTextMode, Range,
	TextEdit,
};
use lspcomp_position::{OffsetEncoding, slice_chars, to_buffer_offset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::{CompletionConfig, ConfirmBehavior};
use crate::provider::{Provider, ProviderId};
use crate::{Result, snippet};

/// Highlight group for the snippet indicator in the menu label.
pub const SNIPPET_INDICATOR_HIGHLIGHT: &str = "lspcomp-snippet-indicator";

/// Highlight group for deprecated items.
pub const DEPRECATED_HIGHLIGHT: &str = "lspcomp-deprecated";

/// A completion response as received, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionListPayload {
	/// The provider expects to be asked again as the prefix grows.
	#[serde(default)]
	pub is_incomplete: bool,
	/// Values shared by every entry that omits its own.
	#[serde(default)]
	pub item_defaults: Option<ItemDefaults>,
	/// Raw entries, decoded individually.
	#[serde(default)]
	pub items: Vec<Value>,
}

impl CompletionListPayload {
	/// Accepts either result shape of `textDocument/completion`.
	///
	/// `null` is an empty complete list, a bare array is a complete list.
	pub fn from_response(response: Option<Value>) -> Result<Self> {
		match response {
			None | Some(Value::Null) => Ok(Self::default()),
			Some(Value::Array(items)) => Ok(Self {
				items,
				..Self::default()
			}),
			Some(list) => Ok(serde_json::from_value(list)?),
		}
	}
}

/// `CompletionList.itemDefaults`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDefaults {
	/// Default commit characters.
	pub commit_characters: Option<Vec<String>>,
	/// Default edit range.
	pub edit_range: Option<EditRangeDefault>,
	/// Default insert text format.
	pub insert_text_format: Option<InsertTextFormat>,
	/// Default insert text mode.
	pub insert_text_mode: Option<InsertTextMode>,
	/// Default side-channel data.
	pub data: Option<Value>,
}

/// Default edit range, either plain or insert/replace.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EditRangeDefault {
	/// Separate insert and replace ranges.
	InsertReplace {
		/// Range used when inserting.
		insert: Range,
		/// Range used when replacing.
		replace: Range,
	},
	/// A single range.
	Range(Range),
}

/// Highlight span inside the menu label, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHighlight {
	/// Highlight name.
	pub name: String,
	/// Highlight group applied to the span.
	pub hl_group: String,
	/// Start byte within the label.
	pub col: usize,
	/// Width in bytes.
	pub width: usize,
}

/// Replay state stored with every item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
	/// The candidate with list defaults applied, as JSON.
	pub lspitem: String,
	/// Provider that produced the candidate.
	pub client_id: ProviderId,
	/// Encoding of every protocol position in `lspitem`.
	pub offset_encoding: OffsetEncoding,
	/// Whether `completionItem/resolve` may be sent for this candidate.
	pub resolvable: bool,
	/// Cursor line text when the request was sent.
	pub line_on_request: String,
	/// Cursor character offset when the request was sent.
	pub request_character: usize,
	/// Character offset where the engine inserts the word.
	pub suggest_character: usize,
}

impl ItemPayload {
	/// Decodes the stored candidate.
	pub fn candidate(&self) -> Result<CompletionItem> {
		Ok(serde_json::from_str(&self.lspitem)?)
	}
}

/// A candidate in the shape the completion engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
	/// Text the engine inserts, a single line.
	pub word: String,
	/// Label shown in the menu.
	pub abbr: String,
	/// Kind name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	/// Extra menu column.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub menu: Option<String>,
	/// Label highlights.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub highlights: Vec<ItemHighlight>,
	/// Replay state.
	pub user_data: ItemPayload,
}

/// Request state shared by every entry of one response.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
	/// Provider that answered.
	pub provider: &'a Provider,
	/// Display options.
	pub config: &'a CompletionConfig,
	/// Cursor line text at request time.
	pub line_on_request: &'a str,
	/// Cursor line number at request time.
	pub line: u32,
	/// Cursor character offset at request time.
	pub request_character: usize,
	/// Character offset where the completion word starts.
	pub suggest_character: usize,
}

/// Normalizes every entry of a response, keeping response order.
pub fn normalize_list(list: CompletionListPayload, cx: &NormalizeContext<'_>) -> Vec<NormalizedItem> {
	let defaults = list.item_defaults.as_ref();
	list.items
		.into_iter()
		.filter_map(|raw| match apply_defaults(raw, defaults) {
			Ok(candidate) => normalize(candidate, cx),
			Err(err) => {
				warn!(provider = %cx.provider.id, error = %err, "dropping malformed completion item");
				None
			}
		})
		.collect()
}

/// Decodes a raw entry and fills in list defaults it leaves unset.
pub fn apply_defaults(raw: Value, defaults: Option<&ItemDefaults>) -> Result<CompletionItem> {
	let text_edit_text = raw.get("textEditText").and_then(Value::as_str).map(str::to_owned);
	let mut item: CompletionItem = serde_json::from_value(raw)?;
	let Some(defaults) = defaults else {
		return Ok(item);
	};

	if item.commit_characters.is_none() {
		item.commit_characters.clone_from(&defaults.commit_characters);
	}
	if item.insert_text_format.is_none() {
		item.insert_text_format = defaults.insert_text_format;
	}
	if item.insert_text_mode.is_none() {
		item.insert_text_mode = defaults.insert_text_mode;
	}
	if item.data.is_none() {
		item.data.clone_from(&defaults.data);
	}
	if item.text_edit.is_none()
		&& let Some(edit_range) = defaults.edit_range
	{
		let new_text = text_edit_text
			.or_else(|| item.insert_text.clone())
			.unwrap_or_else(|| item.label.clone());
		item.text_edit = Some(match edit_range {
			EditRangeDefault::Range(range) => CompletionTextEdit::Edit(TextEdit { range, new_text }),
			EditRangeDefault::InsertReplace { insert, replace } => CompletionTextEdit::InsertAndReplace(InsertReplaceEdit { new_text, insert, replace }),
		});
	}
	Ok(item)
}

/// Normalizes one decoded candidate. `None` drops it.
pub fn normalize(candidate: CompletionItem, cx: &NormalizeContext<'_>) -> Option<NormalizedItem> {
	let snippet = is_snippet(&candidate);
	let text = insert_text(&candidate);
	let plain = if snippet { snippet::render_plain(text) } else { text.to_owned() };

	let word = word_from_suggestion(&candidate, plain, cx)?;
	let word = word.split(['\n', '\r']).next().unwrap_or_default().to_owned();
	if word.is_empty() {
		return None;
	}

	let mut abbr = candidate.label.clone();
	let mut highlights = Vec::new();
	if is_deprecated(&candidate) {
		highlights.push(ItemHighlight {
			name: String::from(DEPRECATED_HIGHLIGHT),
			hl_group: String::from("Comment"),
			col: 0,
			width: abbr.len(),
		});
	}
	if snippet && !cx.config.snippet_indicator.is_empty() {
		highlights.push(ItemHighlight {
			name: String::from(SNIPPET_INDICATOR_HIGHLIGHT),
			hl_group: String::from("Special"),
			col: abbr.len(),
			width: cx.config.snippet_indicator.len(),
		});
		abbr.push_str(&cx.config.snippet_indicator);
	}

	let menu = cx.config.enable_display_detail.then(|| display_detail(&candidate)).flatten();

	let lspitem = match serde_json::to_string(&candidate) {
		Ok(json) => json,
		Err(err) => {
			warn!(provider = %cx.provider.id, error = %err, "failed to store completion item");
			return None;
		}
	};

	Some(NormalizedItem {
		word,
		abbr,
		kind: candidate.kind.and_then(kind_name).map(String::from),
		menu,
		highlights,
		user_data: ItemPayload {
			lspitem,
			client_id: cx.provider.id,
			offset_encoding: cx.provider.offset_encoding,
			resolvable: cx.provider.capabilities.resolve,
			line_on_request: cx.line_on_request.to_owned(),
			request_character: cx.request_character,
			suggest_character: cx.suggest_character,
		},
	})
}

/// Re-bases `plain` so that it starts at the suggestion column.
///
/// An edit starting after the suggestion column gets the request line's text
/// in between prepended. An edit starting before it must repeat the text the
/// user already typed there, which is stripped; otherwise the candidate is not
/// a simple word completion and is dropped, as is any edit starting on another
/// line.
fn word_from_suggestion(candidate: &CompletionItem, plain: String, cx: &NormalizeContext<'_>) -> Option<String> {
	let Some(range) = edit_range(candidate, ConfirmBehavior::Insert) else {
		return Some(plain);
	};
	if range.start.line != cx.line {
		return None;
	}

	let start = to_buffer_offset(cx.line_on_request, range.start.character, cx.provider.offset_encoding);
	let suggest = cx.suggest_character;
	match start.cmp(&suggest) {
		Ordering::Equal => Some(plain),
		Ordering::Greater => Some(format!("{}{plain}", slice_chars(cx.line_on_request, suggest, start))),
		Ordering::Less => {
			let typed = slice_chars(cx.line_on_request, start, suggest);
			plain.strip_prefix(typed).map(str::to_owned)
		}
	}
}

/// Text the candidate inserts: `textEdit.newText`, `insertText`, then `label`.
pub fn insert_text(item: &CompletionItem) -> &str {
	match &item.text_edit {
		Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
		Some(CompletionTextEdit::InsertAndReplace(edit)) => &edit.new_text,
		None => item.insert_text.as_deref().unwrap_or(&item.label),
	}
}

/// Whether the candidate's text uses snippet syntax.
pub fn is_snippet(item: &CompletionItem) -> bool {
	item.insert_text_format == Some(InsertTextFormat::SNIPPET)
}

/// Range of the candidate's text edit, picking the side of an insert/replace
/// edit according to `behavior`.
pub fn edit_range(item: &CompletionItem, behavior: ConfirmBehavior) -> Option<Range> {
	match item.text_edit.as_ref()? {
		CompletionTextEdit::Edit(edit) => Some(edit.range),
		CompletionTextEdit::InsertAndReplace(edit) => Some(match behavior {
			ConfirmBehavior::Insert => edit.insert,
			ConfirmBehavior::Replace => edit.replace,
		}),
	}
}

fn is_deprecated(item: &CompletionItem) -> bool {
	item.deprecated == Some(true)
		|| item
			.tags
			.as_ref()
			.is_some_and(|tags| tags.contains(&CompletionItemTag::DEPRECATED))
}

fn display_detail(item: &CompletionItem) -> Option<String> {
	let from_label = item
		.label_details
		.as_ref()
		.and_then(|details| details.description.clone().or_else(|| details.detail.clone()));
	from_label.or_else(|| item.detail.clone()).filter(|detail| !detail.is_empty())
}

/// Human-readable name of a completion kind.
pub fn kind_name(kind: CompletionItemKind) -> Option<&'static str> {
	Some(match kind {
		CompletionItemKind::TEXT => "Text",
		CompletionItemKind::METHOD => "Method",
		CompletionItemKind::FUNCTION => "Function",
		CompletionItemKind::CONSTRUCTOR => "Constructor",
		CompletionItemKind::FIELD => "Field",
		CompletionItemKind::VARIABLE => "Variable",
		CompletionItemKind::CLASS => "Class",
		CompletionItemKind::INTERFACE => "Interface",
		CompletionItemKind::MODULE => "Module",
		CompletionItemKind::PROPERTY => "Property",
		CompletionItemKind::UNIT => "Unit",
		CompletionItemKind::VALUE => "Value",
		CompletionItemKind::ENUM => "Enum",
		CompletionItemKind::KEYWORD => "Keyword",
		CompletionItemKind::SNIPPET => "Snippet",
		CompletionItemKind::COLOR => "Color",
		CompletionItemKind::FILE => "File",
		CompletionItemKind::REFERENCE => "Reference",
		CompletionItemKind::FOLDER => "Folder",
		CompletionItemKind::ENUM_MEMBER => "EnumMember",
		CompletionItemKind::CONSTANT => "Constant",
		CompletionItemKind::STRUCT => "Struct",
		CompletionItemKind::EVENT => "Event",
		CompletionItemKind::OPERATOR => "Operator",
		CompletionItemKind::TYPE_PARAMETER => "TypeParameter",
		_ => return None,
	})
}
