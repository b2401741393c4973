//! Completion requests across every active provider.
//!
//! One gather cycle snapshots the cursor line once, asks every provider
//! concurrently (or replays its cached items), and merges the answers in
//! provider order. Each request is bounded by the caller's timeout; a
//! provider that is slow or failing simply contributes nothing this cycle.

use std::time::Duration;

use futures::future::join_all;
use lsp_types::{
	CompletionContext, CompletionParams, CompletionTriggerKind, PartialResultParams, TextDocumentIdentifier, TextDocumentPositionParams, Uri,
	WorkDoneProgressParams,
};
use lspcomp_position::{char_len, slice_chars, to_protocol_position};
use tracing::{debug, warn};

use crate::Result;
use crate::host::{Editor, LanguageClient, LineContext};
use crate::item::{CompletionListPayload, NormalizeContext, NormalizedItem, normalize_list};
use crate::provider::Provider;
use crate::session::CompletionSession;

/// What the completion engine knows when it asks for items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherContext {
	/// Text typed so far on the line, up to the cursor.
	pub input: String,
	/// The engine is continuing a session a provider declared incomplete.
	pub is_incomplete: bool,
	/// Character offset where the completion word starts.
	pub complete_pos: usize,
	/// The completion word typed so far, ending at the cursor.
	pub complete_str: String,
	/// Per-provider request timeout.
	pub timeout: Duration,
}

impl GatherContext {
	/// Character offset on `line` where the completion word starts, given the
	/// cursor at character `cursor`.
	///
	/// `complete_pos` is trusted when the line holds `complete_str` between it
	/// and the cursor. Engines that count in bytes disagree on non-ASCII
	/// lines; the start is then recovered from `complete_str` itself.
	pub fn suggest_character(&self, line: &str, cursor: usize) -> usize {
		let pos = self.complete_pos.min(cursor);
		if slice_chars(line, pos, cursor) == self.complete_str {
			return pos;
		}
		match slice_chars(line, 0, cursor).strip_suffix(self.complete_str.as_str()) {
			Some(head) => char_len(head),
			None => {
				debug!(complete_pos = self.complete_pos, complete_str = %self.complete_str, "completion word not found before the cursor");
				pos
			}
		}
	}
}

/// Merged result of one gather cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatherResult {
	/// Items from every provider, in provider order.
	pub items: Vec<NormalizedItem>,
	/// At least one provider answered with an incomplete list.
	pub is_incomplete: bool,
}

enum ProviderOutcome {
	Cached(Vec<NormalizedItem>),
	Responded { items: Vec<NormalizedItem>, is_incomplete: bool },
	Failed,
}

/// Classifies a request for `provider`.
///
/// The last typed character wins if the provider registered it as a trigger;
/// otherwise a continued incomplete session asks for more, and anything else
/// counts as a manual invocation.
pub fn completion_context(provider: &Provider, input: &str, continuing: bool) -> CompletionContext {
	if let Some(ch) = input.chars().next_back()
		&& provider.capabilities.is_trigger_character(ch)
	{
		return CompletionContext {
			trigger_kind: CompletionTriggerKind::TRIGGER_CHARACTER,
			trigger_character: Some(ch.to_string()),
		};
	}
	let trigger_kind = if continuing {
		CompletionTriggerKind::TRIGGER_FOR_INCOMPLETE_COMPLETIONS
	} else {
		CompletionTriggerKind::INVOKED
	};
	CompletionContext {
		trigger_kind,
		trigger_character: None,
	}
}

impl<C: LanguageClient, E: Editor> CompletionSession<C, E> {
	/// Runs a gather cycle over the providers the client reports.
	pub async fn gather(&self, cx: &GatherContext) -> Result<GatherResult> {
		let providers = self.client.list_providers().await?;
		self.gather_from(&providers, cx).await
	}

	/// Runs a gather cycle over `providers`.
	pub async fn gather_from(&self, providers: &[Provider], cx: &GatherContext) -> Result<GatherResult> {
		let mut cache = self.cache.lock().await;

		let line = self.editor.line_context().await?;
		let uri = self.editor.document_uri().await?;
		let (line, uri) = (&line, &uri);

		let cached: Vec<_> = providers.iter().map(|provider| cache.get(provider.id).map(<[_]>::to_vec)).collect();
		let outcomes = join_all(providers.iter().zip(cached).map(|(provider, cached)| async move {
			match cached {
				Some(items) => {
					debug!(provider = %provider.id, count = items.len(), "serving cached completion items");
					ProviderOutcome::Cached(items)
				}
				None => self.request_provider(provider, line, uri, cx).await,
			}
		}))
		.await;

		let mut result = GatherResult::default();
		for (provider, outcome) in providers.iter().zip(outcomes) {
			match outcome {
				ProviderOutcome::Cached(items) => result.items.extend(items),
				ProviderOutcome::Responded { items, is_incomplete } => {
					cache.put(provider.id, items.clone(), is_incomplete);
					result.is_incomplete |= is_incomplete;
					result.items.extend(items);
				}
				ProviderOutcome::Failed => {}
			}
		}

		if !result.is_incomplete {
			cache.clear();
		}
		Ok(result)
	}

	async fn request_provider(&self, provider: &Provider, line: &LineContext, uri: &Uri, cx: &GatherContext) -> ProviderOutcome {
		let params = CompletionParams {
			text_document_position: TextDocumentPositionParams {
				text_document: TextDocumentIdentifier { uri: uri.clone() },
				position: to_protocol_position(line.line, &line.text, line.character, provider.offset_encoding),
			},
			work_done_progress_params: WorkDoneProgressParams::default(),
			partial_result_params: PartialResultParams::default(),
			context: Some(completion_context(provider, &cx.input, cx.is_incomplete)),
		};

		let response = match tokio::time::timeout(cx.timeout, self.client.completion(provider.id, params)).await {
			Ok(Ok(response)) => response,
			Ok(Err(err)) => {
				warn!(provider = %provider.id, error = %err, "completion request failed");
				self.editor.report_error(format!("{}: {err}", provider.id));
				return ProviderOutcome::Failed;
			}
			Err(_) => {
				debug!(provider = %provider.id, timeout = ?cx.timeout, "completion request timed out");
				return ProviderOutcome::Failed;
			}
		};

		let list = match CompletionListPayload::from_response(response) {
			Ok(list) => list,
			Err(err) => {
				warn!(provider = %provider.id, error = %err, "undecodable completion response");
				self.editor.report_error(format!("{}: {err}", provider.id));
				return ProviderOutcome::Failed;
			}
		};

		let is_incomplete = list.is_incomplete;
		let normalize_cx = NormalizeContext {
			provider,
			config: &self.config,
			line_on_request: &line.text,
			line: line.line,
			request_character: line.character,
			suggest_character: cx.suggest_character(&line.text, line.character),
		};
		ProviderOutcome::Responded {
			items: normalize_list(list, &normalize_cx),
			is_incomplete,
		}
	}
}

#[cfg(test)]
mod tests;
