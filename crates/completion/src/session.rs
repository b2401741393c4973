use lsp_types::CompletionItem;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::CompletionCache;
use crate::config::CompletionConfig;
use crate::host::{Editor, LanguageClient};
use crate::item::{ItemPayload, NormalizedItem};
use crate::provider::ProviderId;

/// Completion state for one editor session.
///
/// Owns the per-provider cache, so sessions never share cached items. The
/// cache lock is held for a whole gather cycle: overlapping [`gather`] calls
/// run one after the other instead of interleaving their cache updates.
///
/// [`gather`]: CompletionSession::gather
pub struct CompletionSession<C, E> {
	pub(crate) client: C,
	pub(crate) editor: E,
	pub(crate) config: CompletionConfig,
	pub(crate) cache: Mutex<CompletionCache>,
}

impl<C, E> std::fmt::Debug for CompletionSession<C, E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CompletionSession").field("config", &self.config).finish_non_exhaustive()
	}
}

impl<C: LanguageClient, E: Editor> CompletionSession<C, E> {
	/// Creates a session with an empty cache.
	pub fn new(client: C, editor: E, config: CompletionConfig) -> Self {
		Self {
			client,
			editor,
			config,
			cache: Mutex::new(CompletionCache::new()),
		}
	}

	/// The session configuration.
	pub fn config(&self) -> &CompletionConfig {
		&self.config
	}

	/// The language client.
	pub fn client(&self) -> &C {
		&self.client
	}

	/// The editor.
	pub fn editor(&self) -> &E {
		&self.editor
	}

	/// Items currently cached for `provider`.
	pub async fn cached_items(&self, provider: ProviderId) -> Option<Vec<NormalizedItem>> {
		self.cache.lock().await.get(provider).map(<[_]>::to_vec)
	}

	/// Drops every cached response, e.g. when the engine starts a new session.
	pub async fn reset(&self) {
		self.cache.lock().await.clear();
	}

	/// Resolves `candidate`, falling back to it unchanged when the provider
	/// fails or answers `null`.
	pub(crate) async fn resolve_candidate(&self, payload: &ItemPayload, candidate: CompletionItem) -> CompletionItem {
		match self.client.resolve(payload.client_id, candidate.clone()).await {
			Ok(Some(resolved)) => resolved,
			Ok(None) => candidate,
			Err(err) => {
				debug!(provider = %payload.client_id, error = %err, "completion resolve failed");
				candidate
			}
		}
	}
}
