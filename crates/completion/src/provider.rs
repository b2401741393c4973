//! Completion providers and their capabilities.

use lsp_types::{CompletionOptions, ServerCapabilities};
use lspcomp_position::OffsetEncoding;
use serde::{Deserialize, Serialize};

/// Unique identifier for a completion provider (one connected language server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub u64);

impl std::fmt::Display for ProviderId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "LSP#{}", self.0)
	}
}

/// What a provider declared about its completion support.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
	/// Whether `completionItem/resolve` is supported.
	pub resolve: bool,
	/// Characters that trigger completion on their own.
	pub trigger_characters: Vec<String>,
}

impl ProviderCapabilities {
	/// Reads the capabilities out of the server's completion options.
	pub fn from_options(options: &CompletionOptions) -> Self {
		Self {
			resolve: options.resolve_provider.unwrap_or(false),
			trigger_characters: options.trigger_characters.clone().unwrap_or_default(),
		}
	}

	/// Returns true if `ch` is one of the registered trigger characters.
	pub fn is_trigger_character(&self, ch: char) -> bool {
		self.trigger_characters.iter().any(|trigger| {
			let mut chars = trigger.chars();
			chars.next() == Some(ch) && chars.next().is_none()
		})
	}
}

/// One active completion source for a gather cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
	/// Provider identity, echoed back in every item payload.
	pub id: ProviderId,
	/// Declared capabilities.
	pub capabilities: ProviderCapabilities,
	/// Negotiated position encoding.
	pub offset_encoding: OffsetEncoding,
}

impl Provider {
	/// Creates a provider with no resolve support, no trigger characters and
	/// the default UTF-16 encoding.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			capabilities: ProviderCapabilities::default(),
			offset_encoding: OffsetEncoding::default(),
		}
	}

	/// Builds a provider from initialized server capabilities.
	///
	/// Returns `None` if the server does not offer completion at all.
	pub fn from_server_capabilities(id: ProviderId, caps: &ServerCapabilities) -> Option<Self> {
		let options = caps.completion_provider.as_ref()?;
		Some(Self {
			id,
			capabilities: ProviderCapabilities::from_options(options),
			offset_encoding: caps.position_encoding.as_ref().and_then(OffsetEncoding::from_lsp).unwrap_or_default(),
		})
	}

	/// Set resolve support.
	pub fn with_resolve(mut self, resolve: bool) -> Self {
		self.capabilities.resolve = resolve;
		self
	}

	/// Set trigger characters.
	pub fn with_trigger_characters(mut self, chars: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.capabilities.trigger_characters = chars.into_iter().map(Into::into).collect();
		self
	}

	/// Set the position encoding.
	pub fn with_offset_encoding(mut self, encoding: OffsetEncoding) -> Self {
		self.offset_encoding = encoding;
		self
	}
}
