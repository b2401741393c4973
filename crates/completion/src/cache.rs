//! Per-provider cache of complete responses.
//!
//! A provider that answered with `isIncomplete = false` has sent everything it
//! will send for the current word, so its items can be replayed while another
//! provider keeps the session incremental. Incomplete answers are never
//! stored: the provider filters server-side and must be asked on every
//! keystroke.

use std::collections::HashMap;

use crate::item::NormalizedItem;
use crate::provider::ProviderId;

/// Last complete item set per provider.
#[derive(Debug, Default)]
pub struct CompletionCache {
	entries: HashMap<ProviderId, Vec<NormalizedItem>>,
}

impl CompletionCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Items cached for `provider`.
	pub fn get(&self, provider: ProviderId) -> Option<&[NormalizedItem]> {
		self.entries.get(&provider).map(Vec::as_slice)
	}

	/// Records a provider's response.
	///
	/// Complete responses replace the entry; incomplete ones evict it.
	pub fn put(&mut self, provider: ProviderId, items: Vec<NormalizedItem>, is_incomplete: bool) {
		if is_incomplete {
			self.entries.remove(&provider);
		} else {
			self.entries.insert(provider, items);
		}
	}

	/// Forgets every provider.
	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Number of cached providers.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
